use glam::Vec2;
use gridnav_core::{AgentId, CellCoord, CollisionView, GridError};
use gridnav_system_pathfinding::{NoPathReason, Path, Pathfinder, SearchOutcome, SearchRequest};
use log::{debug, trace};

use crate::{
    config::NavigationConfig,
    motion::{self, ARRIVAL_TOLERANCE},
};

/// Lifecycle of a controller.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ControllerState {
    /// No destination is set.
    #[default]
    Idle,
    /// A route must be computed before the agent may move.
    Planning,
    /// The agent is walking the cached path.
    Following,
    /// The final waypoint was reached during the last tick.
    Arrived,
    /// The last search found no route; the destination was dropped.
    Blocked,
}

/// What a single controller tick did.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TickOutcome {
    /// Nothing to do.
    Idle,
    /// A search was needed but the per-tick search cap was reached.
    Deferred,
    /// The cached path was recomputed after invalidation; no motion this tick.
    Replanned,
    /// The agent moved along its path.
    Moved {
        /// Position at the start of the tick.
        from: Vec2,
        /// Position at the end of the tick.
        to: Vec2,
    },
    /// The agent reached its destination.
    Arrived {
        /// Destination cell.
        cell: CellCoord,
    },
    /// No route exists; the destination was cleared.
    Blocked {
        /// Why the search failed.
        reason: NoPathReason,
    },
    /// The destination is held by a neighbouring agent.
    Interaction {
        /// Agent standing on the destination.
        target: AgentId,
    },
}

/// Per-agent path cache and follower.
///
/// The cached path is only followed while it was computed for the current
/// destination; any mismatch forces a new search before motion is applied.
#[derive(Clone, Debug)]
pub struct Controller {
    agent: AgentId,
    tile_size: f32,
    position: Vec2,
    current_path: Path,
    target_destination: Option<CellCoord>,
    path_computed_for: Option<CellCoord>,
    waypoint_index: usize,
    state: ControllerState,
    resume_next_tick: bool,
}

impl Controller {
    /// Creates an idle controller for an agent standing on `cell`.
    #[must_use]
    pub fn new(agent: AgentId, cell: CellCoord, tile_size: f32) -> Self {
        Self {
            agent,
            tile_size,
            position: motion::cell_position(cell, tile_size),
            current_path: Path::default(),
            target_destination: None,
            path_computed_for: None,
            waypoint_index: 0,
            state: ControllerState::Idle,
            resume_next_tick: false,
        }
    }

    /// Agent steered by this controller.
    #[must_use]
    pub const fn agent(&self) -> AgentId {
        self.agent
    }

    /// Continuous world-space position.
    #[must_use]
    pub const fn position(&self) -> Vec2 {
        self.position
    }

    /// Cell nearest to the continuous position.
    #[must_use]
    pub fn current_cell(&self) -> CellCoord {
        motion::nearest_cell(self.position, self.tile_size)
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> ControllerState {
        self.state
    }

    /// Destination the agent is heading to, if any.
    #[must_use]
    pub const fn destination(&self) -> Option<CellCoord> {
        self.target_destination
    }

    /// Remaining waypoints of the cached path, for overlays.
    #[must_use]
    pub fn path(&self) -> &[CellCoord] {
        self.current_path
            .waypoints()
            .get(self.waypoint_index..)
            .unwrap_or_default()
    }

    /// Requests travel to `cell`. Repeating the current destination is a no-op.
    pub fn set_destination(&mut self, cell: CellCoord) {
        if self.target_destination == Some(cell) {
            return;
        }
        debug!("agent {}: destination set to {cell}", self.agent);
        self.target_destination = Some(cell);
        self.resume_next_tick = false;
        self.state = ControllerState::Planning;
    }

    /// Drops the destination and the cached path.
    pub fn clear_destination(&mut self) {
        self.target_destination = None;
        self.path_computed_for = None;
        self.current_path = Path::default();
        self.waypoint_index = 0;
        self.resume_next_tick = false;
        self.state = ControllerState::Idle;
    }

    /// Marks the cached path as stale after the map changed.
    ///
    /// Controllers without a path in progress are unaffected.
    pub fn invalidate(&mut self) {
        if self.path().is_empty() {
            return;
        }
        debug!("agent {}: path invalidated by map change", self.agent);
        self.path_computed_for = None;
        self.current_path = Path::default();
        self.waypoint_index = 0;
        self.resume_next_tick = true;
        self.state = ControllerState::Planning;
    }

    /// Reports whether the next tick would start a search.
    #[must_use]
    pub fn needs_search(&self, view: &CollisionView<'_>) -> bool {
        match self.target_destination {
            Some(destination) => {
                self.path_computed_for != Some(destination)
                    && view.contains(destination)
                    && self.local_route(destination).is_none()
            }
            None => false,
        }
    }

    /// Route to `destination` that needs no search: empty when the agent
    /// stands on the cell origin, a single step when it is still inside the cell.
    fn local_route(&self, destination: CellCoord) -> Option<Path> {
        if destination != self.current_cell() {
            return None;
        }
        let origin = motion::cell_position(destination, self.tile_size);
        if self.position.distance(origin) <= ARRIVAL_TOLERANCE {
            Some(Path::default())
        } else {
            Some(Path::new(vec![destination]))
        }
    }

    /// Advances the controller by one tick.
    ///
    /// `search_allowed` is false when the per-tick search cap is exhausted;
    /// a controller that needs a route then stays in [`ControllerState::Planning`].
    pub fn tick(
        &mut self,
        pathfinder: &mut Pathfinder,
        view: CollisionView<'_>,
        config: &NavigationConfig,
        search_allowed: bool,
    ) -> Result<TickOutcome, GridError> {
        let Some(mut destination) = self.target_destination else {
            self.state = ControllerState::Idle;
            return Ok(TickOutcome::Idle);
        };
        let current = self.current_cell();

        if !view.contains(destination) {
            debug!(
                "agent {}: destination {destination} outside the grid, clamping to {current}",
                self.agent
            );
            destination = current;
            self.target_destination = Some(current);
        }

        if let Some(target) = view.occupant(destination)? {
            if target != self.agent && current.is_adjacent(destination) {
                debug!("agent {}: interacting with {target}", self.agent);
                self.clear_destination();
                return Ok(TickOutcome::Interaction { target });
            }
        }

        if self.path_computed_for != Some(destination) {
            if let Some(path) = self.local_route(destination) {
                self.adopt(path, destination);
            } else if !search_allowed {
                self.state = ControllerState::Planning;
                return Ok(TickOutcome::Deferred);
            } else {
                self.state = ControllerState::Planning;
                let request = SearchRequest::new(current, destination).for_agent(self.agent);
                match pathfinder.find_path(view, request, config.search_params()) {
                    Ok(SearchOutcome::Found(path)) => {
                        debug!(
                            "agent {}: planned {} waypoints to {destination}",
                            self.agent,
                            path.len()
                        );
                        self.adopt(path, destination);
                    }
                    Ok(SearchOutcome::NoPath(reason)) => {
                        debug!("agent {}: no path to {destination} ({reason:?})", self.agent);
                        self.clear_destination();
                        self.state = ControllerState::Blocked;
                        return Ok(TickOutcome::Blocked { reason });
                    }
                    Err(error) => {
                        self.clear_destination();
                        return Err(error);
                    }
                }
            }

            if self.resume_next_tick && !self.current_path.is_empty() {
                self.resume_next_tick = false;
                return Ok(TickOutcome::Replanned);
            }
            self.resume_next_tick = false;
        }

        Ok(self.follow(config.speed, destination))
    }

    fn adopt(&mut self, path: Path, destination: CellCoord) {
        self.current_path = path;
        self.path_computed_for = Some(destination);
        self.waypoint_index = 0;
        self.state = ControllerState::Following;
    }

    fn follow(&mut self, speed: f32, destination: CellCoord) -> TickOutcome {
        let from = self.position;
        let mut remaining = speed;

        while let Some(waypoint) = self.current_path.get(self.waypoint_index) {
            let step = motion::advance(
                self.position,
                motion::cell_position(waypoint, self.tile_size),
                remaining,
            );
            self.position = step.position;
            remaining = step.leftover;
            if !step.reached {
                break;
            }
            self.waypoint_index += 1;
            if remaining <= ARRIVAL_TOLERANCE {
                break;
            }
        }

        if self.waypoint_index >= self.current_path.len() {
            trace!("agent {}: arrived at {destination}", self.agent);
            self.clear_destination();
            self.state = ControllerState::Arrived;
            return TickOutcome::Arrived { cell: destination };
        }

        trace!("agent {}: {from} -> {}", self.agent, self.position);
        self.state = ControllerState::Following;
        TickOutcome::Moved {
            from,
            to: self.position,
        }
    }
}
