#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state for gridnav.
//!
//! The world owns the [`CollisionMap`] and the agent registry. Every mutation
//! arrives as a [`Command`] through [`apply`], which broadcasts the resulting
//! [`Event`]s. Walkability changes are always followed by a single
//! [`Event::MapMutated`] so navigation can drop cached paths before its next
//! search.

mod collision;
pub mod level;

use std::collections::BTreeMap;

use gridnav_core::{AgentId, CellCoord, Command, Event, GridError, TileKind};
use log::{debug, info};

pub use collision::CollisionMap;

/// Represents the authoritative gridnav world state.
#[derive(Debug)]
pub struct World {
    map: CollisionMap,
    agents: BTreeMap<AgentId, CellCoord>,
    tick_index: u64,
}

impl World {
    /// Creates a world around an already loaded collision map.
    #[must_use]
    pub fn new(map: CollisionMap) -> Self {
        Self {
            map,
            agents: BTreeMap::new(),
            tick_index: 0,
        }
    }

    fn spawn_agent(&mut self, agent: AgentId, cell: CellCoord) -> Result<(), GridError> {
        if self.agents.contains_key(&agent) {
            return Err(GridError::DuplicateAgent { agent });
        }
        self.map.occupy(agent, cell)?;
        let _ = self.agents.insert(agent, cell);
        Ok(())
    }

    fn despawn_agent(&mut self, agent: AgentId) -> Result<(), GridError> {
        let cell = self
            .agents
            .remove(&agent)
            .ok_or(GridError::UnknownAgent { agent })?;
        self.map.vacate(agent, cell)?;
        self.reclaim(cell);
        Ok(())
    }

    /// Moves an agent to `to`, returning the cell it left.
    ///
    /// Several agents may share a cell while their continuous positions pass
    /// each other; the occupancy slot belongs to whoever entered first and is
    /// handed to the lowest remaining agent id when its holder leaves.
    fn relocate_agent(&mut self, agent: AgentId, to: CellCoord) -> Result<CellCoord, GridError> {
        let from = *self
            .agents
            .get(&agent)
            .ok_or(GridError::UnknownAgent { agent })?;
        let _ = self.map.classify(to)?;
        if from == to {
            return Ok(from);
        }

        self.map.vacate(agent, from)?;
        match self.map.occupy(agent, to) {
            Ok(()) | Err(GridError::OccupiedCell { .. }) => {}
            Err(error) => return Err(error),
        }
        let _ = self.agents.insert(agent, to);
        self.reclaim(from);
        Ok(from)
    }

    fn reclaim(&mut self, cell: CellCoord) {
        if !matches!(self.map.occupant(cell), Ok(None)) {
            return;
        }
        let heir = self
            .agents
            .iter()
            .find(|(_, agent_cell)| **agent_cell == cell)
            .map(|(agent, _)| *agent);
        if let Some(heir) = heir {
            let _ = self.map.occupy(heir, cell);
        }
    }

    fn set_tile_kind(
        &mut self,
        cell: CellCoord,
        kind: TileKind,
        out_events: &mut Vec<Event>,
    ) -> Result<bool, GridError> {
        let previous = self.map.set_kind(cell, kind)?;
        if previous == kind {
            return Ok(false);
        }
        out_events.push(Event::TileKindChanged {
            cell,
            previous,
            current: kind,
        });
        Ok(true)
    }

    fn require_agent(&self, agent: AgentId) -> Result<(), GridError> {
        if self.agents.contains_key(&agent) {
            Ok(())
        } else {
            Err(GridError::UnknownAgent { agent })
        }
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    let result = match command {
        Command::Tick => {
            let tick = world.tick_index;
            world.tick_index = world.tick_index.saturating_add(1);
            out_events.push(Event::TimeAdvanced { tick });
            Ok(())
        }
        Command::SpawnAgent { agent, cell } => world.spawn_agent(agent, cell).map(|()| {
            out_events.push(Event::AgentSpawned { agent, cell });
        }),
        Command::DespawnAgent { agent } => world.despawn_agent(agent).map(|()| {
            out_events.push(Event::AgentDespawned { agent });
        }),
        Command::RelocateAgent { agent, cell } => {
            world.relocate_agent(agent, cell).map(|from| {
                if from != cell {
                    out_events.push(Event::AgentRelocated {
                        agent,
                        from,
                        to: cell,
                    });
                }
            })
        }
        Command::SetTileKind { cell, kind } => world
            .set_tile_kind(cell, kind, out_events)
            .map(|changed| {
                if changed {
                    out_events.push(Event::MapMutated);
                }
            }),
        Command::UnlockDoors => {
            let doors: Vec<CellCoord> = world.map.cells_of_kind(TileKind::Door).collect();
            let mut result = Ok(());
            for cell in &doors {
                if let Err(error) = world.set_tile_kind(*cell, TileKind::Floor, out_events) {
                    result = Err(error);
                    break;
                }
            }
            if !doors.is_empty() {
                info!("unlocked {} door cells", doors.len());
                out_events.push(Event::MapMutated);
            }
            result
        }
        Command::SetDestination { agent, cell } => world.require_agent(agent).map(|()| {
            out_events.push(Event::DestinationRequested { agent, cell });
        }),
        Command::Interact { agent, target } => world
            .require_agent(agent)
            .and_then(|()| world.require_agent(target))
            .map(|()| {
                out_events.push(Event::Interacted { agent, target });
            }),
    };

    if let Err(error) = result {
        debug!("command rejected: {error}");
        out_events.push(Event::CommandRejected { error });
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use gridnav_core::{AgentId, CellCoord, CollisionView};

    use super::{CollisionMap, World};

    /// Provides read-only access to the collision map.
    #[must_use]
    pub fn collision_map(world: &World) -> &CollisionMap {
        &world.map
    }

    /// Borrows the collision view handed to searches.
    #[must_use]
    pub fn collision_view(world: &World) -> CollisionView<'_> {
        world.map.view()
    }

    /// Cell currently assigned to the agent, if it exists.
    #[must_use]
    pub fn agent_cell(world: &World, agent: AgentId) -> Option<CellCoord> {
        world.agents.get(&agent).copied()
    }

    /// Agents and their cells in ascending id order.
    #[must_use]
    pub fn agents(world: &World) -> Vec<(AgentId, CellCoord)> {
        world
            .agents
            .iter()
            .map(|(agent, cell)| (*agent, *cell))
            .collect()
    }

    /// Number of ticks processed so far.
    #[must_use]
    pub fn tick_index(world: &World) -> u64 {
        world.tick_index
    }
}
