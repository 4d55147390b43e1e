#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic weighted A* search over the 8-connected collision grid.
//!
//! The engine is a pure function of the [`CollisionView`] it is handed, the
//! request and the [`SearchParams`]. The only state that survives between
//! calls is the scratch arena inside [`Pathfinder`], which is reset (never
//! reallocated for the same grid size) at the start of every search.

mod scratch;

use gridnav_core::{AgentId, CellCoord, CollisionView, GridError};
use log::{debug, trace, warn};

use self::scratch::{NodeState, SearchScratch};

/// Cost of stepping onto an orthogonally adjacent free cell.
pub const ORTHOGONAL_COST: u32 = 10;
/// Cost of stepping onto a diagonally adjacent free cell.
pub const DIAGONAL_COST: u32 = 14;
/// Cost of stepping onto an orthogonally adjacent cell held by another agent.
pub const OCCUPIED_ORTHOGONAL_COST: u32 = 45;
/// Cost of stepping onto a diagonally adjacent cell held by another agent.
pub const OCCUPIED_DIAGONAL_COST: u32 = 62;
/// Expansions granted per unit of effort budget.
pub const EXPANSIONS_PER_EFFORT: u64 = 30;

const ADJACENCY_FALLBACK_RADIUS: f32 = 2.0;

const NEIGHBOR_OFFSETS: [(i32, i32); 8] = [
    (0, -1),
    (1, 0),
    (0, 1),
    (-1, 0),
    (1, -1),
    (1, 1),
    (-1, 1),
    (-1, -1),
];

const ORTHOGONAL_OFFSETS: [(i32, i32); 4] = [(0, -1), (1, 0), (0, 1), (-1, 0)];

/// Tuning knobs for a single search.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SearchParams {
    /// Multiplier applied to the Manhattan distance-to-goal estimate.
    ///
    /// The estimate counts cells while path costs count [`ORTHOGONAL_COST`]
    /// per straight step. `0` degenerates into uniform-cost search and any
    /// weight up to `7` never overestimates, so routes stay optimal. Past
    /// `10` the estimate dominates the accumulated cost and the search turns
    /// greedy: fewer expansions, possibly longer routes.
    pub heuristic_weight: u32,
    /// Multiplier bounding the number of expansions before giving up.
    pub effort_budget: u32,
}

impl SearchParams {
    /// Creates search parameters with explicit values.
    #[must_use]
    pub const fn new(heuristic_weight: u32, effort_budget: u32) -> Self {
        Self {
            heuristic_weight,
            effort_budget,
        }
    }

    /// Maximum number of expansions a search may perform.
    ///
    /// The goal is accepted when it leaves the open set, not when it enters
    /// it, so cells queued ahead of an already opened goal still count
    /// against this limit.
    #[must_use]
    pub const fn expansion_limit(&self) -> u64 {
        EXPANSIONS_PER_EFFORT * self.effort_budget as u64
    }
}

impl Default for SearchParams {
    fn default() -> Self {
        Self::new(1, 100)
    }
}

/// Endpoints of a search and the agent performing it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SearchRequest {
    /// Cell the route starts from. Never part of the returned path.
    pub start: CellCoord,
    /// Cell the route should reach.
    pub goal: CellCoord,
    /// Agent travelling the route; cells it occupies are not penalised.
    pub mover: Option<AgentId>,
}

impl SearchRequest {
    /// Creates a request without an associated agent.
    #[must_use]
    pub const fn new(start: CellCoord, goal: CellCoord) -> Self {
        Self {
            start,
            goal,
            mover: None,
        }
    }

    /// Associates the request with the travelling agent.
    #[must_use]
    pub const fn for_agent(mut self, agent: AgentId) -> Self {
        self.mover = Some(agent);
        self
    }
}

/// Ordered waypoints from the cell after the start up to and including the goal.
///
/// An empty path means the start already equals the goal.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Path {
    waypoints: Vec<CellCoord>,
}

impl Path {
    /// Wraps an already ordered list of waypoints.
    #[must_use]
    pub fn new(waypoints: Vec<CellCoord>) -> Self {
        Self { waypoints }
    }

    /// Waypoints in travel order.
    #[must_use]
    pub fn waypoints(&self) -> &[CellCoord] {
        &self.waypoints
    }

    /// Number of waypoints.
    #[must_use]
    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    /// Reports whether the path has no waypoints.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    /// Waypoint at `index`, if any.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<CellCoord> {
        self.waypoints.get(index).copied()
    }

    /// Final waypoint of the path.
    #[must_use]
    pub fn last(&self) -> Option<CellCoord> {
        self.waypoints.last().copied()
    }

    /// Sums the step costs of walking this path from `start`.
    ///
    /// Cells outside `view` are charged nothing; callers validate paths first.
    #[must_use]
    pub fn total_cost(&self, view: &CollisionView<'_>, start: CellCoord, mover: Option<AgentId>) -> u32 {
        let mut previous = start;
        let mut total = 0u32;
        for &cell in &self.waypoints {
            if let Some(index) = view.index(cell) {
                total = total.saturating_add(step_cost(
                    view,
                    index,
                    previous.is_diagonal_to(cell),
                    mover,
                ));
            }
            previous = cell;
        }
        total
    }
}

/// Reasons a search produced no route.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NoPathReason {
    /// The goal cell itself is not walkable.
    GoalBlocked,
    /// Every neighbour of the goal is non-walkable.
    GoalEnclosed,
    /// The open set ran dry before the goal was reached.
    Exhausted,
    /// The expansion limit derived from the effort budget was exceeded.
    BudgetExceeded,
}

impl NoPathReason {
    /// Reports whether the search gave up rather than proving unreachability.
    #[must_use]
    pub const fn is_budget_exhaustion(self) -> bool {
        matches!(self, Self::BudgetExceeded)
    }
}

/// Result of a search. Failing to find a route is an expected outcome, not an error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SearchOutcome {
    /// A route was found.
    Found(Path),
    /// No route exists or the search gave up.
    NoPath(NoPathReason),
}

impl SearchOutcome {
    /// Borrows the path, if one was found.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Found(path) => Some(path),
            Self::NoPath(_) => None,
        }
    }

    /// Consumes the outcome, yielding the path if one was found.
    #[must_use]
    pub fn into_path(self) -> Option<Path> {
        match self {
            Self::Found(path) => Some(path),
            Self::NoPath(_) => None,
        }
    }
}

/// Reusable search engine owning the scratch arena.
#[derive(Debug, Default)]
pub struct Pathfinder {
    scratch: SearchScratch,
    last_expansions: u64,
}

impl Pathfinder {
    /// Creates a pathfinder with an empty scratch arena.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of expansions performed by the most recent search.
    #[must_use]
    pub fn last_expansions(&self) -> u64 {
        self.last_expansions
    }

    /// Computes a route for `request` over `view`.
    ///
    /// Returns [`GridError::InvalidCoordinate`] when either endpoint lies
    /// outside the grid. Every other failure is reported as
    /// [`SearchOutcome::NoPath`].
    pub fn find_path(
        &mut self,
        view: CollisionView<'_>,
        request: SearchRequest,
        params: SearchParams,
    ) -> Result<SearchOutcome, GridError> {
        let SearchRequest { start, goal, .. } = request;
        let _ = view.classify(start)?;
        let _ = view.classify(goal)?;
        self.last_expansions = 0;

        if start == goal {
            return Ok(SearchOutcome::Found(Path::default()));
        }

        if !view.is_walkable(goal)? {
            debug!("no path {start} -> {goal}: goal is not walkable");
            return Ok(SearchOutcome::NoPath(NoPathReason::GoalBlocked));
        }

        if is_enclosed(&view, goal) {
            debug!("no path {start} -> {goal}: goal is enclosed");
            return Ok(SearchOutcome::NoPath(NoPathReason::GoalEnclosed));
        }

        let reason = match self.search(&view, request, params) {
            SearchOutcome::Found(path) => {
                trace!(
                    "path {start} -> {goal}: {} waypoints after {} expansions",
                    path.len(),
                    self.last_expansions
                );
                return Ok(SearchOutcome::Found(path));
            }
            SearchOutcome::NoPath(reason) => reason,
        };

        let pinched = start.is_diagonal_to(goal) && cuts_corner(&view, goal);
        if start.euclidean_distance(goal) < ADJACENCY_FALLBACK_RADIUS && !pinched {
            debug!("search {start} -> {goal} failed ({reason:?}); stepping directly to neighbour");
            return Ok(SearchOutcome::Found(Path::new(vec![goal])));
        }

        if reason.is_budget_exhaustion() {
            warn!(
                "search {start} -> {goal} gave up after {} expansions",
                self.last_expansions
            );
        } else {
            debug!("no path {start} -> {goal}: open set exhausted");
        }
        Ok(SearchOutcome::NoPath(reason))
    }

    fn search(
        &mut self,
        view: &CollisionView<'_>,
        request: SearchRequest,
        params: SearchParams,
    ) -> SearchOutcome {
        let (width, height) = view.bounds();
        let (Some(start_index), Some(goal_index)) = (view.index(request.start), view.index(request.goal))
        else {
            return SearchOutcome::NoPath(NoPathReason::Exhausted);
        };

        self.scratch.reset(view.cell_count());
        let start_h = heuristic(request.start, request.goal, params.heuristic_weight);
        self.scratch.open(start_index, 0, start_h, None);

        let limit = params.expansion_limit();
        while let Some(index) = self.scratch.pop_open() {
            if index == goal_index {
                return SearchOutcome::Found(Path::new(self.scratch.reconstruct(view, goal_index)));
            }

            self.last_expansions += 1;
            if self.last_expansions > limit {
                return SearchOutcome::NoPath(NoPathReason::BudgetExceeded);
            }

            self.scratch.close(index);
            let cell = view.cell_at(index);
            let g = self.scratch.g(index);

            for (dx, dy) in NEIGHBOR_OFFSETS {
                let Some(neighbor) = offset(cell, dx, dy, width, height) else {
                    continue;
                };
                let Some(neighbor_index) = view.index(neighbor) else {
                    continue;
                };
                if !view.walkable_at(neighbor_index) {
                    continue;
                }
                if self.scratch.state(neighbor_index) == NodeState::Closed {
                    continue;
                }

                let diagonal = dx != 0 && dy != 0;
                if diagonal && cuts_corner(view, neighbor) {
                    continue;
                }

                let tentative = g.saturating_add(step_cost(view, neighbor_index, diagonal, request.mover));
                let h = heuristic(neighbor, request.goal, params.heuristic_weight);
                self.scratch.relax(neighbor_index, tentative, h, index);
            }
        }

        SearchOutcome::NoPath(NoPathReason::Exhausted)
    }
}

/// One-shot search using a temporary [`Pathfinder`].
pub fn find_path(
    view: CollisionView<'_>,
    start: CellCoord,
    goal: CellCoord,
    params: SearchParams,
) -> Result<SearchOutcome, GridError> {
    Pathfinder::new().find_path(view, SearchRequest::new(start, goal), params)
}

/// Cost of entering the cell at `index`.
///
/// Cells held by an agent other than `mover` are penalised, never forbidden.
#[must_use]
pub fn step_cost(
    view: &CollisionView<'_>,
    index: usize,
    diagonal: bool,
    mover: Option<AgentId>,
) -> u32 {
    let occupied = match view.occupant_at(index) {
        Some(occupant) => Some(occupant) != mover,
        None => false,
    };
    match (diagonal, occupied) {
        (false, false) => ORTHOGONAL_COST,
        (true, false) => DIAGONAL_COST,
        (false, true) => OCCUPIED_ORTHOGONAL_COST,
        (true, true) => OCCUPIED_DIAGONAL_COST,
    }
}

/// Reports whether a diagonal step onto `destination` is illegal.
///
/// A diagonal step is rejected when any in-bounds orthogonal neighbour of the
/// destination is non-walkable. Neighbours beyond the grid edge do not block.
#[must_use]
pub fn cuts_corner(view: &CollisionView<'_>, destination: CellCoord) -> bool {
    let (width, height) = view.bounds();
    ORTHOGONAL_OFFSETS.iter().any(|&(dx, dy)| {
        offset(destination, dx, dy, width, height)
            .and_then(|cell| view.index(cell))
            .is_some_and(|index| !view.walkable_at(index))
    })
}

fn is_enclosed(view: &CollisionView<'_>, cell: CellCoord) -> bool {
    let (width, height) = view.bounds();
    NEIGHBOR_OFFSETS.iter().all(|&(dx, dy)| {
        offset(cell, dx, dy, width, height)
            .and_then(|neighbor| view.index(neighbor))
            .map_or(true, |index| !view.walkable_at(index))
    })
}

fn heuristic(cell: CellCoord, goal: CellCoord, weight: u32) -> u32 {
    cell.manhattan_distance(goal).saturating_mul(weight)
}

fn offset(cell: CellCoord, dx: i32, dy: i32, width: u32, height: u32) -> Option<CellCoord> {
    let column = cell.column().checked_add_signed(dx)?;
    let row = cell.row().checked_add_signed(dy)?;
    (column < width && row < height).then(|| CellCoord::new(column, row))
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridnav_core::{DoorPolicy, TileKind};

    fn open_grid(width: u32, height: u32) -> (Vec<TileKind>, Vec<Option<AgentId>>) {
        let count = (width * height) as usize;
        (vec![TileKind::Floor; count], vec![None; count])
    }

    #[test]
    fn offset_stays_inside_grid() {
        let origin = CellCoord::new(0, 0);
        assert_eq!(offset(origin, -1, 0, 3, 3), None);
        assert_eq!(offset(origin, 1, 1, 3, 3), Some(CellCoord::new(1, 1)));
        assert_eq!(offset(CellCoord::new(2, 2), 1, 0, 3, 3), None);
    }

    #[test]
    fn corner_rule_ignores_grid_edge_but_not_walls() {
        let (mut tiles, occupants) = open_grid(3, 3);
        {
            let view = CollisionView::new(&tiles, &occupants, 3, 3, DoorPolicy::Blocking);
            assert!(!cuts_corner(&view, CellCoord::new(2, 2)));
        }

        tiles[1] = TileKind::Wall;
        let view = CollisionView::new(&tiles, &occupants, 3, 3, DoorPolicy::Blocking);
        assert!(cuts_corner(&view, CellCoord::new(1, 1)));
        assert!(!cuts_corner(&view, CellCoord::new(2, 2)));
    }

    #[test]
    fn step_cost_penalises_foreign_occupants_only() {
        let (tiles, mut occupants) = open_grid(2, 1);
        occupants[1] = Some(AgentId::new(3));
        let view = CollisionView::new(&tiles, &occupants, 2, 1, DoorPolicy::Blocking);

        assert_eq!(step_cost(&view, 0, false, None), ORTHOGONAL_COST);
        assert_eq!(step_cost(&view, 1, false, None), OCCUPIED_ORTHOGONAL_COST);
        assert_eq!(step_cost(&view, 1, true, None), OCCUPIED_DIAGONAL_COST);
        assert_eq!(step_cost(&view, 1, true, Some(AgentId::new(3))), DIAGONAL_COST);
    }

    #[test]
    fn scratch_does_not_leak_between_searches() {
        let (mut tiles, occupants) = open_grid(5, 5);
        let mut pathfinder = Pathfinder::new();
        let params = SearchParams::default();

        for row in 0..4 {
            tiles[row * 5 + 2] = TileKind::Wall;
        }
        let walled = CollisionView::new(&tiles, &occupants, 5, 5, DoorPolicy::Blocking);
        let detour = pathfinder
            .find_path(
                walled,
                SearchRequest::new(CellCoord::new(0, 0), CellCoord::new(4, 0)),
                params,
            )
            .expect("in bounds");
        assert!(detour.path().is_some_and(|path| path.len() > 4));

        let (tiles, occupants) = open_grid(5, 5);
        let open = CollisionView::new(&tiles, &occupants, 5, 5, DoorPolicy::Blocking);
        let direct = pathfinder
            .find_path(
                open,
                SearchRequest::new(CellCoord::new(0, 0), CellCoord::new(4, 0)),
                params,
            )
            .expect("in bounds");
        assert_eq!(
            direct.path().map(Path::waypoints),
            Some(
                &[
                    CellCoord::new(1, 0),
                    CellCoord::new(2, 0),
                    CellCoord::new(3, 0),
                    CellCoord::new(4, 0),
                ][..]
            )
        );
    }

    #[test]
    fn start_equal_to_goal_yields_empty_path() {
        let (tiles, occupants) = open_grid(2, 2);
        let view = CollisionView::new(&tiles, &occupants, 2, 2, DoorPolicy::Blocking);
        let cell = CellCoord::new(1, 1);

        let outcome = find_path(view, cell, cell, SearchParams::default());

        assert_eq!(outcome, Ok(SearchOutcome::Found(Path::default())));
    }
}
