//! Dense collision map mutated by gameplay and read by the search engine.

use gridnav_core::{AgentId, CellCoord, CollisionView, DoorPolicy, GridError, TileKind};

/// Per-cell classification and occupancy for a single level.
///
/// Dimensions are fixed at construction. Walkability is never stored; it is
/// derived from the current [`TileKind`] and the map's [`DoorPolicy`] every
/// time it is queried, so a mutation is visible to the very next search.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CollisionMap {
    width: u32,
    height: u32,
    tiles: Vec<TileKind>,
    occupants: Vec<Option<AgentId>>,
    door_policy: DoorPolicy,
}

impl CollisionMap {
    /// Builds a map by classifying every cell with `initial_kind`.
    ///
    /// Cells are visited in row-major order.
    pub fn from_fn<F>(width: u32, height: u32, door_policy: DoorPolicy, mut initial_kind: F) -> Self
    where
        F: FnMut(CellCoord) -> TileKind,
    {
        let capacity_u64 = u64::from(width) * u64::from(height);
        let capacity = usize::try_from(capacity_u64).unwrap_or(0);
        let mut tiles = Vec::with_capacity(capacity);
        for row in 0..height {
            for column in 0..width {
                tiles.push(initial_kind(CellCoord::new(column, row)));
            }
        }

        Self {
            width,
            height,
            occupants: vec![None; tiles.len()],
            tiles,
            door_policy,
        }
    }

    /// Builds a map where every cell shares the same classification.
    #[must_use]
    pub fn filled(width: u32, height: u32, kind: TileKind) -> Self {
        Self::from_fn(width, height, DoorPolicy::default(), |_| kind)
    }

    /// Provides the dimensions of the map as `(width, height)`.
    #[must_use]
    pub const fn bounds(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Policy deciding whether closed doors block traversal.
    #[must_use]
    pub const fn door_policy(&self) -> DoorPolicy {
        self.door_policy
    }

    /// Borrows a read-only view suitable for searches.
    #[must_use]
    pub fn view(&self) -> CollisionView<'_> {
        CollisionView::new(
            &self.tiles,
            &self.occupants,
            self.width,
            self.height,
            self.door_policy,
        )
    }

    /// Returns the classification of the provided cell.
    pub fn classify(&self, cell: CellCoord) -> Result<TileKind, GridError> {
        self.view().classify(cell)
    }

    /// Reports whether the provided cell permits traversal, ignoring occupants.
    pub fn is_walkable(&self, cell: CellCoord) -> Result<bool, GridError> {
        self.view().is_walkable(cell)
    }

    /// Returns the agent standing on the provided cell, if any.
    pub fn occupant(&self, cell: CellCoord) -> Result<Option<AgentId>, GridError> {
        self.view().occupant(cell)
    }

    /// Reclassifies a cell and returns its previous classification.
    ///
    /// Agents whose cached paths cross the cell must be notified by the
    /// caller; the world does this by emitting `Event::MapMutated`.
    pub fn set_kind(&mut self, cell: CellCoord, kind: TileKind) -> Result<TileKind, GridError> {
        let index = self.checked_index(cell)?;
        Ok(std::mem::replace(&mut self.tiles[index], kind))
    }

    /// Marks the cell as occupied by `agent`.
    ///
    /// Fails with [`GridError::OccupiedCell`] when a different agent already
    /// stands on the cell.
    pub fn occupy(&mut self, agent: AgentId, cell: CellCoord) -> Result<(), GridError> {
        let index = self.checked_index(cell)?;
        match self.occupants[index] {
            Some(occupant) if occupant != agent => Err(GridError::OccupiedCell { cell, occupant }),
            _ => {
                self.occupants[index] = Some(agent);
                Ok(())
            }
        }
    }

    /// Clears the cell if, and only if, it is occupied by `agent`.
    pub fn vacate(&mut self, agent: AgentId, cell: CellCoord) -> Result<(), GridError> {
        let index = self.checked_index(cell)?;
        if self.occupants[index] == Some(agent) {
            self.occupants[index] = None;
        }
        Ok(())
    }

    /// Iterates over every cell currently classified as `kind`.
    pub fn cells_of_kind(&self, kind: TileKind) -> impl Iterator<Item = CellCoord> + '_ {
        let view = self.view();
        self.tiles
            .iter()
            .enumerate()
            .filter(move |(_, tile)| **tile == kind)
            .map(move |(index, _)| view.cell_at(index))
    }

    fn checked_index(&self, cell: CellCoord) -> Result<usize, GridError> {
        self.view().index(cell).ok_or(GridError::InvalidCoordinate {
            cell,
            width: self.width,
            height: self.height,
        })
    }
}
