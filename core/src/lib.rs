#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the gridnav engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure systems. Adapters submit [`Command`] values
//! describing desired mutations, the world executes those commands via its
//! `apply` entry point, and then broadcasts [`Event`] values for systems to
//! react to deterministically. Systems consume event streams, query immutable
//! views such as [`CollisionView`], and respond exclusively with new command
//! batches.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Advances the simulation by a single tick.
    Tick,
    /// Places a new agent on the grid.
    SpawnAgent {
        /// Identifier the agent will be known by.
        agent: AgentId,
        /// Cell the agent starts on.
        cell: CellCoord,
    },
    /// Removes an agent, releasing the cell it occupied.
    DespawnAgent {
        /// Identifier of the agent to remove.
        agent: AgentId,
    },
    /// Records that an agent's nearest cell changed while following a path.
    RelocateAgent {
        /// Identifier of the agent that moved.
        agent: AgentId,
        /// Cell the agent now stands on.
        cell: CellCoord,
    },
    /// Overwrites the classification of a single cell.
    SetTileKind {
        /// Cell being reclassified.
        cell: CellCoord,
        /// Classification applied to the cell.
        kind: TileKind,
    },
    /// Converts every locked door on the map into floor.
    UnlockDoors,
    /// Requests that an agent travel to the provided cell.
    ///
    /// The cell is relayed untouched; controllers clamp destinations that
    /// fall outside the grid.
    SetDestination {
        /// Identifier of the agent being steered.
        agent: AgentId,
        /// Requested destination cell.
        cell: CellCoord,
    },
    /// Requests an interaction between two neighbouring agents.
    Interact {
        /// Agent initiating the interaction.
        agent: AgentId,
        /// Agent standing on the destination cell.
        target: AgentId,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// Indicates that the simulation advanced by one tick.
    TimeAdvanced {
        /// Zero-based index of the tick that just started.
        tick: u64,
    },
    /// Confirms that an agent was placed on the grid.
    AgentSpawned {
        /// Identifier of the new agent.
        agent: AgentId,
        /// Cell the agent occupies.
        cell: CellCoord,
    },
    /// Confirms that an agent was removed from the grid.
    AgentDespawned {
        /// Identifier of the removed agent.
        agent: AgentId,
    },
    /// Confirms that an agent moved between two cells.
    AgentRelocated {
        /// Identifier of the agent that moved.
        agent: AgentId,
        /// Cell the agent occupied before the move.
        from: CellCoord,
        /// Cell the agent occupies after the move.
        to: CellCoord,
    },
    /// Reports the reclassification of a single cell.
    TileKindChanged {
        /// Cell whose classification changed.
        cell: CellCoord,
        /// Classification before the change.
        previous: TileKind,
        /// Classification after the change.
        current: TileKind,
    },
    /// Signals that walkability may have changed somewhere on the map.
    ///
    /// Emitted once per mutating command, after every [`Event::TileKindChanged`]
    /// it produced. Cached paths must be treated as stale after this event.
    MapMutated,
    /// Relays a destination request to the navigation system.
    DestinationRequested {
        /// Identifier of the agent being steered.
        agent: AgentId,
        /// Requested destination cell.
        cell: CellCoord,
    },
    /// Announces that an agent interacted with a neighbouring agent.
    Interacted {
        /// Agent initiating the interaction.
        agent: AgentId,
        /// Agent on the receiving end.
        target: AgentId,
    },
    /// Reports that a command could not be applied.
    CommandRejected {
        /// Reason the command was rejected.
        error: GridError,
    },
}

/// Unique identifier assigned to an agent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId(u32);

impl AgentId {
    /// Creates a new agent identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Location of a single grid cell expressed as column and row coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    column: u32,
    row: u32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// Computes the Manhattan distance between two cell coordinates.
    #[must_use]
    pub fn manhattan_distance(self, other: CellCoord) -> u32 {
        self.column().abs_diff(other.column()) + self.row().abs_diff(other.row())
    }

    /// Computes the straight-line distance between two cells in grid units.
    #[must_use]
    pub fn euclidean_distance(self, other: CellCoord) -> f32 {
        let dx = self.column().abs_diff(other.column()) as f32;
        let dy = self.row().abs_diff(other.row()) as f32;
        (dx * dx + dy * dy).sqrt()
    }

    /// Reports whether `other` is one of the eight cells surrounding `self`.
    #[must_use]
    pub fn is_adjacent(self, other: CellCoord) -> bool {
        let dx = self.column().abs_diff(other.column());
        let dy = self.row().abs_diff(other.row());
        dx.max(dy) == 1
    }

    /// Reports whether the step from `self` to `other` is diagonal.
    #[must_use]
    pub fn is_diagonal_to(self, other: CellCoord) -> bool {
        self.column() != other.column() && self.row() != other.row()
    }
}

impl fmt::Display for CellCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.column, self.row)
    }
}

/// Collision classification of a single cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TileKind {
    /// Open ground.
    Floor,
    /// Solid obstacle, never walkable.
    Wall,
    /// Locked door; walkable only under [`DoorPolicy::Passable`].
    Door,
    /// Door that has been opened.
    OpenDoor,
}

impl TileKind {
    /// Derives walkability for this classification under the provided policy.
    #[must_use]
    pub const fn is_walkable(self, policy: DoorPolicy) -> bool {
        match self {
            Self::Floor | Self::OpenDoor => true,
            Self::Wall => false,
            Self::Door => matches!(policy, DoorPolicy::Passable),
        }
    }
}

/// Decides whether closed doors block traversal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DoorPolicy {
    /// Closed doors behave like walls until unlocked.
    #[default]
    Blocking,
    /// Closed doors can be walked through.
    Passable,
}

/// Errors raised when a grid operation receives invalid input.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Error, Serialize, Deserialize)]
pub enum GridError {
    /// The cell lies outside `[0, width) x [0, height)`.
    #[error("cell {cell} lies outside the {width}x{height} grid")]
    InvalidCoordinate {
        /// Offending cell.
        cell: CellCoord,
        /// Width of the grid the cell was checked against.
        width: u32,
        /// Height of the grid the cell was checked against.
        height: u32,
    },
    /// No agent with the provided identifier exists.
    #[error("agent {agent} does not exist")]
    UnknownAgent {
        /// Identifier that failed to resolve.
        agent: AgentId,
    },
    /// An agent with the provided identifier already exists.
    #[error("agent {agent} already exists")]
    DuplicateAgent {
        /// Identifier that is already in use.
        agent: AgentId,
    },
    /// The cell already hosts another agent.
    #[error("cell {cell} is occupied by agent {occupant}")]
    OccupiedCell {
        /// Cell that was requested.
        cell: CellCoord,
        /// Agent currently standing on the cell.
        occupant: AgentId,
    },
}

/// Read-only view into the collision map.
///
/// Cells are stored in row-major order. The view carries the door policy so
/// walkability is always derived from the current classification rather than
/// cached alongside it.
#[derive(Clone, Copy, Debug)]
pub struct CollisionView<'a> {
    tiles: &'a [TileKind],
    occupants: &'a [Option<AgentId>],
    width: u32,
    height: u32,
    door_policy: DoorPolicy,
}

impl<'a> CollisionView<'a> {
    /// Captures a new view backed by the provided cell slices.
    #[must_use]
    pub fn new(
        tiles: &'a [TileKind],
        occupants: &'a [Option<AgentId>],
        width: u32,
        height: u32,
        door_policy: DoorPolicy,
    ) -> Self {
        debug_assert_eq!(tiles.len(), occupants.len());
        Self {
            tiles,
            occupants,
            width,
            height,
            door_policy,
        }
    }

    /// Provides the dimensions of the underlying grid as `(width, height)`.
    #[must_use]
    pub const fn bounds(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Reports whether the cell lies within the grid.
    #[must_use]
    pub const fn contains(&self, cell: CellCoord) -> bool {
        cell.column() < self.width && cell.row() < self.height
    }

    /// Returns the classification of the provided cell.
    pub fn classify(&self, cell: CellCoord) -> Result<TileKind, GridError> {
        let index = self.checked_index(cell)?;
        Ok(self.tiles[index])
    }

    /// Reports whether the provided cell permits traversal, ignoring occupants.
    pub fn is_walkable(&self, cell: CellCoord) -> Result<bool, GridError> {
        let index = self.checked_index(cell)?;
        Ok(self.walkable_at(index))
    }

    /// Returns the agent standing on the provided cell, if any.
    pub fn occupant(&self, cell: CellCoord) -> Result<Option<AgentId>, GridError> {
        let index = self.checked_index(cell)?;
        Ok(self.occupants[index])
    }

    /// Converts a cell into its row-major index, if it lies within the grid.
    #[must_use]
    pub fn index(&self, cell: CellCoord) -> Option<usize> {
        if !self.contains(cell) {
            return None;
        }
        let row = usize::try_from(cell.row()).ok()?;
        let column = usize::try_from(cell.column()).ok()?;
        let width = usize::try_from(self.width).ok()?;
        Some(row * width + column)
    }

    /// Converts a row-major index back into a cell coordinate.
    #[must_use]
    pub fn cell_at(&self, index: usize) -> CellCoord {
        let width = self.width.max(1) as usize;
        CellCoord::new((index % width) as u32, (index / width) as u32)
    }

    /// Number of cells covered by the view.
    #[must_use]
    pub fn cell_count(&self) -> usize {
        self.tiles.len()
    }

    /// Walkability of the cell stored at a row-major index.
    ///
    /// Indices outside the grid are reported as non-walkable.
    #[must_use]
    pub fn walkable_at(&self, index: usize) -> bool {
        self.tiles
            .get(index)
            .is_some_and(|kind| kind.is_walkable(self.door_policy))
    }

    /// Occupant of the cell stored at a row-major index.
    #[must_use]
    pub fn occupant_at(&self, index: usize) -> Option<AgentId> {
        self.occupants.get(index).copied().flatten()
    }

    fn checked_index(&self, cell: CellCoord) -> Result<usize, GridError> {
        self.index(cell).ok_or(GridError::InvalidCoordinate {
            cell,
            width: self.width,
            height: self.height,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{AgentId, CellCoord, CollisionView, DoorPolicy, GridError, TileKind};
    use serde::{de::DeserializeOwned, Serialize};

    #[test]
    fn manhattan_distance_matches_expectation() {
        let origin = CellCoord::new(1, 1);
        let destination = CellCoord::new(4, 3);
        assert_eq!(origin.manhattan_distance(destination), 5);
        assert_eq!(destination.manhattan_distance(origin), 5);
    }

    #[test]
    fn adjacency_covers_all_eight_neighbours() {
        let origin = CellCoord::new(3, 3);
        let mut adjacent = 0;
        for column in 1..=5 {
            for row in 1..=5 {
                if origin.is_adjacent(CellCoord::new(column, row)) {
                    adjacent += 1;
                }
            }
        }
        assert_eq!(adjacent, 8);
        assert!(!origin.is_adjacent(origin));
    }

    #[test]
    fn euclidean_distance_separates_diagonal_from_two_steps() {
        let origin = CellCoord::new(0, 0);
        assert!(origin.euclidean_distance(CellCoord::new(1, 1)) < 2.0);
        assert!(origin.euclidean_distance(CellCoord::new(2, 0)) >= 2.0);
    }

    #[test]
    fn door_walkability_follows_policy() {
        assert!(!TileKind::Door.is_walkable(DoorPolicy::Blocking));
        assert!(TileKind::Door.is_walkable(DoorPolicy::Passable));
        assert!(TileKind::OpenDoor.is_walkable(DoorPolicy::Blocking));
        assert!(!TileKind::Wall.is_walkable(DoorPolicy::Passable));
    }

    #[test]
    fn view_rejects_out_of_bounds_cells() {
        let tiles = [TileKind::Floor, TileKind::Wall];
        let occupants = [Some(AgentId::new(4)), None];
        let view = CollisionView::new(&tiles, &occupants, 2, 1, DoorPolicy::Blocking);

        assert_eq!(view.classify(CellCoord::new(1, 0)), Ok(TileKind::Wall));
        assert_eq!(view.occupant(CellCoord::new(0, 0)), Ok(Some(AgentId::new(4))));
        assert_eq!(
            view.is_walkable(CellCoord::new(2, 0)),
            Err(GridError::InvalidCoordinate {
                cell: CellCoord::new(2, 0),
                width: 2,
                height: 1,
            })
        );
        assert_eq!(view.cell_at(1), CellCoord::new(1, 0));
    }

    fn assert_round_trip<T>(value: &T)
    where
        T: Serialize + DeserializeOwned + PartialEq + std::fmt::Debug,
    {
        let bytes = bincode::serialize(value).expect("serialize");
        let restored: T = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(&restored, value);
    }

    #[test]
    fn grid_error_round_trips_through_bincode() {
        assert_round_trip(&GridError::OccupiedCell {
            cell: CellCoord::new(5, 7),
            occupant: AgentId::new(9),
        });
    }
}
