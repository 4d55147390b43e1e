//! ASCII level format consumed by the level loader.
//!
//! Each non-blank line is one row of the grid. Recognised glyphs:
//!
//! | glyph | cell                                   |
//! |-------|----------------------------------------|
//! | `#`   | wall                                   |
//! | `.`   | floor                                  |
//! | `D`   | locked door                            |
//! | `/`   | open door                              |
//! | `@`   | floor, spawn of the controlled agent   |
//! | `a`   | floor, spawn of another agent          |

use gridnav_core::{CellCoord, DoorPolicy, TileKind};
use thiserror::Error;

use crate::CollisionMap;

/// Role of an agent spawned from level data.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SpawnRole {
    /// The agent steered by player input.
    Controlled,
    /// Any other agent.
    Other,
}

/// Spawn marker authored into the level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Spawn {
    /// Cell the agent starts on.
    pub cell: CellCoord,
    /// Role assigned to the spawned agent.
    pub role: SpawnRole,
}

/// Errors produced while parsing level text.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum LevelError {
    /// The level did not contain any rows.
    #[error("level contains no rows")]
    Empty,
    /// A row's length differs from the first row.
    #[error("row {row} has {found} cells, expected {expected}")]
    RaggedRow {
        /// Zero-based index of the offending row.
        row: u32,
        /// Width established by the first row.
        expected: u32,
        /// Width of the offending row.
        found: u32,
    },
    /// A glyph outside the recognised set was encountered.
    #[error("unknown glyph {glyph:?} at {cell}")]
    UnknownGlyph {
        /// Character that failed to parse.
        glyph: char,
        /// Location of the character.
        cell: CellCoord,
    },
    /// More than one controlled-agent spawn was authored.
    #[error("second controlled spawn at {cell}")]
    DuplicateControlledSpawn {
        /// Location of the second marker.
        cell: CellCoord,
    },
}

/// Parsed level data ready to seed a [`CollisionMap`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Level {
    width: u32,
    height: u32,
    tiles: Vec<TileKind>,
    spawns: Vec<Spawn>,
}

impl Level {
    /// Parses level text in the ASCII format described at module level.
    pub fn parse(text: &str) -> Result<Self, LevelError> {
        let rows: Vec<&str> = text
            .lines()
            .map(|line| line.trim_end_matches('\r'))
            .filter(|line| !line.trim().is_empty())
            .collect();

        let Some(first) = rows.first() else {
            return Err(LevelError::Empty);
        };
        let width = first.chars().count() as u32;

        let mut tiles = Vec::with_capacity(rows.len() * width as usize);
        let mut spawns = Vec::new();
        let mut controlled_seen = false;

        for (row_index, line) in rows.iter().enumerate() {
            let row = row_index as u32;
            let found = line.chars().count() as u32;
            if found != width {
                return Err(LevelError::RaggedRow {
                    row,
                    expected: width,
                    found,
                });
            }

            for (column_index, glyph) in line.chars().enumerate() {
                let cell = CellCoord::new(column_index as u32, row);
                let kind = match glyph {
                    '#' => TileKind::Wall,
                    '.' => TileKind::Floor,
                    'D' => TileKind::Door,
                    '/' => TileKind::OpenDoor,
                    '@' => {
                        if controlled_seen {
                            return Err(LevelError::DuplicateControlledSpawn { cell });
                        }
                        controlled_seen = true;
                        spawns.push(Spawn {
                            cell,
                            role: SpawnRole::Controlled,
                        });
                        TileKind::Floor
                    }
                    'a' => {
                        spawns.push(Spawn {
                            cell,
                            role: SpawnRole::Other,
                        });
                        TileKind::Floor
                    }
                    _ => return Err(LevelError::UnknownGlyph { glyph, cell }),
                };
                tiles.push(kind);
            }
        }

        Ok(Self {
            width,
            height: rows.len() as u32,
            tiles,
            spawns,
        })
    }

    /// Width of the level in cells.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Height of the level in cells.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Authored classification of a cell; cells outside the level are walls.
    #[must_use]
    pub fn initial_kind(&self, cell: CellCoord) -> TileKind {
        if cell.column() >= self.width || cell.row() >= self.height {
            return TileKind::Wall;
        }
        let index = cell.row() as usize * self.width as usize + cell.column() as usize;
        self.tiles[index]
    }

    /// Spawn markers in reading order.
    #[must_use]
    pub fn spawns(&self) -> &[Spawn] {
        &self.spawns
    }

    /// Spawn cell of the controlled agent, if the level authors one.
    #[must_use]
    pub fn controlled_spawn(&self) -> Option<CellCoord> {
        self.spawns
            .iter()
            .find(|spawn| spawn.role == SpawnRole::Controlled)
            .map(|spawn| spawn.cell)
    }

    /// Builds the collision map described by this level.
    #[must_use]
    pub fn collision_map(&self, door_policy: DoorPolicy) -> CollisionMap {
        CollisionMap::from_fn(self.width, self.height, door_policy, |cell| {
            self.initial_kind(cell)
        })
    }
}
