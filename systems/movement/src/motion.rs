//! Continuous motion toward grid waypoints.

use glam::Vec2;
use gridnav_core::CellCoord;

/// Distance below which a position counts as standing on its target.
pub const ARRIVAL_TOLERANCE: f32 = 1.0e-3;

/// Result of advancing toward a single target.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Advance {
    /// Position after the advance.
    pub position: Vec2,
    /// Travel left over once the target was reached.
    pub leftover: f32,
    /// Whether the target was reached and snapped onto.
    pub reached: bool,
}

/// Moves `position` toward `target` by at most `travel` without overshooting.
#[must_use]
pub fn advance(position: Vec2, target: Vec2, travel: f32) -> Advance {
    let offset = target - position;
    let distance = offset.length();

    if distance <= ARRIVAL_TOLERANCE {
        return Advance {
            position: target,
            leftover: travel,
            reached: true,
        };
    }

    if distance <= travel {
        return Advance {
            position: target,
            leftover: travel - distance,
            reached: true,
        };
    }

    Advance {
        position: position + offset / distance * travel.max(0.0),
        leftover: 0.0,
        reached: false,
    }
}

/// World-space position of a cell's origin.
#[must_use]
pub fn cell_position(cell: CellCoord, tile_size: f32) -> Vec2 {
    Vec2::new(cell.column() as f32, cell.row() as f32) * tile_size
}

/// Cell nearest to a world-space position.
#[must_use]
pub fn nearest_cell(position: Vec2, tile_size: f32) -> CellCoord {
    let scaled = (position / tile_size).round().max(Vec2::ZERO);
    CellCoord::new(scaled.x as u32, scaled.y as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_is_bounded_by_travel() {
        let step = advance(Vec2::ZERO, Vec2::new(10.0, 0.0), 4.0);

        assert_eq!(step.position, Vec2::new(4.0, 0.0));
        assert_eq!(step.leftover, 0.0);
        assert!(!step.reached);
    }

    #[test]
    fn advance_snaps_and_reports_leftover() {
        let step = advance(Vec2::new(8.0, 0.0), Vec2::new(10.0, 0.0), 4.0);

        assert_eq!(step.position, Vec2::new(10.0, 0.0));
        assert_eq!(step.leftover, 2.0);
        assert!(step.reached);
    }

    #[test]
    fn diagonal_travel_is_normalised() {
        let step = advance(Vec2::ZERO, Vec2::new(16.0, 16.0), 4.0);

        assert!((step.position.length() - 4.0).abs() < 1.0e-4);
        assert!((step.position.x - step.position.y).abs() < 1.0e-6);
    }

    #[test]
    fn standing_on_target_applies_no_movement() {
        let target = Vec2::new(3.0, 5.0);
        let step = advance(target, target, 4.0);

        assert_eq!(step.position, target);
        assert_eq!(step.leftover, 4.0);
        assert!(step.reached);
    }

    #[test]
    fn nearest_cell_rounds_to_closest_centre() {
        assert_eq!(nearest_cell(Vec2::new(7.9, 8.1), 16.0), CellCoord::new(0, 1));
        assert_eq!(nearest_cell(Vec2::new(-3.0, 40.0), 16.0), CellCoord::new(0, 3));
        assert_eq!(
            cell_position(CellCoord::new(2, 3), 16.0),
            Vec2::new(32.0, 48.0)
        );
    }
}
