use gridnav_core::DoorPolicy;
use gridnav_system_pathfinding::SearchParams;
use serde::Deserialize;
use thiserror::Error;

/// Tuning shared by every controller owned by the navigation system.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NavigationConfig {
    /// World units spanned by one grid cell.
    pub tile_size: f32,
    /// World units an agent may travel per tick.
    pub speed: f32,
    /// Weight applied to the search heuristic.
    pub heuristic_weight: u32,
    /// Effort budget handed to every search.
    pub effort_budget: u32,
    /// Upper bound on searches started in a single tick; unlimited when absent.
    pub max_searches_per_tick: Option<u32>,
    /// Whether locked doors block traversal on freshly loaded maps.
    pub door_policy: DoorPolicy,
}

impl NavigationConfig {
    /// Search parameters derived from this configuration.
    #[must_use]
    pub const fn search_params(&self) -> SearchParams {
        SearchParams::new(self.heuristic_weight, self.effort_budget)
    }

    /// Rejects values the motion integrator cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.tile_size.is_finite() && self.tile_size > 0.0) {
            return Err(ConfigError::TileSize(self.tile_size));
        }
        if !(self.speed.is_finite() && self.speed > 0.0) {
            return Err(ConfigError::Speed(self.speed));
        }
        if self.max_searches_per_tick == Some(0) {
            return Err(ConfigError::SearchCap);
        }
        Ok(())
    }
}

impl Default for NavigationConfig {
    fn default() -> Self {
        let search = SearchParams::default();
        Self {
            tile_size: 16.0,
            speed: 4.0,
            heuristic_weight: search.heuristic_weight,
            effort_budget: search.effort_budget,
            max_searches_per_tick: None,
            door_policy: DoorPolicy::default(),
        }
    }
}

/// Invalid navigation configuration values.
#[derive(Clone, Copy, Debug, PartialEq, Error)]
pub enum ConfigError {
    /// Tile size must be a positive finite number.
    #[error("tile size must be positive, got {0}")]
    TileSize(f32),
    /// Speed must be a positive finite number.
    #[error("speed must be positive, got {0}")]
    Speed(f32),
    /// A search cap of zero would stall every agent forever.
    #[error("max_searches_per_tick must be at least 1")]
    SearchCap,
}
