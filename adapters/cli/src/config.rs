use std::{fs, path::Path};

use anyhow::{Context, Result};
use gridnav_system_movement::NavigationConfig;
use serde::Deserialize;

/// Default number of ticks simulated when neither the config nor the flags say otherwise.
pub(crate) const DEFAULT_TICKS: u64 = 120;

/// Contents of the optional TOML configuration file.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct SimulationConfig {
    /// Number of ticks to simulate.
    pub(crate) ticks: u64,
    /// Tuning forwarded to the navigation system.
    pub(crate) navigation: NavigationConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            ticks: DEFAULT_TICKS,
            navigation: NavigationConfig::default(),
        }
    }
}

impl SimulationConfig {
    /// Reads and validates the configuration stored at `path`.
    pub(crate) fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read config at {}", path.display()))?;
        Self::parse(&contents).with_context(|| format!("invalid config at {}", path.display()))
    }

    fn parse(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents).context("failed to parse config toml")?;
        config
            .navigation
            .validate()
            .context("invalid [navigation] table")?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridnav_core::DoorPolicy;

    #[test]
    fn empty_file_uses_defaults() {
        let config = SimulationConfig::parse("").expect("empty config is valid");

        assert_eq!(config, SimulationConfig::default());
    }

    #[test]
    fn navigation_table_overrides_selected_fields() {
        let config = SimulationConfig::parse(
            r#"
ticks = 40

[navigation]
speed = 8.0
effort_budget = 5
door_policy = "passable"
"#,
        )
        .expect("config parses");

        assert_eq!(config.ticks, 40);
        assert_eq!(config.navigation.speed, 8.0);
        assert_eq!(config.navigation.effort_budget, 5);
        assert_eq!(config.navigation.door_policy, DoorPolicy::Passable);
        assert_eq!(
            config.navigation.tile_size,
            NavigationConfig::default().tile_size
        );
    }

    #[test]
    fn invalid_values_are_reported() {
        let error = SimulationConfig::parse("[navigation]\ntile_size = -2.0\n")
            .expect_err("negative tile size must be rejected");

        assert!(format!("{error:#}").contains("tile size must be positive"));
    }

    #[test]
    fn bundled_config_loads() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../assets/navigation.toml");

        let config = SimulationConfig::load(path).expect("bundled config is valid");

        assert_eq!(config.ticks, 200);
        assert_eq!(config.navigation.max_searches_per_tick, Some(4));
    }

    #[test]
    fn missing_file_names_the_path() {
        let error = SimulationConfig::load("does/not/exist.toml").expect_err("file is missing");

        assert!(format!("{error}").contains("does/not/exist.toml"));
    }
}
