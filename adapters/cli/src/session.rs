use glam::Vec2;
use gridnav_core::{AgentId, CellCoord, Command, DoorPolicy, Event};
use gridnav_system_movement::{Navigation, NavigationConfig, TickReport};
use gridnav_world::{
    self as world,
    level::{Level, SpawnRole},
    query, World,
};

/// Drives the world and the navigation system from scripted input.
#[derive(Debug)]
pub(crate) struct Session {
    world: World,
    navigation: Navigation,
    controlled: Option<AgentId>,
    rejected: usize,
}

impl Session {
    /// Loads the level into a fresh world and spawns every authored agent.
    ///
    /// Agents receive ids in reading order starting at 1.
    pub(crate) fn new(level: &Level, config: NavigationConfig) -> Self {
        let mut session = Self {
            world: World::new(level.collision_map(config.door_policy)),
            navigation: Navigation::new(config),
            controlled: None,
            rejected: 0,
        };

        for (index, spawn) in level.spawns().iter().enumerate() {
            let agent = AgentId::new(index as u32 + 1);
            if spawn.role == SpawnRole::Controlled {
                session.controlled = Some(agent);
            }
            session.submit(Command::SpawnAgent {
                agent,
                cell: spawn.cell,
            });
        }

        session
    }

    /// Agent steered by the player, if the level authored one.
    pub(crate) fn controlled(&self) -> Option<AgentId> {
        self.controlled
    }

    /// Applies a command and feeds the resulting events through navigation
    /// until no further commands are produced.
    pub(crate) fn submit(&mut self, command: Command) {
        let mut events = Vec::new();
        world::apply(&mut self.world, command, &mut events);

        while !events.is_empty() {
            self.rejected += events
                .iter()
                .filter(|event| matches!(event, Event::CommandRejected { .. }))
                .count();
            let mut commands = Vec::new();
            self.navigation
                .handle(&events, query::collision_view(&self.world), &mut commands);
            events.clear();
            for command in commands {
                world::apply(&mut self.world, command, &mut events);
            }
        }
    }

    /// Runs a single tick and returns the per-agent reports it produced.
    pub(crate) fn step(&mut self) -> &[TickReport] {
        self.submit(Command::Tick);
        self.navigation.last_reports()
    }

    /// Number of ticks simulated so far.
    pub(crate) fn tick_index(&self) -> u64 {
        query::tick_index(&self.world)
    }

    /// Cell the world currently assigns to `agent`.
    pub(crate) fn agent_cell(&self, agent: AgentId) -> Option<CellCoord> {
        query::agent_cell(&self.world, agent)
    }

    /// Continuous position of `agent`.
    pub(crate) fn position(&self, agent: AgentId) -> Option<Vec2> {
        self.navigation
            .controller(agent)
            .map(|controller| controller.position())
    }

    /// Remaining waypoints of `agent`'s cached path.
    pub(crate) fn path(&self, agent: AgentId) -> Vec<CellCoord> {
        self.navigation
            .controller(agent)
            .map(|controller| controller.path().to_vec())
            .unwrap_or_default()
    }

    /// Policy the loaded map applies to locked doors.
    pub(crate) fn door_policy(&self) -> DoorPolicy {
        query::collision_map(&self.world).door_policy()
    }

    /// Number of commands the world rejected.
    pub(crate) fn rejected(&self) -> usize {
        self.rejected
    }
}

/// Walkable cell farthest from `origin`, preferring the last one in reading order.
pub(crate) fn farthest_walkable(level: &Level, config: &NavigationConfig, origin: CellCoord) -> Option<CellCoord> {
    (0..level.height())
        .flat_map(|row| (0..level.width()).map(move |column| CellCoord::new(column, row)))
        .filter(|cell| level.initial_kind(*cell).is_walkable(config.door_policy))
        .max_by_key(|cell| cell.manhattan_distance(origin))
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridnav_system_movement::{ControllerState, TickOutcome};

    const HALL: &str = "\
#######
#@..a.#
#.###.#
#.....#
#######
";

    #[test]
    fn spawns_agents_in_reading_order() {
        let level = Level::parse(HALL).expect("level parses");
        let session = Session::new(&level, NavigationConfig::default());

        assert_eq!(session.controlled(), Some(AgentId::new(1)));
        assert_eq!(session.door_policy(), DoorPolicy::Blocking);
        assert_eq!(session.agent_cell(AgentId::new(1)), Some(CellCoord::new(1, 1)));
        assert_eq!(session.agent_cell(AgentId::new(2)), Some(CellCoord::new(4, 1)));
        assert_eq!(session.rejected(), 0);
    }

    #[test]
    fn controlled_agent_reaches_far_corner() {
        let level = Level::parse(HALL).expect("level parses");
        let config = NavigationConfig::default();
        let mut session = Session::new(&level, config);
        let agent = session.controlled().expect("controlled agent");
        let goal = farthest_walkable(&level, &config, CellCoord::new(1, 1)).expect("walkable cell");
        assert_eq!(goal, CellCoord::new(5, 3));

        session.submit(Command::SetDestination { agent, cell: goal });
        assert_eq!(session.path(agent), Vec::<CellCoord>::new());

        let mut arrived = false;
        for _ in 0..60 {
            let reports = session.step();
            if reports.iter().any(|report| {
                report.agent == agent
                    && report.outcome == TickOutcome::Arrived { cell: goal }
                    && report.state == ControllerState::Arrived
            }) {
                arrived = true;
                break;
            }
        }

        assert!(arrived);
        assert_eq!(session.agent_cell(agent), Some(goal));
        assert_eq!(session.position(agent), Some(Vec2::new(80.0, 48.0)));
        assert!(session.tick_index() > 0);
    }

    #[test]
    fn bundled_vault_opens_after_unlock() {
        let text = include_str!("../../../assets/levels/vault.txt");
        let level = Level::parse(text).expect("bundled level parses");
        let config = NavigationConfig::default();
        let mut session = Session::new(&level, config);
        let agent = session.controlled().expect("controlled agent");
        let behind_door = CellCoord::new(7, 3);

        session.submit(Command::SetDestination {
            agent,
            cell: behind_door,
        });
        let reports = session.step();
        assert!(matches!(
            reports.iter().find(|report| report.agent == agent).map(|report| report.outcome),
            Some(TickOutcome::Blocked { .. })
        ));

        session.submit(Command::UnlockDoors);
        session.submit(Command::SetDestination {
            agent,
            cell: behind_door,
        });
        for _ in 0..120 {
            let _ = session.step();
        }

        assert_eq!(session.agent_cell(agent), Some(behind_door));
    }

    #[test]
    fn unknown_agents_are_counted_as_rejected() {
        let level = Level::parse(HALL).expect("level parses");
        let mut session = Session::new(&level, NavigationConfig::default());

        session.submit(Command::SetDestination {
            agent: AgentId::new(99),
            cell: CellCoord::new(1, 1),
        });

        assert_eq!(session.rejected(), 1);
    }
}
