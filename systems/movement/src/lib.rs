#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic navigation system that plans routes and moves agents along them.

mod config;
mod controller;
pub mod motion;

use std::collections::{BTreeMap, BTreeSet};

use glam::Vec2;
use gridnav_core::{AgentId, CellCoord, CollisionView, Command, Event};
use gridnav_system_pathfinding::Pathfinder;
use log::{debug, warn};

pub use config::{ConfigError, NavigationConfig};
pub use controller::{Controller, ControllerState, TickOutcome};

/// Summary of one controller's tick, kept for diagnostics and adapters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TickReport {
    /// Index of the tick the report belongs to.
    pub tick: u64,
    /// Agent the report describes.
    pub agent: AgentId,
    /// What the controller did.
    pub outcome: TickOutcome,
    /// Controller state after the tick.
    pub state: ControllerState,
    /// Continuous position after the tick.
    pub position: Vec2,
}

/// Pure system that reacts to world events and emits navigation commands.
#[derive(Debug)]
pub struct Navigation {
    config: NavigationConfig,
    controllers: BTreeMap<AgentId, Controller>,
    pathfinder: Pathfinder,
    deferred: BTreeSet<AgentId>,
    reports: Vec<TickReport>,
}

impl Navigation {
    /// Creates a navigation system without any controllers.
    #[must_use]
    pub fn new(config: NavigationConfig) -> Self {
        Self {
            config,
            controllers: BTreeMap::new(),
            pathfinder: Pathfinder::new(),
            deferred: BTreeSet::new(),
            reports: Vec::new(),
        }
    }

    /// Controller of the provided agent, if it exists.
    #[must_use]
    pub fn controller(&self, agent: AgentId) -> Option<&Controller> {
        self.controllers.get(&agent)
    }

    /// Steers an agent directly, bypassing the command queue.
    ///
    /// Returns `false` when the agent has no controller.
    pub fn set_destination(&mut self, agent: AgentId, cell: CellCoord) -> bool {
        match self.controllers.get_mut(&agent) {
            Some(controller) => {
                controller.set_destination(cell);
                true
            }
            None => false,
        }
    }

    /// Reports produced by the most recent tick, in agent order.
    #[must_use]
    pub fn last_reports(&self) -> &[TickReport] {
        &self.reports
    }

    /// Consumes world events and the collision view to emit navigation commands.
    pub fn handle(&mut self, events: &[Event], view: CollisionView<'_>, out: &mut Vec<Command>) {
        for event in events {
            match *event {
                Event::AgentSpawned { agent, cell } => {
                    let _ = self
                        .controllers
                        .insert(agent, Controller::new(agent, cell, self.config.tile_size));
                }
                Event::AgentDespawned { agent } => {
                    let _ = self.controllers.remove(&agent);
                    let _ = self.deferred.remove(&agent);
                }
                Event::MapMutated => {
                    for controller in self.controllers.values_mut() {
                        controller.invalidate();
                    }
                }
                Event::DestinationRequested { agent, cell } => {
                    let _ = self.set_destination(agent, cell);
                }
                Event::TimeAdvanced { tick } => self.run_tick(tick, view, out),
                _ => {}
            }
        }
    }

    fn run_tick(&mut self, tick: u64, view: CollisionView<'_>, out: &mut Vec<Command>) {
        self.reports.clear();
        let allowed = self.allot_searches(&view);
        self.deferred.clear();

        for (agent, controller) in &mut self.controllers {
            let before = controller.current_cell();
            let outcome = match controller.tick(
                &mut self.pathfinder,
                view,
                &self.config,
                allowed.contains(agent),
            ) {
                Ok(outcome) => outcome,
                Err(error) => {
                    warn!("agent {agent}: navigation aborted: {error}");
                    continue;
                }
            };

            match outcome {
                TickOutcome::Deferred => {
                    let _ = self.deferred.insert(*agent);
                }
                TickOutcome::Interaction { target } => out.push(Command::Interact {
                    agent: *agent,
                    target,
                }),
                _ => {}
            }

            let after = controller.current_cell();
            if after != before {
                out.push(Command::RelocateAgent {
                    agent: *agent,
                    cell: after,
                });
            }

            self.reports.push(TickReport {
                tick,
                agent: *agent,
                outcome,
                state: controller.state(),
                position: controller.position(),
            });
        }
    }

    /// Agents allowed to search this tick; agents deferred last tick go first.
    fn allot_searches(&self, view: &CollisionView<'_>) -> BTreeSet<AgentId> {
        let (carried, fresh): (Vec<AgentId>, Vec<AgentId>) = self
            .controllers
            .iter()
            .filter(|(_, controller)| controller.needs_search(view))
            .map(|(agent, _)| *agent)
            .partition(|agent| self.deferred.contains(agent));

        let cap = self
            .config
            .max_searches_per_tick
            .map_or(usize::MAX, |cap| cap as usize);
        let total = carried.len() + fresh.len();
        if total > cap {
            debug!("search cap reached: deferring {} agents", total - cap);
        }
        carried.into_iter().chain(fresh).take(cap).collect()
    }
}

impl Default for Navigation {
    fn default() -> Self {
        Self::new(NavigationConfig::default())
    }
}
