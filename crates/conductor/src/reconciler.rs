//! Conflict resolution and ordering.
//!
//! The reconciler turns the flat list of actions produced by evaluators into
//! an [`ExecutionGraph`]:
//!
//! 1. Actions are partitioned by the device that executes them, and exact
//!    duplicates are folded together.
//! 2. Within a device, an action whose name another action's evaluator
//!    declares incompatible is a conflict. A device-specific action overrides
//!    a room-wide one; two of the same kind cannot be resolved.
//! 3. Each device's actions are sorted by priority (then device id, then
//!    name) and chained, and every chain head hangs off the synthetic root.
//!
//! Either failure aborts the whole request; no partial graph is returned.

use std::collections::{BTreeMap, HashMap};

use roomproto::RoomConfiguration;
use thiserror::Error;

use crate::action::Action;
use crate::graph::ExecutionGraph;
use crate::registry::EvaluatorRegistry;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconcileError {
    #[error("action {action} on {device} names unknown generator {generator}")]
    UnknownGenerator {
        action: String,
        device: String,
        generator: String,
    },

    #[error("conflicting actions on {device}: {first} and {second}")]
    ConflictingActions {
        device: String,
        first: String,
        second: String,
    },
}

/// Builds execution graphs against one registry and, optionally, one room's
/// evaluator configuration.
pub struct Reconciler<'r> {
    registry: &'r EvaluatorRegistry,
    room: Option<&'r RoomConfiguration>,
}

impl<'r> Reconciler<'r> {
    pub fn new(registry: &'r EvaluatorRegistry) -> Self {
        Self {
            registry,
            room: None,
        }
    }

    /// Prefer this room's evaluator priorities over the registry's.
    pub fn with_room_configuration(mut self, room: &'r RoomConfiguration) -> Self {
        self.room = Some(room);
        self
    }

    #[tracing::instrument(skip_all, fields(actions = actions.len()))]
    pub fn reconcile(&self, actions: Vec<Action>) -> Result<ExecutionGraph, ReconcileError> {
        // Resolve every priority up front; an unknown generator is fatal.
        for action in &actions {
            self.priority(action)?;
        }

        let mut by_device: BTreeMap<String, Vec<Action>> = BTreeMap::new();
        for action in actions {
            let group = by_device.entry(action.device.id.clone()).or_default();
            match group.iter_mut().find(|existing| existing.is_duplicate_of(&action)) {
                Some(existing) => {
                    tracing::trace!(
                        device = %action.device.id,
                        action = %action.name,
                        "duplicate folded"
                    );
                    existing.absorb(action);
                }
                None => group.push(action),
            }
        }

        let mut graph = ExecutionGraph::new();

        for (device, mut group) in by_device {
            self.resolve_conflicts(&device, &mut group)?;

            let mut keyed = Vec::with_capacity(group.len());
            for action in group {
                keyed.push((self.priority(&action)?, action));
            }
            keyed.sort_by(|(pa, a), (pb, b)| {
                pa.cmp(pb)
                    .then_with(|| a.device.id.cmp(&b.device.id))
                    .then_with(|| a.name.cmp(&b.name))
            });

            let mut parent = graph.root();
            for (priority, action) in keyed {
                tracing::debug!(
                    device = %device,
                    action = %action.name,
                    priority,
                    overridden = action.overridden,
                    "scheduled"
                );
                let id = graph.push(action);
                graph.link(parent, id);
                parent = id;
            }
        }

        tracing::debug!(
            chains = graph.children(graph.root()).len(),
            actions = graph.action_count(),
            "execution graph built"
        );
        Ok(graph)
    }

    fn priority(&self, action: &Action) -> Result<i32, ReconcileError> {
        self.registry
            .priority_in(&action.generator, self.room)
            .ok_or_else(|| ReconcileError::UnknownGenerator {
                action: action.name.clone(),
                device: action.device.id.clone(),
                generator: action.generator.clone(),
            })
    }

    /// Mark overridden actions within one device's group.
    fn resolve_conflicts(&self, device: &str, group: &mut [Action]) -> Result<(), ReconcileError> {
        let mut by_name: HashMap<String, Vec<usize>> = HashMap::new();
        let mut incompatible_by: Vec<(String, usize)> = Vec::new();

        for (index, action) in group.iter().enumerate() {
            by_name
                .entry(action.name.to_lowercase())
                .or_default()
                .push(index);

            let evaluator = self.registry.get(&action.generator).ok_or_else(|| {
                ReconcileError::UnknownGenerator {
                    action: action.name.clone(),
                    device: device.to_string(),
                    generator: action.generator.clone(),
                }
            })?;
            for name in evaluator.incompatible_commands() {
                incompatible_by.push((name.to_lowercase(), index));
            }
        }

        for (name, declarer) in incompatible_by {
            let Some(targets) = by_name.get(&name) else {
                continue;
            };

            for &current in targets {
                if current == declarer || group[current].overridden || group[declarer].overridden {
                    continue;
                }

                let loser = match (group[declarer].device_specific, group[current].device_specific) {
                    (true, false) => current,
                    (false, true) => declarer,
                    _ => {
                        return Err(ReconcileError::ConflictingActions {
                            device: device.to_string(),
                            first: group[declarer].name.clone(),
                            second: group[current].name.clone(),
                        })
                    }
                };

                tracing::info!(
                    device = %device,
                    action = %group[loser].name,
                    generator = %group[loser].generator,
                    "room-wide action overridden by device-specific request"
                );
                group[loser].overridden = true;
            }
        }

        Ok(())
    }
}
