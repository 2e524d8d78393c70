//! Evaluator trait and the registry that owns evaluator instances.
//!
//! The registry is an ordinary value: build it once at startup, adjust
//! priorities from configuration, then share it behind an `Arc`.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use roomproto::{Device, RoomConfiguration, RoomState};

use crate::action::Action;
use crate::evaluators::{self, EvaluationError};

/// What an evaluator may look at besides the requested state.
#[derive(Debug, Clone, Copy)]
pub struct EvaluationContext<'a> {
    pub building: &'a str,
    pub room: &'a str,
    /// Every device in the room.
    pub devices: &'a [Device],
    pub requestor: &'a str,
}

impl<'a> EvaluationContext<'a> {
    pub fn new(
        building: &'a str,
        room: &'a str,
        devices: &'a [Device],
        requestor: &'a str,
    ) -> Self {
        Self {
            building,
            room,
            devices,
            requestor,
        }
    }

    /// Find a device by id or name, ignoring case.
    pub fn device(&self, name: &str) -> Result<&'a Device, EvaluationError> {
        let devices = self.devices;
        devices
            .iter()
            .find(|d| d.matches(name))
            .ok_or_else(|| EvaluationError::UnknownDevice(name.to_string()))
    }

    pub fn devices_with_role(&self, role: &'a str) -> impl Iterator<Item = &'a Device> + 'a {
        let devices = self.devices;
        devices.iter().filter(move |d| d.has_role(role))
    }

    /// Map a user-facing device name to its id; unknown names pass through.
    pub fn resolve_id(&self, name: &str) -> String {
        self.devices
            .iter()
            .find(|d| d.matches(name))
            .map(|d| d.id.clone())
            .unwrap_or_else(|| name.to_string())
    }
}

/// Turns a requested room state into device commands.
pub trait CommandEvaluator: Send + Sync {
    /// Registry key, also stamped on every action as its generator.
    fn key(&self) -> &'static str;

    fn evaluate(
        &self,
        state: &RoomState,
        ctx: &EvaluationContext<'_>,
    ) -> Result<Vec<Action>, EvaluationError>;

    /// Reject an action the target device cannot perform.
    fn validate(&self, action: &Action) -> Result<(), EvaluationError>;

    /// Command names that must not run on the same device as this
    /// evaluator's command.
    fn incompatible_commands(&self) -> &'static [&'static str] {
        &[]
    }

    /// Lower runs earlier within a device's chain.
    fn default_priority(&self) -> i32;
}

struct Registered {
    evaluator: Arc<dyn CommandEvaluator>,
    priority: i32,
}

/// Evaluators by key. Keys match case-insensitively.
#[derive(Default)]
pub struct EvaluatorRegistry {
    entries: HashMap<String, Registered>,
}

impl EvaluatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in evaluator at its default priority.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for evaluator in evaluators::builtin() {
            registry.register(evaluator);
        }
        registry
    }

    /// Add or replace an evaluator under its own key.
    pub fn register(&mut self, evaluator: Arc<dyn CommandEvaluator>) {
        let priority = evaluator.default_priority();
        self.entries.insert(
            evaluator.key().to_lowercase(),
            Registered {
                evaluator,
                priority,
            },
        );
    }

    pub fn get(&self, key: &str) -> Option<&Arc<dyn CommandEvaluator>> {
        self.entries.get(&key.to_lowercase()).map(|e| &e.evaluator)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(&key.to_lowercase())
    }

    pub fn priority(&self, key: &str) -> Option<i32> {
        self.entries.get(&key.to_lowercase()).map(|e| e.priority)
    }

    /// Returns false if no evaluator is registered under `key`.
    pub fn set_priority(&mut self, key: &str, priority: i32) -> bool {
        match self.entries.get_mut(&key.to_lowercase()) {
            Some(entry) => {
                entry.priority = priority;
                true
            }
            None => false,
        }
    }

    /// Apply configured priorities, returning the keys nothing is registered under.
    pub fn apply_priorities(&mut self, priorities: &BTreeMap<String, i32>) -> Vec<String> {
        let mut unknown = Vec::new();
        for (key, &priority) in priorities {
            if self.set_priority(key, priority) {
                tracing::debug!(evaluator = %key, priority, "priority overridden");
            } else {
                tracing::warn!(evaluator = %key, "priority configured for unknown evaluator");
                unknown.push(key.clone());
            }
        }
        unknown
    }

    /// Priority for `key` in a room: the room's own setting, then ours.
    pub fn priority_in(&self, key: &str, room: Option<&RoomConfiguration>) -> Option<i32> {
        let configured = room.and_then(|config| {
            config
                .evaluators
                .iter()
                .find(|e| e.key.eq_ignore_ascii_case(key))
                .and_then(|e| e.priority)
        });
        configured.or_else(|| self.priority(key))
    }

    /// Registered keys, sorted.
    pub fn keys(&self) -> Vec<&'static str> {
        let mut keys: Vec<_> = self.entries.values().map(|e| e.evaluator.key()).collect();
        keys.sort_unstable();
        keys
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roomproto::EvaluatorRef;

    #[test]
    fn test_defaults_are_registered() {
        let registry = EvaluatorRegistry::with_defaults();
        assert_eq!(registry.len(), 15);
        assert_eq!(registry.priority("PowerOnDefault"), Some(1));
        assert_eq!(registry.priority("unmutedsp"), Some(6));
        assert_eq!(registry.priority("standbydefault"), Some(10));
        assert!(registry.get("ChangeVideoInputTieredSwitchers").is_some());
        assert!(registry.get("NoSuchEvaluator").is_none());
    }

    #[test]
    fn test_apply_priorities_reports_unknown_keys() {
        let mut registry = EvaluatorRegistry::with_defaults();
        let mut priorities = BTreeMap::new();
        priorities.insert("MUTEDEFAULT".to_string(), 2);
        priorities.insert("Bogus".to_string(), 4);

        let unknown = registry.apply_priorities(&priorities);
        assert_eq!(unknown, vec!["Bogus".to_string()]);
        assert_eq!(registry.priority("MuteDefault"), Some(2));
    }

    #[test]
    fn test_room_priority_wins() {
        let registry = EvaluatorRegistry::with_defaults();
        let room = RoomConfiguration {
            id: "ITB-1101".to_string(),
            evaluators: vec![
                EvaluatorRef::new("StandbyDefault").with_priority(0),
                EvaluatorRef::new("PowerOnDefault"),
            ],
        };

        assert_eq!(registry.priority_in("StandbyDefault", Some(&room)), Some(0));
        assert_eq!(registry.priority_in("PowerOnDefault", Some(&room)), Some(1));
        assert_eq!(registry.priority_in("MuteDefault", None), Some(6));
        assert_eq!(registry.priority_in("Bogus", Some(&room)), None);
    }

    #[test]
    fn test_context_resolves_names() {
        let mut display = Device::new("ITB-1101-D1");
        display.name = "D1".to_string();
        let devices = vec![display];
        let ctx = EvaluationContext::new("ITB", "1101", &devices, "alice");

        assert_eq!(ctx.resolve_id("d1"), "ITB-1101-D1");
        assert_eq!(ctx.resolve_id("HDMI9"), "HDMI9");
        assert!(ctx.device("D2").is_err());
    }
}
