//! The unit of work: one command for one device.

use std::collections::BTreeMap;

use roomproto::{Device, EventInfo};

/// Index of an action inside an [`ExecutionGraph`](crate::graph::ExecutionGraph).
pub type ActionId = usize;

/// A single command directed at one device.
///
/// `device` executes the command; `destination_device` is the device whose
/// observable state changes. They differ when a switcher acts on behalf of a
/// display.
#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    pub name: String,
    /// Key of the evaluator that produced this action.
    pub generator: String,
    pub device: Device,
    pub destination_device: Device,
    /// Values for the `:name` placeholders of the device's endpoint template.
    pub parameters: BTreeMap<String, String>,
    /// Requested for this device explicitly rather than by a room-wide field.
    pub device_specific: bool,
    /// Superseded by a conflicting action. Never cleared once set.
    pub overridden: bool,
    /// Actions that wait for this one. Filled in by the reconciler.
    pub children: Vec<ActionId>,
    /// Published as state-change events when the command succeeds.
    pub event_log: Vec<EventInfo>,
}

impl Action {
    pub fn new(name: impl Into<String>, generator: impl Into<String>, device: Device) -> Self {
        Self {
            name: name.into(),
            generator: generator.into(),
            destination_device: device.clone(),
            device,
            parameters: BTreeMap::new(),
            device_specific: false,
            overridden: false,
            children: Vec::new(),
            event_log: Vec::new(),
        }
    }

    pub fn for_destination(mut self, destination: Device) -> Self {
        self.destination_device = destination;
        self
    }

    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }

    pub fn device_specific(mut self) -> Self {
        self.device_specific = true;
        self
    }

    pub fn with_event(mut self, event: EventInfo) -> Self {
        self.event_log.push(event);
        self
    }

    pub fn device_id(&self) -> &str {
        &self.device.id
    }

    /// Whether `other` would send exactly the same command.
    ///
    /// Destination and event log are ignored: two outputs routed through the
    /// same switcher hop produce one command.
    pub fn is_duplicate_of(&self, other: &Action) -> bool {
        self.name == other.name
            && self.device.id == other.device.id
            && self.device_specific == other.device_specific
            && self.overridden == other.overridden
            && self.parameters == other.parameters
    }

    /// Fold a duplicate's event log into this one.
    pub(crate) fn absorb(&mut self, duplicate: Action) {
        for event in duplicate.event_log {
            if !self.event_log.contains(&event) {
                self.event_log.push(event);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn display() -> Device {
        Device::new("D1")
    }

    #[test]
    fn test_duplicates_ignore_destination() {
        let a = Action::new("ChangeInput", "Tiered", Device::new("SW1"))
            .for_destination(Device::new("D1"))
            .with_parameter("input", "1");
        let b = Action::new("ChangeInput", "Tiered", Device::new("SW1"))
            .for_destination(Device::new("D2"))
            .with_parameter("input", "1");

        assert!(a.is_duplicate_of(&b));
    }

    #[test]
    fn test_parameters_distinguish_actions() {
        let a = Action::new("SetVolume", "SetVolumeDefault", display()).with_parameter("level", "10");
        let b = Action::new("SetVolume", "SetVolumeDefault", display()).with_parameter("level", "20");
        assert!(!a.is_duplicate_of(&b));
    }

    #[test]
    fn test_specificity_distinguishes_actions() {
        let a = Action::new("PowerOn", "PowerOnDefault", display());
        let b = Action::new("PowerOn", "PowerOnDefault", display()).device_specific();
        assert!(!a.is_duplicate_of(&b));
    }

    #[test]
    fn test_absorb_merges_event_logs_once() {
        let on = EventInfo::state("D1", "input", "laptop", "alice");
        let other = EventInfo::state("D2", "input", "laptop", "alice");

        let mut a = Action::new("ChangeInput", "Tiered", Device::new("SW1")).with_event(on.clone());
        let b = Action::new("ChangeInput", "Tiered", Device::new("SW1"))
            .with_event(on.clone())
            .with_event(other.clone());

        a.absorb(b);
        assert_eq!(a.event_log, vec![on, other]);
    }
}
