//! Structured state-change and error events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventType {
    /// A device's observable state changed.
    CoreState,
    /// A user-level action that is not itself a state (volume nudges).
    UserAction,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventCause {
    UserInput,
    AutoGenerated,
}

/// Event template carried by an action and emitted when it succeeds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventInfo {
    pub event_type: EventType,
    pub cause: EventCause,
    /// Name of the device whose state changes.
    pub device: String,
    pub key: String,
    pub value: String,
    pub requestor: String,
}

impl EventInfo {
    /// A user-caused core-state change.
    pub fn state(
        device: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<String>,
        requestor: impl Into<String>,
    ) -> Self {
        Self {
            event_type: EventType::CoreState,
            cause: EventCause::UserInput,
            device: device.into(),
            key: key.into(),
            value: value.into(),
            requestor: requestor.into(),
        }
    }

    pub fn with_type(mut self, event_type: EventType) -> Self {
        self.event_type = event_type;
        self
    }

    /// Stamp the template with room context and the current time.
    pub fn into_event(self, building: &str, room: &str) -> Event {
        Event {
            event_type: self.event_type,
            cause: self.cause,
            device: self.device,
            key: self.key,
            value: self.value,
            requestor: self.requestor,
            building: building.to_string(),
            room: room.to_string(),
            timestamp: Utc::now(),
        }
    }
}

/// An event as handed to the publisher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub event_type: EventType,
    pub cause: EventCause,
    pub device: String,
    pub key: String,
    pub value: String,
    pub requestor: String,
    pub building: String,
    pub room: String,
    pub timestamp: DateTime<Utc>,
}

impl Event {
    pub fn is_error(&self) -> bool {
        self.event_type == EventType::Error
    }
}
