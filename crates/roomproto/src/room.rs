//! Desired room state and per-room evaluator configuration.

use serde::{Deserialize, Serialize};

/// Desired state of a single display.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayState {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blanked: Option<bool>,
}

/// Desired state of a single audio device.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioDeviceState {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub muted: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<i64>,
}

/// Desired state of a whole room.
///
/// `None` means "leave it alone". Room-wide fields fan out to every matching
/// device; `displays` and `audio_devices` entries are device-specific.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomState {
    pub building: String,
    pub room: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_video_input: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_audio_input: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blanked: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub muted: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<i64>,
    #[serde(default)]
    pub displays: Vec<DisplayState>,
    #[serde(default)]
    pub audio_devices: Vec<AudioDeviceState>,
}

impl RoomState {
    pub fn new(building: impl Into<String>, room: impl Into<String>) -> Self {
        Self {
            building: building.into(),
            room: room.into(),
            ..Default::default()
        }
    }

    /// `building-room`
    pub fn room_id(&self) -> String {
        format!("{}-{}", self.building, self.room)
    }

    /// Whether the room-wide power field asks for `value` (ignoring case).
    pub fn power_is(&self, value: &str) -> bool {
        self.power
            .as_deref()
            .is_some_and(|p| p.eq_ignore_ascii_case(value))
    }
}

/// One evaluator enabled for a room, with its execution priority.
///
/// Lower priorities run first within a device's chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluatorRef {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,
}

impl EvaluatorRef {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            priority: None,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }
}

/// The evaluators that apply to a room.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomConfiguration {
    pub id: String,
    #[serde(default)]
    pub evaluators: Vec<EvaluatorRef>,
}
