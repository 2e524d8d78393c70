use roomproto::{roles, Device, RoomState};

use super::{require_command, EvaluationError, Fanout};
use crate::action::Action;
use crate::registry::{CommandEvaluator, EvaluationContext};

const MIN_VOLUME: i64 = 0;
const MAX_VOLUME: i64 = 100;

fn is_audio_out(device: &Device) -> bool {
    device.has_role(roles::AUDIO_OUT)
}

fn mute_fanout<'s>(
    command: &'static str,
    generator: &'static str,
    muted: bool,
    state: &'s RoomState,
) -> Fanout<'s> {
    let value = muted.to_string();
    let device_values = state
        .audio_devices
        .iter()
        .filter(|d| d.muted == Some(muted))
        .map(|d| (d.name.as_str(), value.clone()))
        .collect();

    Fanout {
        command,
        generator,
        event_key: "muted",
        parameter: None,
        room_value: (state.muted == Some(muted)).then_some(value),
        room_targets: is_audio_out,
        device_values,
    }
}

pub struct MuteDefault;

impl CommandEvaluator for MuteDefault {
    fn key(&self) -> &'static str {
        "MuteDefault"
    }

    fn evaluate(
        &self,
        state: &RoomState,
        ctx: &EvaluationContext<'_>,
    ) -> Result<Vec<Action>, EvaluationError> {
        mute_fanout("Mute", self.key(), true, state).actions(ctx)
    }

    fn validate(&self, action: &Action) -> Result<(), EvaluationError> {
        require_command(action, "Mute")
    }

    fn incompatible_commands(&self) -> &'static [&'static str] {
        &["UnMute"]
    }

    fn default_priority(&self) -> i32 {
        6
    }
}

pub struct UnMuteDefault;

impl CommandEvaluator for UnMuteDefault {
    fn key(&self) -> &'static str {
        "UnMuteDefault"
    }

    fn evaluate(
        &self,
        state: &RoomState,
        ctx: &EvaluationContext<'_>,
    ) -> Result<Vec<Action>, EvaluationError> {
        mute_fanout("UnMute", self.key(), false, state).actions(ctx)
    }

    fn validate(&self, action: &Action) -> Result<(), EvaluationError> {
        require_command(action, "UnMute")
    }

    fn incompatible_commands(&self) -> &'static [&'static str] {
        &["Mute"]
    }

    fn default_priority(&self) -> i32 {
        6
    }
}

/// Sets the `level` of audio outputs. Levels run from 0 to 100.
pub struct SetVolumeDefault;

impl CommandEvaluator for SetVolumeDefault {
    fn key(&self) -> &'static str {
        "SetVolumeDefault"
    }

    fn evaluate(
        &self,
        state: &RoomState,
        ctx: &EvaluationContext<'_>,
    ) -> Result<Vec<Action>, EvaluationError> {
        let device_values = state
            .audio_devices
            .iter()
            .filter_map(|d| d.volume.map(|v| (d.name.as_str(), v.to_string())))
            .collect();

        Fanout {
            command: "SetVolume",
            generator: self.key(),
            event_key: "volume",
            parameter: Some("level"),
            room_value: state.volume.map(|v| v.to_string()),
            room_targets: is_audio_out,
            device_values,
        }
        .actions(ctx)
    }

    fn validate(&self, action: &Action) -> Result<(), EvaluationError> {
        require_command(action, "SetVolume")?;

        let raw = action.parameters.get("level").map(String::as_str).unwrap_or("");
        match raw.parse::<i64>() {
            Ok(level) if (MIN_VOLUME..=MAX_VOLUME).contains(&level) => Ok(()),
            _ => Err(EvaluationError::InvalidParameter {
                device: action.device.id.clone(),
                name: "level".to_string(),
                value: raw.to_string(),
            }),
        }
    }

    fn default_priority(&self) -> i32 {
        7
    }
}
