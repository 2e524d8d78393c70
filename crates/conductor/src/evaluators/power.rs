use roomproto::{Device, RoomState};

use super::{require_command, EvaluationError, Fanout};
use crate::action::Action;
use crate::registry::{CommandEvaluator, EvaluationContext};

fn power_fanout<'s>(
    command: &'static str,
    generator: &'static str,
    value: &'static str,
    state: &'s RoomState,
) -> Fanout<'s> {
    let wants = |power: &Option<String>| {
        power
            .as_deref()
            .is_some_and(|p| p.eq_ignore_ascii_case(value))
    };

    let device_values = state
        .displays
        .iter()
        .filter(|d| wants(&d.power))
        .map(|d| d.name.as_str())
        .chain(
            state
                .audio_devices
                .iter()
                .filter(|d| wants(&d.power))
                .map(|d| d.name.as_str()),
        )
        .map(|name| (name, value.to_string()))
        .collect();

    Fanout {
        command,
        generator,
        event_key: "power",
        parameter: None,
        room_value: state.power_is(value).then(|| value.to_string()),
        room_targets: |d: &Device| d.output,
        device_values,
    }
}

/// Powers on every output device, or the ones asked for by name.
pub struct PowerOnDefault;

impl CommandEvaluator for PowerOnDefault {
    fn key(&self) -> &'static str {
        "PowerOnDefault"
    }

    fn evaluate(
        &self,
        state: &RoomState,
        ctx: &EvaluationContext<'_>,
    ) -> Result<Vec<Action>, EvaluationError> {
        power_fanout("PowerOn", self.key(), "on", state).actions(ctx)
    }

    fn validate(&self, action: &Action) -> Result<(), EvaluationError> {
        require_command(action, "PowerOn")
    }

    fn incompatible_commands(&self) -> &'static [&'static str] {
        &["Standby"]
    }

    fn default_priority(&self) -> i32 {
        1
    }
}

pub struct StandbyDefault;

impl CommandEvaluator for StandbyDefault {
    fn key(&self) -> &'static str {
        "StandbyDefault"
    }

    fn evaluate(
        &self,
        state: &RoomState,
        ctx: &EvaluationContext<'_>,
    ) -> Result<Vec<Action>, EvaluationError> {
        power_fanout("Standby", self.key(), "standby", state).actions(ctx)
    }

    fn validate(&self, action: &Action) -> Result<(), EvaluationError> {
        require_command(action, "Standby")
    }

    fn incompatible_commands(&self) -> &'static [&'static str] {
        &["PowerOn"]
    }

    fn default_priority(&self) -> i32 {
        10
    }
}
