use roomproto::{roles, Device, RoomState};

use super::{require_command, EvaluationError, Fanout};
use crate::action::Action;
use crate::registry::{CommandEvaluator, EvaluationContext};

fn blank_fanout<'s>(
    command: &'static str,
    generator: &'static str,
    blanked: bool,
    state: &'s RoomState,
) -> Fanout<'s> {
    let value = blanked.to_string();
    let device_values = state
        .displays
        .iter()
        .filter(|d| d.blanked == Some(blanked))
        .map(|d| (d.name.as_str(), value.clone()))
        .collect();

    Fanout {
        command,
        generator,
        event_key: "blanked",
        parameter: None,
        room_value: (state.blanked == Some(blanked)).then_some(value),
        room_targets: |d: &Device| d.has_role(roles::VIDEO_OUT),
        device_values,
    }
}

pub struct BlankDisplayDefault;

impl CommandEvaluator for BlankDisplayDefault {
    fn key(&self) -> &'static str {
        "BlankDisplayDefault"
    }

    fn evaluate(
        &self,
        state: &RoomState,
        ctx: &EvaluationContext<'_>,
    ) -> Result<Vec<Action>, EvaluationError> {
        blank_fanout("BlankDisplay", self.key(), true, state).actions(ctx)
    }

    fn validate(&self, action: &Action) -> Result<(), EvaluationError> {
        require_command(action, "BlankDisplay")
    }

    fn incompatible_commands(&self) -> &'static [&'static str] {
        &["UnblankDisplay"]
    }

    fn default_priority(&self) -> i32 {
        5
    }
}

pub struct UnBlankDisplayDefault;

impl CommandEvaluator for UnBlankDisplayDefault {
    fn key(&self) -> &'static str {
        "UnBlankDisplayDefault"
    }

    fn evaluate(
        &self,
        state: &RoomState,
        ctx: &EvaluationContext<'_>,
    ) -> Result<Vec<Action>, EvaluationError> {
        blank_fanout("UnblankDisplay", self.key(), false, state).actions(ctx)
    }

    fn validate(&self, action: &Action) -> Result<(), EvaluationError> {
        require_command(action, "UnblankDisplay")
    }

    fn incompatible_commands(&self) -> &'static [&'static str] {
        &["BlankDisplay"]
    }

    fn default_priority(&self) -> i32 {
        5
    }
}
