//! Input selection on devices wired directly to their sources.

use roomproto::{roles, EventInfo, RoomState};

use super::{input_requests, require_command, EvaluationError, InputRequest, CHANGE_INPUT};
use crate::action::Action;
use crate::registry::{CommandEvaluator, EvaluationContext};

/// Emit a ChangeInput on each requested output, selecting the port fed by
/// the requested input.
///
/// Room-wide requests skip outputs with no such port. A device-specific
/// request for an unwired input is an error.
pub(super) fn change_input(
    generator: &'static str,
    requests: Vec<InputRequest<'_>>,
    ctx: &EvaluationContext<'_>,
) -> Result<Vec<Action>, EvaluationError> {
    let mut actions = Vec::new();

    for request in requests {
        let source_id = ctx.resolve_id(&request.input);
        let port = request
            .output
            .ports
            .iter()
            .find(|p| p.source_device.eq_ignore_ascii_case(&source_id));

        let Some(port) = port else {
            if request.specific {
                return Err(EvaluationError::NoPort {
                    device: request.output.id.clone(),
                    peer: request.input,
                });
            }
            tracing::debug!(
                device = %request.output.id,
                input = %request.input,
                "no port for input, skipping"
            );
            continue;
        };

        let event = EventInfo::state(
            request.output.name.as_str(),
            "input",
            port.source_device.as_str(),
            ctx.requestor,
        );
        let mut action = Action::new(CHANGE_INPUT, generator, request.output.clone())
            .with_parameter("port", port.id.as_str())
            .with_event(event);
        if request.specific {
            action = action.device_specific();
        }
        actions.push(action);
    }

    Ok(actions)
}

pub struct ChangeVideoInputDefault;

impl CommandEvaluator for ChangeVideoInputDefault {
    fn key(&self) -> &'static str {
        "ChangeVideoInputDefault"
    }

    fn evaluate(
        &self,
        state: &RoomState,
        ctx: &EvaluationContext<'_>,
    ) -> Result<Vec<Action>, EvaluationError> {
        let per_device = state
            .displays
            .iter()
            .filter_map(|d| d.input.as_deref().map(|input| (d.name.as_str(), input)))
            .collect();
        let requests = input_requests(
            ctx,
            state.current_video_input.as_deref(),
            |d| d.has_role(roles::VIDEO_OUT),
            per_device,
        )?;
        change_input(self.key(), requests, ctx)
    }

    fn validate(&self, action: &Action) -> Result<(), EvaluationError> {
        require_command(action, CHANGE_INPUT)
    }

    fn default_priority(&self) -> i32 {
        3
    }
}

pub struct ChangeAudioInputDefault;

impl CommandEvaluator for ChangeAudioInputDefault {
    fn key(&self) -> &'static str {
        "ChangeAudioInputDefault"
    }

    fn evaluate(
        &self,
        state: &RoomState,
        ctx: &EvaluationContext<'_>,
    ) -> Result<Vec<Action>, EvaluationError> {
        let per_device = state
            .audio_devices
            .iter()
            .filter_map(|d| d.input.as_deref().map(|input| (d.name.as_str(), input)))
            .collect();
        let requests = input_requests(
            ctx,
            state.current_audio_input.as_deref(),
            |d| d.has_role(roles::AUDIO_OUT),
            per_device,
        )?;
        change_input(self.key(), requests, ctx)
    }

    fn validate(&self, action: &Action) -> Result<(), EvaluationError> {
        require_command(action, CHANGE_INPUT)
    }

    fn default_priority(&self) -> i32 {
        3
    }
}
