//! Audio handled by a room DSP.
//!
//! Microphones and media sources feed numbered DSP inputs; the DSP hosts a
//! port per input. Room-wide mute and volume requests touch only the media
//! inputs and the room's other audio outputs. A request naming a microphone
//! adjusts that microphone's DSP input and nothing else.

use roomproto::{roles, Device, EventInfo, Port, RoomState};

use super::input::change_input;
use super::{
    require_command, upsert, EvaluationError, InputRequest, SetVolumeDefault, CHANGE_INPUT,
};
use crate::action::Action;
use crate::registry::{CommandEvaluator, EvaluationContext};

/// The single DSP in the room.
fn the_dsp<'d>(ctx: &EvaluationContext<'d>) -> Result<&'d Device, EvaluationError> {
    let dsps: Vec<&Device> = ctx.devices_with_role(roles::DSP).collect();
    match dsps.as_slice() {
        [dsp] => Ok(*dsp),
        _ => Err(EvaluationError::DspCount(dsps.len())),
    }
}

fn is_microphone(ctx: &EvaluationContext<'_>, id: &str) -> bool {
    ctx.devices
        .iter()
        .find(|d| d.id.eq_ignore_ascii_case(id))
        .is_some_and(|d| d.has_role(roles::MICROPHONE))
}

/// DSP inputs fed by anything but a microphone.
fn media_ports<'d>(dsp: &'d Device, ctx: &EvaluationContext<'_>) -> Vec<&'d Port> {
    dsp.ports
        .iter()
        .filter(|p| {
            p.destination_device.eq_ignore_ascii_case(&dsp.id)
                && !is_microphone(ctx, &p.source_device)
        })
        .collect()
}

/// Audio outputs a room-wide request reaches directly, bypassing the DSP.
fn is_external_output(device: &Device, dsp: &Device) -> bool {
    device.has_role(roles::AUDIO_OUT) && !device.has_role(roles::MICROPHONE) && device.id != dsp.id
}

/// A mute or volume change routed through the DSP where it has to be.
struct DspChange<'s> {
    command: &'static str,
    generator: &'static str,
    event_key: &'static str,
    parameter: Option<&'static str>,
    room_value: Option<String>,
    device_values: Vec<(&'s str, String)>,
}

impl DspChange<'_> {
    fn actions(self, ctx: &EvaluationContext<'_>) -> Result<Vec<Action>, EvaluationError> {
        if self.room_value.is_none() && self.device_values.is_empty() {
            return Ok(Vec::new());
        }
        let dsp = the_dsp(ctx)?;
        let mut actions = Vec::new();

        if let Some(value) = &self.room_value {
            actions.extend(self.dsp_inputs(dsp, value, ctx));
            for device in ctx.devices.iter().filter(|d| is_external_output(d, dsp)) {
                actions.push(self.action(device, device, value, ctx.requestor));
            }
        }

        for (name, value) in &self.device_values {
            let device = ctx.device(name)?;
            let specific = if device.has_role(roles::MICROPHONE) {
                let port = dsp
                    .ports
                    .iter()
                    .find(|p| p.source_device.eq_ignore_ascii_case(&device.id))
                    .ok_or_else(|| EvaluationError::NoPort {
                        device: dsp.id.clone(),
                        peer: device.id.clone(),
                    })?;
                vec![self
                    .action(dsp, device, value, ctx.requestor)
                    .with_parameter("input", port.id.as_str())]
            } else if device.id == dsp.id {
                self.dsp_inputs(dsp, value, ctx)
            } else if device.has_role(roles::AUDIO_OUT) {
                vec![self.action(device, device, value, ctx.requestor)]
            } else {
                return Err(EvaluationError::InvalidCommand {
                    action: self.command.to_string(),
                    device: device.id.clone(),
                });
            };

            for action in specific {
                upsert(&mut actions, action.device_specific(), |a, b| {
                    a.device.id == b.device.id
                        && a.parameters.get("input") == b.parameters.get("input")
                });
            }
        }

        tracing::debug!(
            evaluator = self.generator,
            dsp = %dsp.id,
            count = actions.len(),
            "actions generated"
        );
        Ok(actions)
    }

    fn dsp_inputs(&self, dsp: &Device, value: &str, ctx: &EvaluationContext<'_>) -> Vec<Action> {
        media_ports(dsp, ctx)
            .into_iter()
            .map(|port| {
                self.action(dsp, dsp, value, ctx.requestor)
                    .with_parameter("input", port.id.as_str())
            })
            .collect()
    }

    /// `device` receives the command; `subject` is what the user asked about.
    fn action(&self, device: &Device, subject: &Device, value: &str, requestor: &str) -> Action {
        let event = EventInfo::state(subject.name.as_str(), self.event_key, value, requestor);
        let action = Action::new(self.command, self.generator, device.clone())
            .for_destination(subject.clone())
            .with_event(event);
        match self.parameter {
            Some(name) => action.with_parameter(name, value),
            None => action,
        }
    }
}

fn mute_change<'s>(
    command: &'static str,
    generator: &'static str,
    muted: bool,
    state: &'s RoomState,
) -> DspChange<'s> {
    let value = muted.to_string();
    let device_values = state
        .audio_devices
        .iter()
        .filter(|d| d.muted == Some(muted))
        .map(|d| (d.name.as_str(), value.clone()))
        .collect();

    DspChange {
        command,
        generator,
        event_key: "muted",
        parameter: None,
        room_value: (state.muted == Some(muted)).then_some(value),
        device_values,
    }
}

pub struct MuteDSP;

impl CommandEvaluator for MuteDSP {
    fn key(&self) -> &'static str {
        "MuteDSP"
    }

    fn evaluate(
        &self,
        state: &RoomState,
        ctx: &EvaluationContext<'_>,
    ) -> Result<Vec<Action>, EvaluationError> {
        mute_change("Mute", self.key(), true, state).actions(ctx)
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

pub struct UnMuteDSP;

impl CommandEvaluator for UnMuteDSP {
    fn key(&self) -> &'static str {
        "UnMuteDSP"
    }

    fn evaluate(
        &self,
        state: &RoomState,
        ctx: &EvaluationContext<'_>,
    ) -> Result<Vec<Action>, EvaluationError> {
        mute_change("UnMute", self.key(), false, state).actions(ctx)
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

pub struct SetVolumeDSP;

impl CommandEvaluator for SetVolumeDSP {
    fn key(&self) -> &'static str {
        "SetVolumeDSP"
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

        DspChange {
            command: "SetVolume",
            generator: self.key(),
            event_key: "volume",
            parameter: Some("level"),
            room_value: state.volume.map(|v| v.to_string()),
            device_values,
        }
        .actions(ctx)
    }

    fn validate(&self, action: &Action) -> Result<(), EvaluationError> {
        SetVolumeDefault.validate(action)
    }

    fn default_priority(&self) -> i32 {
        7
    }
}

/// Audio input selection where a video switcher feeds the DSP.
///
/// A room-wide input switches the DSP's switcher output and mutes every
/// other audio output so the room hears only the DSP.
pub struct ChangeAudioInputDSP;

impl ChangeAudioInputDSP {
    fn switch_action(
        &self,
        switcher: &Device,
        dsp: &Device,
        input: &str,
        ctx: &EvaluationContext<'_>,
    ) -> Result<Action, EvaluationError> {
        let source_id = ctx.resolve_id(input);
        let port = switcher
            .ports
            .iter()
            .find(|p| {
                p.destination_device.eq_ignore_ascii_case(&dsp.id)
                    && p.source_device.eq_ignore_ascii_case(&source_id)
            })
            .ok_or_else(|| EvaluationError::NoPort {
                device: switcher.id.clone(),
                peer: input.to_string(),
            })?;

        let Some((switcher_input, switcher_output)) = port.id.split_once(':') else {
            return Err(EvaluationError::InvalidParameter {
                device: switcher.id.clone(),
                name: "port".to_string(),
                value: port.id.clone(),
            });
        };

        let event = EventInfo::state(dsp.name.as_str(), "input", input, ctx.requestor);
        Ok(Action::new(CHANGE_INPUT, self.key(), switcher.clone())
            .for_destination(dsp.clone())
            .with_parameter("input", switcher_input)
            .with_parameter("output", switcher_output)
            .with_event(event))
    }
}

impl CommandEvaluator for ChangeAudioInputDSP {
    fn key(&self) -> &'static str {
        "ChangeAudioInputDSP"
    }

    fn evaluate(
        &self,
        state: &RoomState,
        ctx: &EvaluationContext<'_>,
    ) -> Result<Vec<Action>, EvaluationError> {
        let per_device: Vec<(&str, &str)> = state
            .audio_devices
            .iter()
            .filter_map(|d| d.input.as_deref().map(|input| (d.name.as_str(), input)))
            .collect();
        if state.current_audio_input.is_none() && per_device.is_empty() {
            return Ok(Vec::new());
        }

        let dsp = the_dsp(ctx)?;
        let switchers: Vec<&Device> = ctx.devices_with_role(roles::VIDEO_SWITCHER).collect();
        let [switcher] = switchers.as_slice() else {
            return Err(EvaluationError::SwitcherCount(switchers.len()));
        };

        let mut actions = Vec::new();
        if let Some(input) = state.current_audio_input.as_deref() {
            actions.push(self.switch_action(switcher, dsp, input, ctx)?);
            for device in ctx.devices.iter().filter(|d| is_external_output(d, dsp)) {
                let event = EventInfo::state(device.name.as_str(), "muted", "true", ctx.requestor);
                actions.push(Action::new("Mute", self.key(), device.clone()).with_event(event));
            }
        }

        for (name, input) in per_device {
            let device = ctx.device(name)?;
            let action = if device.id == dsp.id {
                self.switch_action(switcher, dsp, input, ctx)?
            } else if device.has_role(roles::AUDIO_OUT) && !device.has_role(roles::MICROPHONE) {
                let request = InputRequest {
                    output: device,
                    input: input.to_string(),
                    specific: true,
                };
                let mut direct = change_input(self.key(), vec![request], ctx)?;
                match direct.pop() {
                    Some(action) => action,
                    None => continue,
                }
            } else {
                return Err(EvaluationError::InvalidCommand {
                    action: CHANGE_INPUT.to_string(),
                    device: device.id.clone(),
                });
            };
            upsert(&mut actions, action.device_specific(), |a, b| {
                a.name == b.name && a.device.id == b.device.id
            });
        }

        Ok(actions)
    }

    fn validate(&self, action: &Action) -> Result<(), EvaluationError> {
        match action.name.as_str() {
            CHANGE_INPUT => require_command(action, CHANGE_INPUT),
            _ => require_command(action, "Mute"),
        }
    }

    fn default_priority(&self) -> i32 {
        6
    }
}
