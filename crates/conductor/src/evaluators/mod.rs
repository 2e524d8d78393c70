//! Built-in command evaluators.
//!
//! Each evaluator reads one concern out of a requested [`RoomState`] and
//! emits actions for the devices it touches. Room-wide fields produce
//! room-wide actions; entries in `displays` / `audio_devices` produce
//! device-specific ones, which replace a room-wide action for the same device
//! from the same evaluator.
//!
//! [`RoomState`]: roomproto::RoomState

mod audio;
mod display;
mod dsp;
mod input;
mod power;
mod switcher;
mod tiered;

use std::sync::Arc;

use roomproto::{Device, EventInfo};
use signalpath::RoutingError;
use thiserror::Error;

use crate::action::Action;
use crate::registry::{CommandEvaluator, EvaluationContext};

pub use audio::{MuteDefault, SetVolumeDefault, UnMuteDefault};
pub use display::{BlankDisplayDefault, UnBlankDisplayDefault};
pub use dsp::{ChangeAudioInputDSP, MuteDSP, SetVolumeDSP, UnMuteDSP};
pub use input::{ChangeAudioInputDefault, ChangeVideoInputDefault};
pub use power::{PowerOnDefault, StandbyDefault};
pub use switcher::ChangeVideoInputVideoSwitcher;
pub use tiered::ChangeVideoInputTieredSwitchers;

pub const CHANGE_INPUT: &str = "ChangeInput";

/// Errors raised while turning a room state into actions.
#[derive(Debug, Error)]
pub enum EvaluationError {
    #[error("no device named {0} in the room")]
    UnknownDevice(String),

    #[error("{device} has no port connecting it to {peer}")]
    NoPort { device: String, peer: String },

    #[error("expected exactly one video switcher in the room, found {0}")]
    SwitcherCount(usize),

    #[error("expected exactly one DSP in the room, found {0}")]
    DspCount(usize),

    #[error("{0} is not an input device")]
    NotAnInput(String),

    #[error("{0} is not an output device")]
    NotAnOutput(String),

    #[error("no signal path from {input} to {output}")]
    Unreachable { input: String, output: String },

    #[error("{action} is not a valid command for {device}")]
    InvalidCommand { action: String, device: String },

    #[error("invalid {name} {value:?} for {device}")]
    InvalidParameter {
        device: String,
        name: String,
        value: String,
    },

    #[error(transparent)]
    Routing(#[from] RoutingError),
}

/// Every built-in evaluator.
pub fn builtin() -> Vec<Arc<dyn CommandEvaluator>> {
    vec![
        Arc::new(PowerOnDefault),
        Arc::new(StandbyDefault),
        Arc::new(ChangeVideoInputDefault),
        Arc::new(ChangeAudioInputDefault),
        Arc::new(ChangeVideoInputVideoSwitcher),
        Arc::new(ChangeVideoInputTieredSwitchers),
        Arc::new(BlankDisplayDefault),
        Arc::new(UnBlankDisplayDefault),
        Arc::new(MuteDefault),
        Arc::new(UnMuteDefault),
        Arc::new(SetVolumeDefault),
        Arc::new(MuteDSP),
        Arc::new(UnMuteDSP),
        Arc::new(SetVolumeDSP),
        Arc::new(ChangeAudioInputDSP),
    ]
}

/// The action names `command` and the device supports it.
pub(crate) fn require_command(action: &Action, command: &str) -> Result<(), EvaluationError> {
    if action.name.eq_ignore_ascii_case(command) && action.device.has_command(command) {
        Ok(())
    } else {
        Err(EvaluationError::InvalidCommand {
            action: action.name.clone(),
            device: action.device.id.clone(),
        })
    }
}

/// Replace the entry for the same key, or append.
fn upsert<T>(items: &mut Vec<T>, item: T, same: impl Fn(&T, &T) -> bool) {
    match items.iter().position(|existing| same(existing, &item)) {
        Some(index) => items[index] = item,
        None => items.push(item),
    }
}

/// A single-command state change fanned out over a room.
pub(crate) struct Fanout<'s> {
    pub command: &'static str,
    pub generator: &'static str,
    pub event_key: &'static str,
    /// Name of the parameter carrying the value, for commands that take one.
    pub parameter: Option<&'static str>,
    /// Value requested room-wide, if any.
    pub room_value: Option<String>,
    pub room_targets: fn(&Device) -> bool,
    /// `(device name, value)` requested per device.
    pub device_values: Vec<(&'s str, String)>,
}

impl Fanout<'_> {
    pub(crate) fn actions(self, ctx: &EvaluationContext<'_>) -> Result<Vec<Action>, EvaluationError> {
        let mut actions = Vec::new();

        if let Some(value) = &self.room_value {
            for device in ctx.devices.iter().filter(|d| (self.room_targets)(d)) {
                actions.push(self.action(device, value, ctx.requestor));
            }
        }

        for (name, value) in &self.device_values {
            let device = ctx.device(name)?;
            let action = self.action(device, value, ctx.requestor).device_specific();
            upsert(&mut actions, action, |a, b| a.device.id == b.device.id);
        }

        tracing::debug!(
            evaluator = self.generator,
            count = actions.len(),
            "actions generated"
        );
        Ok(actions)
    }

    fn action(&self, device: &Device, value: &str, requestor: &str) -> Action {
        let event = EventInfo::state(device.name.as_str(), self.event_key, value, requestor);
        let action = Action::new(self.command, self.generator, device.clone()).with_event(event);
        match self.parameter {
            Some(name) => action.with_parameter(name, value),
            None => action,
        }
    }
}

/// A requested input for one output device.
#[derive(Debug)]
pub(crate) struct InputRequest<'d> {
    pub output: &'d Device,
    pub input: String,
    pub specific: bool,
}

/// Expand a room-wide input over `targets`, then overlay per-device requests.
pub(crate) fn input_requests<'d>(
    ctx: &EvaluationContext<'d>,
    room_input: Option<&str>,
    targets: impl Fn(&Device) -> bool,
    per_device: Vec<(&str, &str)>,
) -> Result<Vec<InputRequest<'d>>, EvaluationError> {
    let mut requests = Vec::new();

    if let Some(input) = room_input {
        for output in ctx.devices.iter().filter(|d| targets(d)) {
            requests.push(InputRequest {
                output,
                input: input.to_string(),
                specific: false,
            });
        }
    }

    for (name, input) in per_device {
        let request = InputRequest {
            output: ctx.device(name)?,
            input: input.to_string(),
            specific: true,
        };
        upsert(&mut requests, request, |a, b| a.output.id == b.output.id);
    }

    Ok(requests)
}

#[cfg(test)]
pub(crate) mod fixtures {
    use roomproto::{roles, Command, Device, Port};

    pub fn command(name: &str) -> Command {
        Command::new(
            name,
            "http://driver:8000",
            format!("/:address/{}", name.to_lowercase()),
        )
    }

    pub fn display(id: &str) -> Device {
        Device::new(id)
            .with_address(format!("{}.local", id.to_lowercase()))
            .in_room("ITB", "1101")
            .with_role(roles::VIDEO_OUT)
            .with_role(roles::AUDIO_OUT)
            .as_output()
            .with_command(command("PowerOn"))
            .with_command(command("Standby"))
            .with_command(command("BlankDisplay"))
            .with_command(command("UnblankDisplay"))
            .with_command(command("Mute"))
            .with_command(command("UnMute"))
            .with_command(Command::new(
                "SetVolume",
                "http://driver:8000",
                "/:address/volume/:level",
            ))
            .with_command(Command::new(
                "ChangeInput",
                "http://driver:8000",
                "/:address/input/:port",
            ))
    }

    pub fn source(id: &str) -> Device {
        Device::new(id).in_room("ITB", "1101").as_input()
    }

    /// Two displays and a laptop wired straight into both, a media player
    /// into D1 only, and a microphone that is neither.
    pub fn simple_room() -> Vec<Device> {
        vec![
            display("D1")
                .with_port(Port::new("HDMI1", "laptop", "D1"))
                .with_port(Port::new("HDMI2", "player", "D1")),
            display("D2").with_port(Port::new("HDMI1", "laptop", "D2")),
            source("laptop"),
            source("player"),
            Device::new("MIC1")
                .in_room("ITB", "1101")
                .with_role(roles::MICROPHONE),
        ]
    }
}
