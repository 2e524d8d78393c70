//! Input selection across chained switchers.
//!
//! For each requested (output, input) pair the signal graph supplies the
//! path from the output back to the input. Every device on that path except
//! the input itself gets one ChangeInput, provided it takes one; devices
//! without the command are treated as passive links. Switchers receive
//! `input` and `output` parameters, anything else a `port`.
//!
//! Outputs that share a hop produce identical actions for it, and the
//! reconciler folds those into one command.

use roomproto::{roles, Device, EventInfo, Port, RoomState};
use signalpath::{SignalGraph, SignalPath};

use super::{input_requests, require_command, EvaluationError, InputRequest, CHANGE_INPUT};
use crate::action::Action;
use crate::registry::{CommandEvaluator, EvaluationContext};

const INPUT_PREFIX: &str = "IN";
const OUTPUT_PREFIX: &str = "OUT";

pub struct ChangeVideoInputTieredSwitchers;

fn port_between<'d>(host: &'d Device, source: &str, destination: &str) -> Option<&'d Port> {
    host.ports
        .iter()
        .find(|p| p.source_device == source && p.destination_device == destination)
}

fn no_port(device: &Device, peer: &Device) -> EvaluationError {
    EvaluationError::NoPort {
        device: device.id.clone(),
        peer: peer.id.clone(),
    }
}

impl ChangeVideoInputTieredSwitchers {
    fn hop_actions(
        &self,
        path: &SignalPath,
        request: &InputRequest<'_>,
        source: &Device,
        requestor: &str,
    ) -> Result<Vec<Action>, EvaluationError> {
        let devices = path.devices();
        let mut actions = Vec::new();

        for (i, hop) in devices[..devices.len() - 1].iter().enumerate() {
            if !hop.has_command(CHANGE_INPUT) {
                tracing::trace!(device = %hop.id, "passive hop");
                continue;
            }

            let upstream = &devices[i + 1];
            let inbound =
                port_between(hop, &upstream.id, &hop.id).ok_or_else(|| no_port(hop, upstream))?;

            let mut action = Action::new(CHANGE_INPUT, self.key(), hop.clone())
                .for_destination(request.output.clone())
                .with_event(EventInfo::state(
                    request.output.name.as_str(),
                    "input",
                    source.name.as_str(),
                    requestor,
                ));

            // The sink has nothing downstream, so it selects a port even if it switches.
            let downstream = i.checked_sub(1).map(|j| &devices[j]);
            action = match downstream {
                Some(next) if hop.has_role(roles::VIDEO_SWITCHER) => {
                    let outbound =
                        port_between(hop, &hop.id, &next.id).ok_or_else(|| no_port(hop, next))?;
                    let input = inbound.id.strip_prefix(INPUT_PREFIX).unwrap_or(&inbound.id);
                    let output = outbound.id.strip_prefix(OUTPUT_PREFIX).unwrap_or(&outbound.id);
                    action
                        .with_parameter("input", input)
                        .with_parameter("output", output)
                }
                _ => action.with_parameter("port", inbound.id.as_str()),
            };

            if request.specific {
                action = action.device_specific();
            }
            actions.push(action);
        }

        Ok(actions)
    }
}

impl CommandEvaluator for ChangeVideoInputTieredSwitchers {
    fn key(&self) -> &'static str {
        "ChangeVideoInputTieredSwitchers"
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
            |d| d.output && d.has_role(roles::VIDEO_OUT),
            per_device,
        )?;
        if requests.is_empty() {
            return Ok(Vec::new());
        }

        let graph = SignalGraph::build(ctx.devices);
        let mut actions = Vec::new();

        for request in &requests {
            let source = ctx.device(&request.input)?;
            if !source.input {
                return Err(EvaluationError::NotAnInput(source.id.clone()));
            }
            if !request.output.output {
                return Err(EvaluationError::NotAnOutput(request.output.id.clone()));
            }

            let path = graph
                .reachable(&request.output.id, &source.id)?
                .ok_or_else(|| EvaluationError::Unreachable {
                    input: source.id.clone(),
                    output: request.output.id.clone(),
                })?;

            tracing::debug!(
                output = %request.output.id,
                input = %source.id,
                path = ?path.ids(),
                "routing through signal path"
            );
            actions.extend(self.hop_actions(&path, request, source, ctx.requestor)?);
        }

        Ok(actions)
    }

    fn validate(&self, action: &Action) -> Result<(), EvaluationError> {
        require_command(action, CHANGE_INPUT)
    }

    fn default_priority(&self) -> i32 {
        3
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluators::fixtures;
    use roomproto::{Command, DisplayState};

    fn switcher(id: &str) -> Device {
        Device::new(id)
            .in_room("ITB", "1101")
            .with_role(roles::VIDEO_SWITCHER)
            .with_command(Command::new(
                "ChangeInput",
                "http://switcher:8000",
                "/:address/input/:input/:output",
            ))
    }

    /// laptop -> SW1 -> SW2 -> {D1, D2}, plus a camera on SW2 and an
    /// extender (no commands) between SW2 and D2.
    fn tiered_room() -> Vec<Device> {
        vec![
            fixtures::source("laptop"),
            fixtures::source("camera"),
            switcher("SW1")
                .with_port(Port::new("IN1", "laptop", "SW1"))
                .with_port(Port::new("OUT1", "SW1", "SW2").hosted_by("SW1")),
            switcher("SW2")
                .with_port(Port::new("IN3", "SW1", "SW2"))
                .with_port(Port::new("IN4", "camera", "SW2"))
                .with_port(Port::new("OUT1", "SW2", "D1").hosted_by("SW2"))
                .with_port(Port::new("OUT2", "SW2", "EXT").hosted_by("SW2")),
            Device::new("EXT")
                .in_room("ITB", "1101")
                .with_port(Port::new("IN", "SW2", "EXT")),
            fixtures::display("D1").with_port(Port::new("HDMI1", "SW2", "D1")),
            fixtures::display("D2").with_port(Port::new("HDMI2", "EXT", "D2")),
        ]
    }

    fn summary(actions: &[Action]) -> Vec<(String, Vec<(String, String)>)> {
        actions
            .iter()
            .map(|a| {
                (
                    a.device_id().to_string(),
                    a.parameters
                        .iter()
                        .map(|(k, v)| (k.clone(), v.clone()))
                        .collect(),
                )
            })
            .collect()
    }

    fn p(k: &str, v: &str) -> (String, String) {
        (k.to_string(), v.to_string())
    }

    #[test]
    fn test_one_change_input_per_hop() {
        let devices = tiered_room();
        let ctx = EvaluationContext::new("ITB", "1101", &devices, "alice");
        let mut state = RoomState::new("ITB", "1101");
        state.displays.push(DisplayState {
            name: "D1".to_string(),
            input: Some("laptop".to_string()),
            ..Default::default()
        });

        let actions = ChangeVideoInputTieredSwitchers.evaluate(&state, &ctx).unwrap();
        assert_eq!(
            summary(&actions),
            vec![
                ("D1".to_string(), vec![p("port", "HDMI1")]),
                ("SW2".to_string(), vec![p("input", "3"), p("output", "1")]),
                ("SW1".to_string(), vec![p("input", "1"), p("output", "1")]),
            ]
        );
        assert!(actions.iter().all(|a| a.device_specific));
        assert!(actions.iter().all(|a| a.destination_device.id == "D1"));
        assert_eq!(actions[2].event_log[0].value, "laptop");
    }

    #[test]
    fn test_passive_hops_are_skipped() {
        let devices = tiered_room();
        let ctx = EvaluationContext::new("ITB", "1101", &devices, "alice");
        let mut state = RoomState::new("ITB", "1101");
        state.displays.push(DisplayState {
            name: "D2".to_string(),
            input: Some("camera".to_string()),
            ..Default::default()
        });

        let actions = ChangeVideoInputTieredSwitchers.evaluate(&state, &ctx).unwrap();
        assert_eq!(
            summary(&actions),
            vec![
                ("D2".to_string(), vec![p("port", "HDMI2")]),
                ("SW2".to_string(), vec![p("input", "4"), p("output", "2")]),
            ]
        );
    }

    #[test]
    fn test_shared_hops_repeat_identically() {
        let devices = tiered_room();
        let ctx = EvaluationContext::new("ITB", "1101", &devices, "alice");
        let mut state = RoomState::new("ITB", "1101");
        state.current_video_input = Some("laptop".to_string());

        let actions = ChangeVideoInputTieredSwitchers.evaluate(&state, &ctx).unwrap();
        let sw1: Vec<&Action> = actions.iter().filter(|a| a.device_id() == "SW1").collect();
        assert_eq!(sw1.len(), 2);
        assert!(sw1[0].is_duplicate_of(sw1[1]));
        assert!(actions.iter().all(|a| !a.device_specific));
    }

    #[test]
    fn test_unreachable_input_is_an_error() {
        let mut devices = tiered_room();
        devices.push(fixtures::source("orphan"));
        let ctx = EvaluationContext::new("ITB", "1101", &devices, "alice");
        let mut state = RoomState::new("ITB", "1101");
        state.displays.push(DisplayState {
            name: "D1".to_string(),
            input: Some("orphan".to_string()),
            ..Default::default()
        });

        let err = ChangeVideoInputTieredSwitchers.evaluate(&state, &ctx).unwrap_err();
        assert!(matches!(err, EvaluationError::Unreachable { .. }));
    }

    #[test]
    fn test_input_must_be_a_source() {
        let devices = tiered_room();
        let ctx = EvaluationContext::new("ITB", "1101", &devices, "alice");
        let mut state = RoomState::new("ITB", "1101");
        state.current_video_input = Some("SW1".to_string());

        let err = ChangeVideoInputTieredSwitchers.evaluate(&state, &ctx).unwrap_err();
        assert!(matches!(err, EvaluationError::NotAnInput(id) if id == "SW1"));
    }
}
