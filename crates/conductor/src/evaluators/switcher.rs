//! Input selection through a single video switcher.
//!
//! Switcher ports are named `input:output`, so one port id on the switcher
//! says which input goes to which output.

use roomproto::{roles, Device, EventInfo, RoomState};

use super::{input_requests, require_command, EvaluationError, InputRequest, CHANGE_INPUT};
use crate::action::Action;
use crate::registry::{CommandEvaluator, EvaluationContext};

pub struct ChangeVideoInputVideoSwitcher;

impl ChangeVideoInputVideoSwitcher {
    fn switch_action(
        &self,
        switcher: &Device,
        request: &InputRequest<'_>,
        ctx: &EvaluationContext<'_>,
    ) -> Result<Action, EvaluationError> {
        let source_id = ctx.resolve_id(&request.input);
        let port = switcher
            .ports
            .iter()
            .find(|p| {
                p.destination_device.eq_ignore_ascii_case(&request.output.id)
                    && p.source_device.eq_ignore_ascii_case(&source_id)
            })
            .ok_or_else(|| EvaluationError::NoPort {
                device: switcher.id.clone(),
                peer: request.output.id.clone(),
            })?;

        let Some((input, output)) = port.id.split_once(':') else {
            return Err(EvaluationError::InvalidParameter {
                device: switcher.id.clone(),
                name: "port".to_string(),
                value: port.id.clone(),
            });
        };

        let event = EventInfo::state(
            request.output.name.as_str(),
            "input",
            request.input.as_str(),
            ctx.requestor,
        );
        let action = Action::new(CHANGE_INPUT, self.key(), switcher.clone())
            .for_destination(request.output.clone())
            .with_parameter("input", input)
            .with_parameter("output", output)
            .with_event(event);

        Ok(if request.specific {
            action.device_specific()
        } else {
            action
        })
    }
}

impl CommandEvaluator for ChangeVideoInputVideoSwitcher {
    fn key(&self) -> &'static str {
        "ChangeVideoInputVideoSwitcher"
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
        if requests.is_empty() {
            return Ok(Vec::new());
        }

        let switchers: Vec<&Device> = ctx.devices_with_role(roles::VIDEO_SWITCHER).collect();
        let [switcher] = switchers.as_slice() else {
            return Err(EvaluationError::SwitcherCount(switchers.len()));
        };

        requests
            .iter()
            .map(|request| self.switch_action(switcher, request, ctx))
            .collect()
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
    use roomproto::{Command, DisplayState, Port};

    fn switched_room() -> Vec<Device> {
        let switcher = Device::new("SW1")
            .in_room("ITB", "1101")
            .with_role(roles::VIDEO_SWITCHER)
            .with_command(Command::new(
                "ChangeInput",
                "http://switcher:8000",
                "/:address/input/:input/:output",
            ))
            .with_port(Port::new("0:0", "laptop", "D1").hosted_by("SW1"))
            .with_port(Port::new("1:0", "player", "D1").hosted_by("SW1"))
            .with_port(Port::new("0:1", "laptop", "D2").hosted_by("SW1"));

        vec![
            fixtures::display("D1"),
            fixtures::display("D2"),
            fixtures::source("laptop"),
            fixtures::source("player"),
            switcher,
        ]
    }

    #[test]
    fn test_room_wide_input_sets_each_output() {
        let devices = switched_room();
        let ctx = EvaluationContext::new("ITB", "1101", &devices, "alice");
        let mut state = RoomState::new("ITB", "1101");
        state.current_video_input = Some("laptop".to_string());

        let actions = ChangeVideoInputVideoSwitcher.evaluate(&state, &ctx).unwrap();
        assert_eq!(actions.len(), 2);
        assert!(actions.iter().all(|a| a.device_id() == "SW1"));
        assert_eq!(actions[0].destination_device.id, "D1");
        assert_eq!(actions[0].parameters["input"], "0");
        assert_eq!(actions[0].parameters["output"], "0");
        assert_eq!(actions[1].parameters["output"], "1");
        assert!(ChangeVideoInputVideoSwitcher.validate(&actions[0]).is_ok());
    }

    #[test]
    fn test_missing_switcher_port_is_an_error() {
        let devices = switched_room();
        let ctx = EvaluationContext::new("ITB", "1101", &devices, "alice");
        let mut state = RoomState::new("ITB", "1101");
        state.displays.push(DisplayState {
            name: "D2".to_string(),
            input: Some("player".to_string()),
            ..Default::default()
        });

        let err = ChangeVideoInputVideoSwitcher.evaluate(&state, &ctx).unwrap_err();
        assert!(matches!(err, EvaluationError::NoPort { .. }));
    }

    #[test]
    fn test_requires_exactly_one_switcher() {
        let devices = fixtures::simple_room();
        let ctx = EvaluationContext::new("ITB", "1101", &devices, "alice");
        let mut state = RoomState::new("ITB", "1101");
        state.current_video_input = Some("laptop".to_string());

        let err = ChangeVideoInputVideoSwitcher.evaluate(&state, &ctx).unwrap_err();
        assert!(matches!(err, EvaluationError::SwitcherCount(0)));
    }

    #[test]
    fn test_nothing_requested_needs_no_switcher() {
        let devices = fixtures::simple_room();
        let ctx = EvaluationContext::new("ITB", "1101", &devices, "alice");
        let state = RoomState::new("ITB", "1101");
        assert!(ChangeVideoInputVideoSwitcher
            .evaluate(&state, &ctx)
            .unwrap()
            .is_empty());
    }
}
