//! Execution engine.
//!
//! Walks an [`ExecutionGraph`] from its root. Every child of the root gets
//! its own task, and each task spawns one task per child of its action once
//! that action's request has returned. Devices therefore run in parallel
//! while a device's own chain stays strictly sequential.
//!
//! Outcomes flow into a channel sized to the action count. The walk is
//! joined through a [`TaskTracker`] before the channel is drained, so every
//! outcome is collected and no reader races a writer.
//!
//! Failures are local to a branch: the failed action's outcome is recorded,
//! an error event is published, and its children never run. Sibling chains
//! carry on.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

use roomproto::{EventInfo, EventType, OutcomeStatus, StatusOutcome};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::task::TaskTracker;
use tracing::Instrument;

use crate::action::{Action, ActionId};
use crate::client::{DeviceClient, DeviceRequest, DeviceResponse, TransportError};
use crate::events::EventPublisher;
use crate::graph::ExecutionGraph;

/// Address placeholder, always filled from the device record.
const ADDRESS: &str = "address";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("device {device} has no command {command}")]
    MissingCommand { device: String, command: String },

    #[error("no value for endpoint placeholder :{0}")]
    MissingParameter(String),

    #[error("parameter {0} has no placeholder in the endpoint")]
    UnusedParameter(String),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("device answered {status}: {body}")]
    Status { status: u16, body: String },
}

/// Substitute `:address` and every `:name` placeholder in an endpoint.
///
/// Placeholder names start with a letter or underscore and run over
/// alphanumerics and underscores, so `host:8000` is left alone. Every
/// parameter has to be consumed.
pub fn render_endpoint(
    template: &str,
    address: &str,
    parameters: &BTreeMap<String, String>,
) -> Result<String, DispatchError> {
    let mut rendered = String::with_capacity(template.len() + address.len());
    let mut used = BTreeSet::new();
    let mut rest = template;

    while let Some(colon) = rest.find(':') {
        rendered.push_str(&rest[..colon]);
        let after = &rest[colon + 1..];

        let starts_name = after
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
        if !starts_name {
            rendered.push(':');
            rest = after;
            continue;
        }

        let end = after
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(after.len());
        let name = &after[..end];

        if name == ADDRESS {
            rendered.push_str(address);
        } else {
            let value = parameters
                .get(name)
                .ok_or_else(|| DispatchError::MissingParameter(name.to_string()))?;
            rendered.push_str(value);
            used.insert(name);
        }
        rest = &after[end..];
    }
    rendered.push_str(rest);

    if let Some(unused) = parameters.keys().find(|k| !used.contains(k.as_str())) {
        return Err(DispatchError::UnusedParameter(unused.clone()));
    }
    Ok(rendered)
}

/// Runs execution graphs against a device client.
#[derive(Clone)]
pub struct Executor {
    client: Arc<dyn DeviceClient>,
    publisher: Arc<dyn EventPublisher>,
    timeout: Duration,
}

/// State shared by every task of one walk.
struct Walk {
    graph: ExecutionGraph,
    requestor: String,
    client: Arc<dyn DeviceClient>,
    publisher: Arc<dyn EventPublisher>,
    timeout: Duration,
    outcomes: mpsc::Sender<StatusOutcome>,
    tracker: TaskTracker,
}

impl Executor {
    pub fn new(
        client: Arc<dyn DeviceClient>,
        publisher: Arc<dyn EventPublisher>,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            publisher,
            timeout,
        }
    }

    /// Execute every chain and return one outcome per action reached.
    ///
    /// There is no top-level error: callers inspect each outcome's status.
    /// Actions below a failed one never run and have no outcome.
    pub async fn execute(&self, graph: ExecutionGraph, requestor: &str) -> Vec<StatusOutcome> {
        let capacity = graph.action_count().max(1);
        let (tx, mut rx) = mpsc::channel(capacity);
        let tracker = TaskTracker::new();

        let walk = Arc::new(Walk {
            graph,
            requestor: requestor.to_string(),
            client: self.client.clone(),
            publisher: self.publisher.clone(),
            timeout: self.timeout,
            outcomes: tx,
            tracker: tracker.clone(),
        });

        let root = walk.graph.root();
        tracing::debug!(
            chains = walk.graph.children(root).len(),
            actions = walk.graph.action_count(),
            requestor,
            "executing graph"
        );
        for &child in walk.graph.children(root) {
            spawn_action(walk.clone(), child);
        }
        drop(walk);

        tracker.close();
        tracker.wait().await;

        let mut outcomes = Vec::with_capacity(capacity);
        while let Ok(outcome) = rx.try_recv() {
            outcomes.push(outcome);
        }
        outcomes
    }
}

fn spawn_action(walk: Arc<Walk>, id: ActionId) {
    let action = walk.graph.action(id);
    let span = tracing::info_span!(
        "dispatch",
        device = %action.device.id,
        action = %action.name,
    );
    let tracker = walk.tracker.clone();

    tracker.spawn(
        async move {
            if walk.run(id).await {
                for &child in walk.graph.children(id) {
                    spawn_action(walk.clone(), child);
                }
            }
        }
        .instrument(span),
    );
}

impl Walk {
    /// Dispatch one action and record its outcome. Returns whether its
    /// children should run.
    async fn run(&self, id: ActionId) -> bool {
        let action = self.graph.action(id);

        if action.overridden {
            tracing::debug!("overridden, skipping");
            self.record(outcome(action, OutcomeStatus::Skipped)).await;
            return true;
        }

        match self.dispatch(action).await {
            Ok(response) => {
                let subject = &action.destination_device;
                for info in &action.event_log {
                    self.publisher
                        .publish(info.clone().into_event(&subject.building, &subject.room));
                }
                tracing::debug!(status = response.status, "action succeeded");
                let mut result = outcome(action, OutcomeStatus::Success);
                result.device_status = response.device_status();
                self.record(result).await;
                true
            }
            Err(err) => {
                tracing::warn!(error = %err, "action failed, halting chain");
                self.publisher.publish(
                    EventInfo::state(
                        action.device.name.as_str(),
                        "error",
                        err.to_string(),
                        self.requestor.as_str(),
                    )
                    .with_type(EventType::Error)
                    .into_event(&action.device.building, &action.device.room),
                );
                let mut result = outcome(action, OutcomeStatus::Failure);
                result.error = Some(err.to_string());
                self.record(result).await;
                false
            }
        }
    }

    async fn dispatch(&self, action: &Action) -> Result<DeviceResponse, DispatchError> {
        let command =
            action
                .device
                .command(&action.name)
                .ok_or_else(|| DispatchError::MissingCommand {
                    device: action.device.id.clone(),
                    command: action.name.clone(),
                })?;

        let endpoint =
            render_endpoint(&command.endpoint, &action.device.address, &action.parameters)?;
        if endpoint.contains(':') {
            tracing::debug!(
                template = %command.endpoint,
                %endpoint,
                "rendered endpoint still contains ':'"
            );
        }

        let request = DeviceRequest {
            device: action.device.id.clone(),
            address: action.device.address.clone(),
            microservice: command.microservice.clone(),
            endpoint,
        };

        let response = tokio::time::timeout(self.timeout, self.client.send(&request))
            .await
            .map_err(|_| TransportError::Timeout {
                url: request.url(),
                timeout: self.timeout,
            })??;

        if !response.is_success() {
            return Err(DispatchError::Status {
                status: response.status,
                body: response.body,
            });
        }
        Ok(response)
    }

    async fn record(&self, outcome: StatusOutcome) {
        // Capacity equals the action count and each action reports once.
        if self.outcomes.send(outcome).await.is_err() {
            tracing::error!("outcome channel closed before walk finished");
        }
    }
}

fn outcome(action: &Action, status: OutcomeStatus) -> StatusOutcome {
    StatusOutcome {
        action: action.name.clone(),
        generator: action.generator.clone(),
        device: action.device.id.clone(),
        destination_device: action.destination_device.id.clone(),
        status,
        device_status: None,
        error: None,
    }
}
