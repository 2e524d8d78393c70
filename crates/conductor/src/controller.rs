//! Room controller: generate, validate, reconcile, execute.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use roomproto::{RoomConfiguration, RoomState, StatusOutcome};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::action::Action;
use crate::evaluators::EvaluationError;
use crate::executor::Executor;
use crate::graph::ExecutionGraph;
use crate::reconciler::{ReconcileError, Reconciler};
use crate::registry::{EvaluationContext, EvaluatorRegistry};
use crate::store::{DeviceStore, StoreError};

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("room configuration names unknown evaluator {0}")]
    UnknownEvaluator(String),

    #[error("room {0} has no evaluators configured")]
    NoEvaluators(String),

    #[error("evaluator {evaluator} failed: {source}")]
    Evaluation {
        evaluator: String,
        #[source]
        source: EvaluationError,
    },

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),
}

/// Everything that happened for one room-state request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomReport {
    pub run_id: Uuid,
    pub building: String,
    pub room: String,
    pub requestor: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outcomes: Vec<StatusOutcome>,
}

impl RoomReport {
    pub fn failures(&self) -> impl Iterator<Item = &StatusOutcome> {
        self.outcomes.iter().filter(|o| o.is_failure())
    }

    pub fn is_clean(&self) -> bool {
        self.failures().next().is_none()
    }
}

pub struct RoomController {
    store: Arc<dyn DeviceStore>,
    registry: Arc<EvaluatorRegistry>,
    executor: Executor,
}

impl RoomController {
    pub fn new(
        store: Arc<dyn DeviceStore>,
        registry: Arc<EvaluatorRegistry>,
        executor: Executor,
    ) -> Self {
        Self {
            store,
            registry,
            executor,
        }
    }

    /// Build the execution graph for a target state without running it.
    #[tracing::instrument(skip(self, target), fields(room = %target.room_id()))]
    pub async fn plan(
        &self,
        target: &RoomState,
        requestor: &str,
    ) -> Result<ExecutionGraph, ControllerError> {
        let room_id = target.room_id();
        let configuration = self
            .store
            .room_configuration(&target.building, &target.room)
            .await?;
        if configuration.evaluators.is_empty() {
            return Err(ControllerError::NoEvaluators(room_id));
        }
        let devices = self
            .store
            .devices_in_room(&target.building, &target.room)
            .await?;

        let ctx = EvaluationContext::new(&target.building, &target.room, &devices, requestor);
        let actions = self.generate(target, &ctx, &configuration)?;
        tracing::debug!(actions = actions.len(), devices = devices.len(), "actions generated");

        let graph = Reconciler::new(&self.registry)
            .with_room_configuration(&configuration)
            .reconcile(actions)?;
        Ok(graph)
    }

    /// Drive a room to `target`.
    ///
    /// Errors mean nothing was sent. A returned report may still contain
    /// failed outcomes.
    pub async fn set_room_state(
        &self,
        target: &RoomState,
        requestor: &str,
    ) -> Result<RoomReport, ControllerError> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        tracing::info!(%run_id, room = %target.room_id(), requestor, "setting room state");

        let graph = self.plan(target, requestor).await?;
        let outcomes = self.executor.execute(graph, requestor).await;

        let report = RoomReport {
            run_id,
            building: target.building.clone(),
            room: target.room.clone(),
            requestor: requestor.to_string(),
            started_at,
            finished_at: Utc::now(),
            outcomes,
        };
        tracing::info!(
            %run_id,
            outcomes = report.outcomes.len(),
            failures = report.failures().count(),
            "room state applied"
        );
        Ok(report)
    }

    /// Run the room's evaluators in configuration order and validate their output.
    fn generate(
        &self,
        target: &RoomState,
        ctx: &EvaluationContext<'_>,
        configuration: &RoomConfiguration,
    ) -> Result<Vec<Action>, ControllerError> {
        let mut actions = Vec::new();

        for reference in &configuration.evaluators {
            let evaluator = self
                .registry
                .get(&reference.key)
                .ok_or_else(|| ControllerError::UnknownEvaluator(reference.key.clone()))?;
            let failed = |source| ControllerError::Evaluation {
                evaluator: reference.key.clone(),
                source,
            };

            let generated = evaluator.evaluate(target, ctx).map_err(failed)?;
            for action in &generated {
                evaluator.validate(action).map_err(failed)?;
            }
            tracing::trace!(evaluator = %reference.key, count = generated.len(), "evaluated");
            actions.extend(generated);
        }

        Ok(actions)
    }
}
