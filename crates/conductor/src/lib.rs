//! conductor - Room state reconciliation and device command execution
//!
//! A request to put a room into some state flows through four stages:
//!
//! 1. **Generate.** Each evaluator configured for the room reads its concern
//!    out of the requested [`RoomState`] and emits [`Action`]s.
//! 2. **Validate.** The same evaluator checks every action it produced
//!    against the target device's command set.
//! 3. **Reconcile.** The [`Reconciler`] resolves conflicts (device-specific
//!    beats room-wide), folds duplicates, and orders each device's actions
//!    into a chain hanging off a synthetic root.
//! 4. **Execute.** The [`Executor`] walks the graph: devices in parallel,
//!    each device's chain in order, one outcome per action.
//!
//! [`RoomController`] ties the stages together against a [`DeviceStore`].
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use conductor::{
//!     EvaluatorRegistry, Executor, HttpDeviceClient, InventoryStore, LogPublisher, RoomController,
//! };
//! use roomproto::RoomState;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let store = Arc::new(InventoryStore::load("inventory.json").await?);
//! let client = Arc::new(HttpDeviceClient::new(Duration::from_secs(5), None)?);
//! let executor = Executor::new(client, Arc::new(LogPublisher), Duration::from_secs(5));
//! let controller = RoomController::new(store, Arc::new(EvaluatorRegistry::with_defaults()), executor);
//!
//! let mut target = RoomState::new("ITB", "1101");
//! target.power = Some("on".to_string());
//! let report = controller.set_room_state(&target, "alice").await?;
//! for outcome in report.failures() {
//!     eprintln!("{} on {}: {:?}", outcome.action, outcome.device, outcome.error);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! [`RoomState`]: roomproto::RoomState

pub mod action;
pub mod client;
pub mod controller;
pub mod evaluators;
pub mod events;
pub mod executor;
pub mod graph;
pub mod reconciler;
pub mod registry;
pub mod store;
pub mod telemetry;

pub use action::{Action, ActionId};
pub use client::{DeviceClient, DeviceRequest, DeviceResponse, HttpDeviceClient, TransportError};
pub use controller::{ControllerError, RoomController, RoomReport};
pub use evaluators::EvaluationError;
pub use events::{EventPublisher, HttpEventPublisher, LogPublisher};
pub use executor::{render_endpoint, DispatchError, Executor};
pub use graph::ExecutionGraph;
pub use reconciler::{ReconcileError, Reconciler};
pub use registry::{CommandEvaluator, EvaluationContext, EvaluatorRegistry};
pub use store::{DeviceStore, InventoryStore, RoomInventory, StoreError};
