//! roomproto - Shared types for the conductor control plane
//!
//! Every crate in the workspace speaks these types: the signal graph reads
//! device ports, evaluators read room state and device commands, the engine
//! publishes events and returns status outcomes.
//!
//! ## Devices
//!
//! A [`Device`] is the metadata record the device store hands back: its
//! network address, the roles it plays in the room, the commands it supports
//! (each an endpoint template), and the ports that wire it to other devices.
//!
//! ## Room State
//!
//! [`RoomState`] is the desired state of a room. Room-wide fields (power,
//! current inputs, blanked, muted, volume) apply to every matching device;
//! entries in `displays` / `audio_devices` target one device each.
//!
//! ## Events and Outcomes
//!
//! [`Event`] is the structured state-change or error notice published while
//! executing. [`StatusOutcome`] is the per-action result returned to the
//! caller once a room-state change finishes.

pub mod device;
pub mod event;
pub mod outcome;
pub mod room;

pub use device::{roles, Command, Device, Port};
pub use event::{Event, EventCause, EventInfo, EventType};
pub use outcome::{OutcomeStatus, StatusOutcome};
pub use room::{AudioDeviceState, DisplayState, EvaluatorRef, RoomConfiguration, RoomState};
