//! Signal routing graph
//!
//! Models which device feeds which, built from the port metadata of a room's
//! devices. Edges point from a sink toward the device that feeds it, so a
//! breadth-first walk from a display visits switchers and then sources.
//!
//! ```
//! use roomproto::{Device, Port};
//! use signalpath::SignalGraph;
//!
//! let laptop = Device::new("laptop").as_input();
//! let display = Device::new("display")
//!     .as_output()
//!     .with_port(Port::new("HDMI1", "laptop", "display"));
//!
//! let graph = SignalGraph::build(&[laptop, display]);
//! let path = graph.reachable("display", "laptop").unwrap().unwrap();
//! assert_eq!(path.ids(), vec!["display", "laptop"]);
//! ```

mod graph;

pub use graph::{GraphSnapshot, RoutingError, SignalGraph, SignalPath};
