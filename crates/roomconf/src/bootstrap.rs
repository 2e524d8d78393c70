//! Bootstrap configuration - seeds runtime state, then runtime owns it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Evaluator priority overrides.
///
/// Maps evaluator key to priority. These replace the registry's built-in
/// priorities at startup; per-room configuration can still override them.
pub type PrioritiesConfig = BTreeMap<String, i32>;

/// Bootstrap configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BootstrapConfig {
    #[serde(default)]
    pub priorities: PrioritiesConfig,
}
