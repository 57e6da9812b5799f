use serde::{Deserialize, Serialize};

use crate::NOT_CONFIGURED;

/// Per-child result of a materializer invocation (SPEC_FULL §3, §4.3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ChildStatus {
    pub kind: String,
    pub name: String,
    pub ready: bool,
    pub message: String,
}

impl ChildStatus {
    pub fn new(kind: impl Into<String>, name: impl Into<String>, ready: bool, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            name: name.into(),
            ready,
            message: message.into(),
        }
    }

    pub fn not_configured(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(kind, name, true, NOT_CONFIGURED)
    }

    pub fn failed(kind: impl Into<String>, name: impl Into<String>, op: &str, err: impl std::fmt::Display) -> Self {
        Self::new(kind, name, false, format!("{op} failed: {err}"))
    }
}

/// Parent-level rollup phase, identical shape for InferenceStack and GatewayBundle (§4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub enum Phase {
    Pending,
    Ready,
    Degraded,
    Error,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Phase::Pending => "Pending",
            Phase::Ready => "Ready",
            Phase::Degraded => "Degraded",
            Phase::Error => "Error",
        };
        write!(f, "{s}")
    }
}

/// Pure rollup over a child-status list (§4.4). Depends only on the multiset of
/// `(ready, message)` pairs, never on ordering.
pub fn aggregate_phase(children: &[ChildStatus]) -> Phase {
    if children.is_empty() {
        return Phase::Pending;
    }
    if children.iter().all(|c| c.ready) {
        return Phase::Ready;
    }

    let has_error_signal = children
        .iter()
        .filter(|c| !c.ready)
        .any(|c| !c.message.is_empty() && c.message != NOT_CONFIGURED);

    if has_error_signal {
        Phase::Error
    } else {
        Phase::Degraded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_is_pending() {
        assert_eq!(aggregate_phase(&[]), Phase::Pending);
    }

    #[test]
    fn all_ready_is_ready() {
        let children = vec![
            ChildStatus::new("Pool", "s-pool", true, "in sync"),
            ChildStatus::new("Route", "s-route", true, "not configured"),
        ];
        assert_eq!(aggregate_phase(&children), Phase::Ready);
    }

    #[test]
    fn not_configured_alone_is_degraded() {
        let children = vec![
            ChildStatus::new("Pool", "s-pool", true, ""),
            ChildStatus::new("Addon", "s-addon", true, "not configured"),
            ChildStatus::new("Dcgm", "s-dcgm", false, "waiting for pods (0 ready)"),
        ];
        assert_eq!(aggregate_phase(&children), Phase::Degraded);
    }

    #[test]
    fn error_message_dominates() {
        let children = vec![
            ChildStatus::new("Pool", "s-pool", true, ""),
            ChildStatus::new("Addon", "s-addon", true, "not configured"),
            ChildStatus::new("Dcgm", "s-dcgm", false, "create failed: forbidden"),
        ];
        assert_eq!(aggregate_phase(&children), Phase::Error);
    }

    #[test]
    fn flipping_last_child_to_ready_yields_ready() {
        let children = vec![
            ChildStatus::new("Pool", "s-pool", true, ""),
            ChildStatus::new("Addon", "s-addon", true, "not configured"),
            ChildStatus::new("Dcgm", "s-dcgm", true, "in sync"),
        ];
        assert_eq!(aggregate_phase(&children), Phase::Ready);
    }

    #[test]
    fn ordering_does_not_matter() {
        let a = vec![
            ChildStatus::new("A", "a", false, "create failed: x"),
            ChildStatus::new("B", "b", true, "in sync"),
        ];
        let b = vec![
            ChildStatus::new("B", "b", true, "in sync"),
            ChildStatus::new("A", "a", false, "create failed: x"),
        ];
        assert_eq!(aggregate_phase(&a), aggregate_phase(&b));
    }
}
