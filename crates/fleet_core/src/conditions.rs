use k8s_openapi::apimachinery::pkg::apis::meta::v1::{Condition, Time};

pub const READY: &str = "Ready";
pub const RECONCILED: &str = "Reconciled";

/// Sets the corresponding condition in `conditions` to `new_condition` and returns
/// a tuple containing the new conditions vector and whether it was changed.
///
/// If a condition of the given type already exists, all fields are updated in place;
/// `lastTransitionTime` only moves when `status` itself changes. If the type does not
/// exist yet, the condition is appended with `lastTransitionTime` set to now.
pub fn set_status_condition(conditions: &[Condition], mut new_condition: Condition) -> (Vec<Condition>, bool) {
    let mut new_conditions = Vec::from(conditions);
    let mut changed = false;

    if let Some(index) = new_conditions.iter().position(|c| c.type_ == new_condition.type_) {
        let existing = &mut new_conditions[index];

        if existing.status != new_condition.status {
            existing.status = new_condition.status.clone();
            existing.last_transition_time = Time(chrono::Utc::now());
            changed = true;
        }
        if existing.reason != new_condition.reason {
            existing.reason = new_condition.reason.clone();
            changed = true;
        }
        if existing.message != new_condition.message {
            existing.message = new_condition.message.clone();
            changed = true;
        }
        if existing.observed_generation != new_condition.observed_generation {
            existing.observed_generation = new_condition.observed_generation;
            changed = true;
        }
    } else {
        new_condition.last_transition_time = Time(chrono::Utc::now());
        new_conditions.push(new_condition);
        changed = true;
    }

    (new_conditions, changed)
}

pub fn remove_status_condition(conditions: &[Condition], condition_type: &str) -> (Vec<Condition>, bool) {
    let mut new_conditions = conditions.to_vec();
    let original_len = new_conditions.len();
    new_conditions.retain(|c| c.type_ != condition_type);
    let removed = new_conditions.len() != original_len;
    (new_conditions, removed)
}

pub fn find_status_condition<'a>(conditions: &'a [Condition], condition_type: &str) -> Option<&'a Condition> {
    conditions.iter().find(|c| c.type_ == condition_type)
}

pub fn is_status_condition_true(conditions: &[Condition], condition_type: &str) -> bool {
    is_status_condition_present_and_equal(conditions, condition_type, "True")
}

pub fn is_status_condition_present_and_equal(conditions: &[Condition], condition_type: &str, status: &str) -> bool {
    conditions.iter().any(|c| c.type_ == condition_type && c.status == status)
}

/// Builds the standard `Ready`/`Reconciled` condition pair for a reconcile pass,
/// per SPEC_FULL §4.2 step 7.
pub fn standard_conditions(existing: &[Condition], phase_ready: bool, observed_generation: Option<i64>) -> (Vec<Condition>, bool) {
    let (after_ready, c1) = set_status_condition(
        existing,
        Condition {
            type_: READY.to_string(),
            status: if phase_ready { "True" } else { "False" }.to_string(),
            reason: if phase_ready { "PhaseReady".to_string() } else { "PhaseNotReady".to_string() },
            message: if phase_ready {
                "all children ready".to_string()
            } else {
                "one or more children not ready".to_string()
            },
            last_transition_time: Time(chrono::Utc::now()),
            observed_generation,
        },
    );
    let (after_reconciled, c2) = set_status_condition(
        &after_ready,
        Condition {
            type_: RECONCILED.to_string(),
            status: "True".to_string(),
            reason: "ReconcilePassCompleted".to_string(),
            message: "reconcile pass completed without error".to_string(),
            last_transition_time: Time(chrono::Utc::now()),
            observed_generation,
        },
    );
    (after_reconciled, c1 || c2)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cond(type_: &str, status: &str) -> Condition {
        Condition {
            type_: type_.to_string(),
            status: status.to_string(),
            reason: "Testing".to_string(),
            message: "test message".to_string(),
            last_transition_time: Time(chrono::Utc::now()),
            observed_generation: Some(1),
        }
    }

    #[test]
    fn adds_new_condition() {
        let (conditions, changed) = set_status_condition(&[], cond("Ready", "True"));
        assert!(changed);
        assert_eq!(conditions.len(), 1);
    }

    #[test]
    fn updates_existing_condition_status() {
        let existing = vec![cond("Ready", "True")];
        let (conditions, changed) = set_status_condition(&existing, cond("Ready", "False"));
        assert!(changed);
        assert_eq!(conditions.len(), 1);
        assert_eq!(conditions[0].status, "False");
    }

    #[test]
    fn no_change_when_identical() {
        let existing = vec![cond("Ready", "True")];
        let (conditions, changed) = set_status_condition(&existing, cond("Ready", "True"));
        assert!(!changed);
        assert_eq!(conditions[0].status, "True");
    }

    #[test]
    fn removes_condition() {
        let existing = vec![cond("Ready", "True")];
        let (conditions, removed) = remove_status_condition(&existing, "Ready");
        assert!(removed);
        assert!(conditions.is_empty());
    }

    #[test]
    fn standard_conditions_ready_true() {
        let (conditions, changed) = standard_conditions(&[], true, Some(3));
        assert!(changed);
        assert!(is_status_condition_true(&conditions, READY));
        assert!(is_status_condition_true(&conditions, RECONCILED));
    }
}
