//! Condition interpretation for operator-reported status.

use berth_core::credential_secret_name;
use berth_state::{ConditionStatus, DatabaseResource, ServicePhase};

/// Platform view of a database resource's reported state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    pub phase: ServicePhase,
    /// Deterministic credential-object name, independent of phase.
    pub credential_secret: String,
}

/// Interpret the operator's condition list into a platform phase.
///
/// Ready requires the `Ready` condition to be explicitly true; an absent
/// or false condition maps to Provisioning. An explicit `Failed` condition
/// maps to Failed. Neither readiness nor failure is ever inferred from
/// the absence of the other.
pub fn read_status(resource: &DatabaseResource) -> StatusReport {
    let phase = if condition_is_true(resource, "Ready") {
        ServicePhase::Ready
    } else if condition_is_true(resource, "Failed") {
        ServicePhase::Failed
    } else {
        ServicePhase::Provisioning
    };

    StatusReport {
        phase,
        credential_secret: credential_secret_name(&resource.name),
    }
}

fn condition_is_true(resource: &DatabaseResource, kind: &str) -> bool {
    resource
        .conditions
        .iter()
        .any(|c| c.kind == kind && c.status == ConditionStatus::True)
}

#[cfg(test)]
mod tests {
    use super::*;

    use berth_state::{
        Condition, DatabaseManifest, NetworkPolicy, OwnerKind, OwnerRef,
    };

    fn resource(conditions: Vec<Condition>) -> DatabaseResource {
        DatabaseResource {
            name: "mydb".to_string(),
            namespace: "berth-x".to_string(),
            spec: DatabaseManifest {
                instances: 1,
                cpu: "500m".to_string(),
                memory: "512Mi".to_string(),
                storage: "1Gi".to_string(),
                owner: OwnerRef {
                    kind: OwnerKind::ManagedService,
                    name: "mydb".to_string(),
                },
                network_policy: NetworkPolicy {
                    namespace: "berth-x".to_string(),
                    ingress: Vec::new(),
                },
            },
            conditions,
            resource_version: 1,
        }
    }

    fn condition(kind: &str, status: ConditionStatus) -> Condition {
        Condition {
            kind: kind.to_string(),
            status,
            message: None,
        }
    }

    #[test]
    fn no_conditions_means_provisioning() {
        let report = read_status(&resource(Vec::new()));
        assert_eq!(report.phase, ServicePhase::Provisioning);
    }

    #[test]
    fn ready_false_is_still_provisioning() {
        let report = read_status(&resource(vec![condition("Ready", ConditionStatus::False)]));
        assert_eq!(report.phase, ServicePhase::Provisioning);
    }

    #[test]
    fn ready_unknown_is_still_provisioning() {
        let report = read_status(&resource(vec![condition("Ready", ConditionStatus::Unknown)]));
        assert_eq!(report.phase, ServicePhase::Provisioning);
    }

    #[test]
    fn explicit_ready_true_is_ready() {
        let report = read_status(&resource(vec![condition("Ready", ConditionStatus::True)]));
        assert_eq!(report.phase, ServicePhase::Ready);
    }

    #[test]
    fn explicit_failed_true_is_failed() {
        let report = read_status(&resource(vec![condition("Failed", ConditionStatus::True)]));
        assert_eq!(report.phase, ServicePhase::Failed);
    }

    #[test]
    fn ready_wins_over_stale_failed() {
        let report = read_status(&resource(vec![
            condition("Failed", ConditionStatus::True),
            condition("Ready", ConditionStatus::True),
        ]));
        assert_eq!(report.phase, ServicePhase::Ready);
    }

    #[test]
    fn credential_name_is_fixed_regardless_of_phase() {
        for conditions in [
            Vec::new(),
            vec![condition("Ready", ConditionStatus::True)],
            vec![condition("Failed", ConditionStatus::True)],
        ] {
            let report = read_status(&resource(conditions));
            assert_eq!(report.credential_secret, "mydb-app");
        }
    }
}
