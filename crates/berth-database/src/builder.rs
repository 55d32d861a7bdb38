//! Database manifest construction.

use berth_core::{HEALTH_PORT, OPERATOR_NAMESPACE, plan_sizing};
use berth_state::{
    DatabaseManifest, IngressRule, ManagedServiceRecord, NetworkPolicy, OwnerKind, OwnerRef,
};

/// Build the operator-facing manifest for a managed service.
///
/// The owner reference makes the underlying resource cascade when the
/// service record is deleted. The network policy confines ingress to the
/// service's own namespace plus the operator control namespace; the
/// operator must reach workload pods on the internal health port or the
/// resource never reports healthy.
pub fn build_manifest(service: &ManagedServiceRecord) -> DatabaseManifest {
    let sizing = plan_sizing(service.plan);
    DatabaseManifest {
        instances: sizing.instances,
        cpu: sizing.cpu.to_string(),
        memory: sizing.memory.to_string(),
        storage: sizing.storage.to_string(),
        owner: OwnerRef {
            kind: OwnerKind::ManagedService,
            name: service.name.clone(),
        },
        network_policy: NetworkPolicy {
            namespace: service.namespace.clone(),
            ingress: vec![
                IngressRule {
                    from_namespace: service.namespace.clone(),
                    port: None,
                },
                IngressRule {
                    from_namespace: OPERATOR_NAMESPACE.to_string(),
                    port: Some(HEALTH_PORT),
                },
            ],
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use berth_core::{ServicePlan, ServiceType};
    use berth_state::ServicePhase;

    fn service(plan: ServicePlan) -> ManagedServiceRecord {
        ManagedServiceRecord {
            name: "mydb".to_string(),
            namespace: "berth-x".to_string(),
            service_type: ServiceType::Postgres,
            plan,
            phase: ServicePhase::Provisioning,
            credential_secret: "mydb-app".to_string(),
            bound_workloads: Vec::new(),
            created_at: 1000,
            resource_version: 1,
        }
    }

    #[test]
    fn manifest_applies_plan_sizing() {
        let micro = build_manifest(&service(ServicePlan::Micro));
        assert_eq!(micro.instances, 1);
        assert_eq!(micro.memory, "512Mi");
        assert_eq!(micro.storage, "1Gi");

        let ha = build_manifest(&service(ServicePlan::Ha));
        assert_eq!(ha.instances, 3);
        assert_eq!(ha.memory, "2Gi");
        assert_eq!(ha.storage, "20Gi");
    }

    #[test]
    fn manifest_owner_cascades_to_the_service() {
        let manifest = build_manifest(&service(ServicePlan::Micro));
        assert_eq!(manifest.owner.kind, OwnerKind::ManagedService);
        assert_eq!(manifest.owner.name, "mydb");
    }

    #[test]
    fn network_policy_permits_namespace_and_operator_only() {
        let manifest = build_manifest(&service(ServicePlan::Small));
        let policy = &manifest.network_policy;

        assert_eq!(policy.namespace, "berth-x");
        assert_eq!(policy.ingress.len(), 2);
        assert_eq!(policy.ingress[0].from_namespace, "berth-x");
        assert_eq!(policy.ingress[0].port, None);
        assert_eq!(policy.ingress[1].from_namespace, OPERATOR_NAMESPACE);
        assert_eq!(policy.ingress[1].port, Some(HEALTH_PORT));
    }
}
