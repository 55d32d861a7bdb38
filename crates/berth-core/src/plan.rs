//! Service type and plan enumerations plus the resource plan catalog.
//!
//! Both enumerations are closed: an unknown string is a caller-facing
//! validation error naming the offending value, never a fallback default.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Backing-service type a session can provision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceType {
    Postgres,
}

impl ServiceType {
    pub fn label(&self) -> &'static str {
        match self {
            ServiceType::Postgres => "postgres",
        }
    }
}

/// Unknown service type supplied by a caller.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unsupported service type: {0:?}")]
pub struct UnsupportedType(pub String);

impl FromStr for ServiceType {
    type Err = UnsupportedType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "postgres" => Ok(ServiceType::Postgres),
            other => Err(UnsupportedType(other.to_string())),
        }
    }
}

/// Named sizing tier for a managed service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServicePlan {
    Micro,
    Small,
    Ha,
}

impl ServicePlan {
    pub fn label(&self) -> &'static str {
        match self {
            ServicePlan::Micro => "micro",
            ServicePlan::Small => "small",
            ServicePlan::Ha => "ha",
        }
    }
}

/// Unknown plan name supplied by a caller.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unsupported plan: {0:?} (expected micro, small, or ha)")]
pub struct UnsupportedPlan(pub String);

impl FromStr for ServicePlan {
    type Err = UnsupportedPlan;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "micro" => Ok(ServicePlan::Micro),
            "small" => Ok(ServicePlan::Small),
            "ha" => Ok(ServicePlan::Ha),
            other => Err(UnsupportedPlan(other.to_string())),
        }
    }
}

/// Immutable sizing for one plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlanEntry {
    pub instances: u32,
    pub cpu: &'static str,
    pub memory: &'static str,
    pub storage: &'static str,
}

static PLANS: OnceLock<HashMap<ServicePlan, PlanEntry>> = OnceLock::new();

fn plan_catalog() -> &'static HashMap<ServicePlan, PlanEntry> {
    PLANS.get_or_init(|| {
        HashMap::from([
            (
                ServicePlan::Micro,
                PlanEntry {
                    instances: 1,
                    cpu: "500m",
                    memory: "512Mi",
                    storage: "1Gi",
                },
            ),
            (
                ServicePlan::Small,
                PlanEntry {
                    instances: 1,
                    cpu: "1",
                    memory: "1Gi",
                    storage: "5Gi",
                },
            ),
            (
                ServicePlan::Ha,
                PlanEntry {
                    instances: 3,
                    cpu: "2",
                    memory: "2Gi",
                    storage: "20Gi",
                },
            ),
        ])
    })
}

/// Concrete sizing for a plan. Total by construction: every [`ServicePlan`]
/// variant has a catalog entry.
pub fn plan_sizing(plan: ServicePlan) -> &'static PlanEntry {
    plan_catalog()
        .get(&plan)
        .unwrap_or_else(|| unreachable!("catalog covers every plan variant"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_has_exactly_three_entries() {
        assert_eq!(plan_catalog().len(), 3);
    }

    #[test]
    fn plan_sizing_triples() {
        let micro = plan_sizing(ServicePlan::Micro);
        assert_eq!((micro.instances, micro.memory, micro.storage), (1, "512Mi", "1Gi"));

        let small = plan_sizing(ServicePlan::Small);
        assert_eq!((small.instances, small.memory, small.storage), (1, "1Gi", "5Gi"));

        let ha = plan_sizing(ServicePlan::Ha);
        assert_eq!((ha.instances, ha.memory, ha.storage), (3, "2Gi", "20Gi"));
    }

    #[test]
    fn unknown_plan_is_rejected_with_value() {
        let err = "mega".parse::<ServicePlan>().unwrap_err();
        assert!(err.to_string().contains("mega"));
    }

    #[test]
    fn unknown_type_is_rejected_with_value() {
        let err = "mysql".parse::<ServiceType>().unwrap_err();
        assert!(err.to_string().contains("mysql"));
    }

    #[test]
    fn known_names_round_trip() {
        assert_eq!("micro".parse::<ServicePlan>().unwrap().label(), "micro");
        assert_eq!("ha".parse::<ServicePlan>().unwrap().label(), "ha");
        assert_eq!("postgres".parse::<ServiceType>().unwrap().label(), "postgres");
    }
}
