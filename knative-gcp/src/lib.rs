mod duck;
pub mod error;
pub mod naming;
mod resource;

// expose only v1alpha1 types
pub use duck::v1alpha1::*;
pub use resource::{object_key, GroupVersionKindExt, ReadyResource};

pub mod conditions {
    pub use knative_gcp_conditions::{
        Condition, ConditionAccessor, ConditionManager, ConditionName, ConditionSet,
        ConditionSeverity, ConditionStatus, ConditionType, Conditions, ReadinessPhase,
    };
}

pub mod derive {
    pub use knative_gcp_derive::ConditionType;
}

#[doc = include_str!("../../README.md")]
#[cfg(doctest)]
pub struct ReadmeDoctests;
