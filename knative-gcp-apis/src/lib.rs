//! Custom resources for Google Cloud event sources.
//!
//! Every kind here composes the duck types of [`knative_gcp`] and exposes its
//! readiness through a [`ConditionType`](knative_gcp::conditions::ConditionType).
pub mod apis;
