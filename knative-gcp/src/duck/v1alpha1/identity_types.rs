use super::status_types::Status;
use crate::resource::ReadyResource;
use knative_gcp_conditions::{ConditionAccessor, ConditionStatus, ConditionType, Conditions};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// The informational condition reporting whether the workload identity binding
/// is in place. A [`ConditionType`] may declare a variant of the same name to
/// make it gate readiness.
pub const WORKLOAD_IDENTITY_CONFIGURED: &str = "WorkloadIdentityConfigured";

/// The external identity a resource authenticates as.
#[derive(Serialize, Deserialize, Clone, Debug, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IdentitySpec {
    /// GoogleServiceAccount is the GCP service account which has required
    /// permissions to poll from a Cloud Pub/Sub subscription.
    /// If not specified, defaults to use secret.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub google_service_account: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IdentityStatus<C: ConditionType> {
    /// inherits [`Status`], which currently provides:
    /// * observed_generation
    /// * conditions
    #[serde(flatten)]
    pub status: Status<C>,
    /// ServiceAccountName is the k8s service account associated with Google service account.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_account_name: Option<String>,
}

impl<C: ConditionType> ConditionAccessor<C> for IdentityStatus<C> {
    fn conditions(&self) -> &Conditions<C> {
        self.status.conditions()
    }

    fn conditions_mut(&mut self) -> &mut Conditions<C> {
        self.status.conditions_mut()
    }
}

impl<C: ConditionType> IdentityStatus<C> {
    /// Record the k8s service account bound to the Google service account.
    pub fn mark_identity_bound(&mut self, service_account_name: &str) {
        self.service_account_name = Some(service_account_name.to_string());
        self.manager()
            .set_other(WORKLOAD_IDENTITY_CONFIGURED, ConditionStatus::True, None, None);
    }

    pub fn mark_identity_failed(&mut self, reason: &str, message: Option<String>) {
        self.manager().set_other(
            WORKLOAD_IDENTITY_CONFIGURED,
            ConditionStatus::False,
            Some(reason),
            message,
        );
    }
}

/// Resources that run as a configurable external identity.
///
/// The `_mut` accessors borrow straight into the resource, so identity
/// reconciliation can be written once for every kind.
pub trait Identifiable: ReadyResource {
    fn identity_spec(&self) -> &IdentitySpec;

    fn identity_spec_mut(&mut self) -> &mut IdentitySpec;

    /// `None` until a controller has written a status.
    fn identity_status(&self) -> Option<&IdentityStatus<Self::Condition>>;

    /// Creates an empty status if none exists yet.
    fn identity_status_mut(&mut self) -> &mut IdentityStatus<Self::Condition>;
}
