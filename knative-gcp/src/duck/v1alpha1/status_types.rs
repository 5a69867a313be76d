use knative_gcp_conditions::{ConditionAccessor, ConditionType, Conditions};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The status block shared by every resource, generic over the
/// [`ConditionType`] that describes its readiness.
#[derive(Serialize, Deserialize, Clone, Debug, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Status<C: ConditionType> {
    /// ObservedGeneration is the 'Generation' of the Service that
    /// was last processed by the controller.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
    /// Conditions the latest available observations of a resource's current state.
    #[serde(default, skip_serializing_if = "Conditions::is_empty")]
    pub conditions: Conditions<C>,
    /// Annotations is additional Status fields for the Resource to save some
    /// additional State as well as convey more information to the user. This is
    /// roughly akin to Annotations on any k8s resource, just the reconciler conveying
    /// richer information outwards.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<BTreeMap<String, String>>,
}

impl<C: ConditionType> ConditionAccessor<C> for Status<C> {
    fn conditions(&self) -> &Conditions<C> {
        &self.conditions
    }

    fn conditions_mut(&mut self) -> &mut Conditions<C> {
        &mut self.conditions
    }
}
