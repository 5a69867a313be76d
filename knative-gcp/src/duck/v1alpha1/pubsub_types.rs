use super::{
    identity_types::{IdentitySpec, IdentityStatus, Identifiable},
    source_types::{CloudEventAttributes, SourceSpec},
};
use crate::derive::ConditionType;
use crate::error::Error;
use crate::{naming, resource::object_key};
use enumset::EnumSetType;
use k8s_openapi::api::core::v1::SecretKeySelector;
use knative_gcp_conditions::{ConditionAccessor, ConditionSet, ConditionType, Conditions};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use url::Url;

/// The conditions every Pub/Sub backed source depends on.
///
/// Sources with extra dependents declare their own [`ConditionType`] and
/// implement [`PubSubConditionType`] for it.
#[derive(ConditionType, EnumSetType, Deserialize, Serialize, Debug, JsonSchema)]
pub enum PubSubCondition {
    Ready,
    /// The pull subscription delivering messages to the sink exists.
    #[dependent]
    PullSubscriptionReady,
    /// The topic the source publishes to exists.
    #[dependent]
    TopicReady,
}

/// Check that a source's condition set still gates readiness on the Pub/Sub
/// resources backing it.
pub fn ensure_pubsub_dependents<C: PubSubConditionType>(set: &ConditionSet<C>) -> Result<(), Error> {
    for required in [C::pull_subscription_ready(), C::topic_ready()] {
        if !set.is_dependent(required) {
            return Err(Error::MissingDependent {
                kind: std::any::type_name::<C>(),
                condition: required.as_str(),
            });
        }
    }
    Ok(())
}

/// PubSubSpec defines the shared spec of every source backed by a Pub/Sub
/// topic and pull subscription.
#[derive(Serialize, Deserialize, Clone, Debug, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PubSubSpec {
    /// Sink and CloudEventOverrides
    #[serde(flatten)]
    pub source_spec: SourceSpec,
    /// Secret is the credential to use to create the Pub/Sub topic and
    /// subscription. If not specified, defaults to the identity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<SecretKeySelector>,
    /// Project is the ID of the Google Cloud Project that the topic and
    /// subscription will be created in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    #[serde(flatten)]
    pub identity_spec: IdentitySpec,
}

impl PubSubSpec {
    /// Whether moving from `previous` to this spec invalidates the provisioned
    /// topic and subscription.
    pub fn requires_reprovisioning(&self, previous: &PubSubSpec) -> bool {
        self.project != previous.project
            || self.secret != previous.secret
            || self.identity_spec != previous.identity_spec
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PubSubStatus<C: ConditionType> {
    /// inherits [`IdentityStatus`], which currently provides:
    /// * observed_generation
    /// * conditions
    /// * service_account_name
    #[serde(flatten)]
    pub identity_status: IdentityStatus<C>,
    /// SinkURI is the current active sink URI that has been configured for the
    /// Source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sink_uri: Option<Url>,
    /// CloudEventAttributes are the specific attributes that the Source uses
    /// as part of its CloudEvents.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloud_event_attributes: Option<Vec<CloudEventAttributes>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    /// Empty until the topic has been created, then stable until reprovisioned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic_id: Option<String>,
    /// Empty until the subscription has been created, then stable until reprovisioned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription_id: Option<String>,
}

impl<C: ConditionType> ConditionAccessor<C> for PubSubStatus<C> {
    fn conditions(&self) -> &Conditions<C> {
        self.identity_status.conditions()
    }

    fn conditions_mut(&mut self) -> &mut Conditions<C> {
        self.identity_status.conditions_mut()
    }
}

/// Records the outcome of provisioning the Pub/Sub resources on a
/// [`PubSubStatus`].
///
/// Prefer these methods over the `*_ready()` methods of
/// [`PubSubConditionManager`], which only touch the conditions.
pub trait ProvisioningManager<C: PubSubConditionType>: ConditionAccessor<C> {
    /// Return the [`PubSubStatus`] of your CRD Status type.
    fn pubsub_status(&mut self) -> &mut PubSubStatus<C>;

    /// Record the provisioned topic and mark it ready.
    fn mark_topic(&mut self, project_id: &str, topic_id: &str) -> Result<(), Error> {
        let status = self.pubsub_status();
        if let Some(current) = status.topic_id.as_deref().filter(|t| *t != topic_id) {
            return Err(Error::TopicConflict {
                current: current.to_string(),
                proposed: topic_id.to_string(),
            });
        }
        status.project_id = Some(project_id.to_string());
        status.topic_id = Some(topic_id.to_string());
        self.manager().mark_true(C::topic_ready());
        Ok(())
    }

    fn mark_no_topic(&mut self, reason: &str, message: Option<String>) {
        self.manager().mark_false(C::topic_ready(), reason, message);
    }

    /// Record the provisioned pull subscription and mark it ready.
    fn mark_subscription(&mut self, subscription_id: &str) -> Result<(), Error> {
        let status = self.pubsub_status();
        if let Some(current) = status
            .subscription_id
            .as_deref()
            .filter(|s| *s != subscription_id)
        {
            return Err(Error::SubscriptionConflict {
                current: current.to_string(),
                proposed: subscription_id.to_string(),
            });
        }
        status.subscription_id = Some(subscription_id.to_string());
        self.manager().mark_true(C::pull_subscription_ready());
        Ok(())
    }

    fn mark_no_subscription(&mut self, reason: &str, message: Option<String>) {
        self.manager()
            .mark_false(C::pull_subscription_ready(), reason, message);
    }

    fn mark_sink(&mut self, uri: Url) {
        self.pubsub_status().sink_uri = Some(uri);
    }

    /// Forget the provisioned topic and subscription so they can be created
    /// again, e.g. after the project or identity of the source changed.
    fn reprovision(&mut self, reason: &str, message: Option<String>) {
        let status = self.pubsub_status();
        tracing::warn!(
            topic = ?status.topic_id,
            subscription = ?status.subscription_id,
            reason,
            "reprovisioning pubsub resources"
        );
        status.project_id = None;
        status.topic_id = None;
        status.subscription_id = None;

        let mut manager = self.manager();
        manager.mark_unknown(C::topic_ready(), reason, message.clone());
        manager.mark_unknown(C::pull_subscription_ready(), reason, message);
    }
}

impl<C: PubSubConditionType> ProvisioningManager<C> for PubSubStatus<C> {
    fn pubsub_status(&mut self) -> &mut PubSubStatus<C> {
        self
    }
}

/// Resources backed by a Pub/Sub topic and pull subscription.
pub trait PubSubable: Identifiable {
    fn pubsub_spec(&self) -> &PubSubSpec;

    fn pubsub_spec_mut(&mut self) -> &mut PubSubSpec;

    /// `None` until a controller has written a status.
    fn pubsub_status(&self) -> Option<&PubSubStatus<Self::Condition>>;

    /// Creates an empty status if none exists yet.
    fn pubsub_status_mut(&mut self) -> &mut PubSubStatus<Self::Condition>;

    /// The topic owned by this resource.
    fn topic_name(&self) -> Result<String, Error> {
        let (namespace, name) = object_key(self)?;
        Ok(naming::topic_name(&Self::kind(&()), namespace, name))
    }

    /// The pull subscription owned by this resource.
    fn subscription_name(&self) -> Result<String, Error> {
        let (namespace, name) = object_key(self)?;
        Ok(naming::subscription_name(&Self::kind(&()), namespace, name))
    }
}
