use enumset::EnumSetType;
use k8s_openapi::api::core::v1::SecretKeySelector;
use knative_gcp::{
    conditions::{ConditionAccessor, Conditions},
    derive::ConditionType,
    destination::Destination,
    error::Error,
    source_types::SourceSpec,
    status_types::Status,
    ReadyResource,
};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use url::Url;

pub use knative_gcp::naming::pubsub_event_source;

/// PullSubscription is the Schema for the pullsubscriptions API.
#[derive(CustomResource, Serialize, Deserialize, Debug, Clone, Default, JsonSchema)]
#[kube(
    kind = "PullSubscription",
    group = "pubsub.cloud.run",
    status = "PullSubscriptionStatus",
    version = "v1alpha1",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct PullSubscriptionSpec {
    /// This brings in CloudEventOverrides and Sink.
    #[serde(flatten)]
    pub source_spec: SourceSpec,
    /// Secret is the credential to use to create and poll the PullSubscription
    /// Subscription. The value of the secret entry must be a service account
    /// key in the JSON format (see https://cloud.google.com/iam/docs/creating-managing-service-account-keys).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<SecretKeySelector>,
    /// Project is the ID of the Google Cloud Project that the PullSubscription
    /// Topic exists in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    /// Topic is the ID of the PullSubscription Topic to Subscribe to. It must
    /// be in the form of the unique identifier within the project, not the
    /// entire name. E.g. it must be 'laconia', not
    /// 'projects/my-proj/topics/laconia'.
    pub topic: String,
    /// AckDeadline is the default maximum time after a subscriber receives a
    /// message before the subscriber should acknowledge the message. Defaults
    /// to 30 seconds ('30s').
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ack_deadline: Option<String>,
    /// RetainAckedMessages defines whether to retain acknowledged messages. If
    /// true, acknowledged messages will not be expunged until they fall out of
    /// the RetentionDuration window.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub retain_acked_messages: bool,
    /// RetentionDuration defines how long to retain messages in backlog, from
    /// the time of publish. If RetainAckedMessages is true, this duration
    /// affects the retention of acknowledged messages, otherwise only
    /// unacknowledged messages are retained. Cannot be longer than 7 days or
    /// shorter than 10 minutes. Defaults to 7 days ('7d').
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retention_duration: Option<String>,
    /// Transformer is a reference to an object that will resolve to a domain
    /// name or a URI directly to use as the transformer or a URI directly.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transformer: Option<Destination>,
    /// Mode defines the encoding and structure of the payload of when the
    /// PullSubscription invokes the sink.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<ModeType>,
}

/// How a received Pub/Sub message is handed to the sink.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, JsonSchema, PartialEq, Eq)]
pub enum ModeType {
    /// Sends binary encoded CloudEvents to the sink.
    CloudEventsBinary,
    /// Sends structured encoded CloudEvents to the sink.
    CloudEventsStructured,
    /// Sends CloudEvents to the sink in a format compatible with Pub/Sub push.
    PushCompatible,
}

#[derive(ConditionType, EnumSetType, Deserialize, Serialize, Debug, JsonSchema)]
pub enum PullSubscriptionCondition {
    /// True when the PullSubscription is ready to send events.
    Ready,
    /// The PullSubscription has a resolved sink URI.
    #[dependent]
    SinkProvided,
    /// The receive adapter has been deployed.
    #[dependent]
    Deployed,
    /// The subscription exists in Pub/Sub.
    #[dependent]
    Subscribed,
    /// Only reported when a transformer is configured.
    TransformerProvided,
}

/// Communicates the observed state of the [`PullSubscription`] (from the controller).
#[derive(Serialize, Deserialize, Clone, Debug, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PullSubscriptionStatus {
    /// inherits [`Status`], which currently provides:
    /// * observed_generation
    /// * conditions
    /// * annotations
    #[serde(flatten)]
    pub status: Status<PullSubscriptionCondition>,
    /// SinkURI is the current active sink URI that has been configured for the
    /// PullSubscription.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sink_uri: Option<Url>,
    /// TransformerURI is the current active transformer URI that has been
    /// configured for the PullSubscription.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transformer_uri: Option<Url>,
    /// ProjectID is the resolved project ID in use by the PullSubscription.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    /// SubscriptionID is the created subscription ID used by the PullSubscription.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription_id: Option<String>,
}

impl ConditionAccessor<PullSubscriptionCondition> for PullSubscriptionStatus {
    fn conditions(&self) -> &Conditions<PullSubscriptionCondition> {
        self.status.conditions()
    }

    fn conditions_mut(&mut self) -> &mut Conditions<PullSubscriptionCondition> {
        self.status.conditions_mut()
    }
}

impl PullSubscriptionStatus {
    pub fn mark_sink(&mut self, uri: Url) {
        self.sink_uri = Some(uri);
        self.manager().mark_true(PullSubscriptionCondition::SinkProvided);
    }

    /// Clears the sink URI, which is no longer valid.
    pub fn mark_no_sink(&mut self, reason: &str, message: Option<String>) {
        self.sink_uri = None;
        self.manager()
            .mark_false(PullSubscriptionCondition::SinkProvided, reason, message);
    }

    pub fn mark_transformer(&mut self, uri: Url) {
        self.transformer_uri = Some(uri);
        self.manager()
            .mark_true(PullSubscriptionCondition::TransformerProvided);
    }

    pub fn mark_no_transformer(&mut self, reason: &str, message: Option<String>) {
        self.transformer_uri = None;
        self.manager()
            .mark_false(PullSubscriptionCondition::TransformerProvided, reason, message);
    }

    /// Record the created subscription and mark it subscribed.
    ///
    /// The id never changes once set.
    pub fn mark_subscription(&mut self, subscription_id: &str) -> Result<(), Error> {
        if let Some(current) = self
            .subscription_id
            .as_deref()
            .filter(|s| *s != subscription_id)
        {
            return Err(Error::SubscriptionConflict {
                current: current.to_string(),
                proposed: subscription_id.to_string(),
            });
        }
        self.subscription_id = Some(subscription_id.to_string());
        self.manager().mark_true(PullSubscriptionCondition::Subscribed);
        Ok(())
    }

    pub fn mark_no_subscription(&mut self, reason: &str, message: Option<String>) {
        self.manager()
            .mark_false(PullSubscriptionCondition::Subscribed, reason, message);
    }
}

impl PullSubscription {
    /// The mode the receive adapter delivers in, `None` when unset.
    pub fn pubsub_mode(&self) -> Option<ModeType> {
        self.spec.mode
    }

    /// The CloudEvent `source` of messages received from the topic.
    ///
    /// Falls back to the project resolved by the controller when the spec
    /// leaves it empty.
    pub fn event_source(&self) -> Option<String> {
        let project = self
            .spec
            .project
            .as_deref()
            .or_else(|| self.status.as_ref()?.project_id.as_deref())?;
        Some(pubsub_event_source(project, &self.spec.topic))
    }
}

impl ReadyResource for PullSubscription {
    type Condition = PullSubscriptionCondition;

    fn status_conditions(&self) -> Option<&Conditions<PullSubscriptionCondition>> {
        self.status.as_ref().map(|s| s.conditions())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use knative_gcp::conditions::{ConditionSeverity, ReadinessPhase};
    use knative_gcp::GroupVersionKindExt;
    use std::fs;

    fn read_mock(filename: &str) -> PullSubscription {
        let path = format!("{}/../test/mock/{}", env!("CARGO_MANIFEST_DIR"), filename);
        let yaml = fs::read_to_string(path).expect("path to mock");
        serde_yaml::from_str(&yaml).unwrap()
    }

    #[test]
    fn pubsub_event_source_format() {
        assert_eq!(
            pubsub_event_source("PROJECT", "TOPIC"),
            "//pubsub.googleapis.com/PROJECT/topics/TOPIC"
        );
    }

    #[test]
    fn group_version_kind() {
        let pull = PullSubscription::new("", PullSubscriptionSpec::default());
        let gvk = pull.group_version_kind();
        assert_eq!(
            (gvk.group.as_str(), gvk.version.as_str(), gvk.kind.as_str()),
            ("pubsub.cloud.run", "v1alpha1", "PullSubscription")
        );
    }

    #[test]
    fn pubsub_mode_unset() {
        let pull = PullSubscription::new("", PullSubscriptionSpec::default());
        assert_eq!(pull.pubsub_mode(), None);
        assert_eq!(pull.event_source(), None);
        assert!(!pull.is_ready());
        assert_eq!(pull.phase(), ReadinessPhase::Unknown);
    }

    #[test]
    fn lifecycle() {
        let mut status = PullSubscriptionStatus::default();
        assert_eq!(status.phase(), ReadinessPhase::Unknown);

        status.mark_sink("http://sink".parse().unwrap());
        status.mark_deployed();
        let ready = status.get_top_level_condition().unwrap();
        assert!(ready.is_unknown());
        assert_eq!(ready.reason.as_deref(), Some("Subscribed"));

        status.mark_subscription("sub").unwrap();
        assert!(status.is_ready());
        assert!(status.mark_subscription("other").is_err());
        assert_eq!(status.subscription_id.as_deref(), Some("sub"));

        // a missing transformer never gates readiness
        status.mark_no_transformer("TransformerNotFound", None);
        assert!(status.is_ready());
        let transformer = status
            .get_condition(PullSubscriptionCondition::TransformerProvided)
            .unwrap();
        assert_eq!(transformer.severity, ConditionSeverity::Info);

        status.mark_no_sink("SinkNotFound", Some("sink was deleted".into()));
        assert_eq!(status.sink_uri, None);
        assert_eq!(status.phase(), ReadinessPhase::Failed);
        let ready = status.get_top_level_condition().unwrap();
        assert_eq!(ready.reason.as_deref(), Some("SinkNotFound"));
    }

    #[test]
    fn deserializes_from_yaml() {
        let pull = read_mock("pullsubscription.yaml");
        assert_eq!(pull.pubsub_mode(), Some(ModeType::CloudEventsStructured));
        assert_eq!(pull.spec.topic, "TOPIC");
        assert_eq!(pull.spec.ack_deadline.as_deref(), Some("30s"));
        assert_eq!(pull.spec.retention_duration.as_deref(), Some("24h"));
        assert!(pull.spec.retain_acked_messages);
        assert_eq!(pull.spec.secret.as_ref().map(|s| s.key.as_str()), Some("key.json"));
        assert_eq!(
            pull.event_source().as_deref(),
            Some("//pubsub.googleapis.com/PROJECT/topics/TOPIC")
        );
        assert!(!pull.is_ready());

        let value = serde_json::to_value(&pull.spec).unwrap();
        assert_eq!(value["retainAckedMessages"], true);
        assert_eq!(value["mode"], "CloudEventsStructured");
        assert_eq!(value["sink"]["uri"], "http://event-display.default.svc.cluster.local/");
    }

    #[test]
    fn event_source_falls_back_to_resolved_project() {
        let mut pull = PullSubscription::new("pull", PullSubscriptionSpec {
            topic: "TOPIC".into(),
            ..Default::default()
        });
        pull.status = Some(PullSubscriptionStatus {
            project_id: Some("resolved".into()),
            ..Default::default()
        });
        assert_eq!(
            pull.event_source().as_deref(),
            Some("//pubsub.googleapis.com/resolved/topics/TOPIC")
        );

        let value = serde_json::to_value(pull.spec).unwrap();
        assert!(value.get("retainAckedMessages").is_none());
        assert!(value.get("mode").is_none());
    }
}
