use enumset::EnumSetType;
use knative_gcp::{
    conditions::{ConditionAccessor, Conditions},
    derive::ConditionType,
    identity_types::{IdentitySpec, IdentityStatus, Identifiable},
    naming,
    pubsub_types::{
        ProvisioningManager, PubSubConditionType, PubSubSpec, PubSubStatus, PubSubable,
    },
    ReadyResource,
};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Sent when a new object (or a new generation of an existing object) is
/// successfully created in the bucket.
pub const CLOUD_STORAGE_SOURCE_FINALIZE: &str = "com.google.cloud.storage.object.finalize";
/// Sent when an object has been permanently deleted.
pub const CLOUD_STORAGE_SOURCE_DELETE: &str = "com.google.cloud.storage.object.delete";
/// Sent when the live version of an object is archived or deleted.
pub const CLOUD_STORAGE_SOURCE_ARCHIVE: &str = "com.google.cloud.storage.object.archive";
/// Sent when the metadata of an existing object changes.
pub const CLOUD_STORAGE_SOURCE_METADATA_UPDATE: &str =
    "com.google.cloud.storage.object.metadataUpdate";

/// The payload is the JSON representation of the object.
pub const PAYLOAD_FORMAT_JSON_API_V1: &str = "JSON_API_V1";
/// No payload is included with the notification.
pub const PAYLOAD_FORMAT_NONE: &str = "NONE";

/// CloudStorageSource delivers Cloud Storage bucket notifications to a sink as CloudEvents.
#[derive(CustomResource, Serialize, Deserialize, Debug, Clone, JsonSchema)]
#[kube(
    kind = "CloudStorageSource",
    group = "events.cloud.google.com",
    status = "CloudStorageSourceStatus",
    version = "v1alpha1",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct CloudStorageSourceSpec {
    /// This brings in the PubSub based Source Specs. Includes:
    /// Sink, CloudEventOverrides, Secret, Project and GoogleServiceAccount
    #[serde(flatten)]
    pub pubsub_spec: PubSubSpec,
    /// Bucket to subscribe to.
    pub bucket: String,
    /// EventTypes to subscribe to. If unspecified, then subscribe to all events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_types: Option<Vec<String>>,
    /// ObjectNamePrefix limits the notifications to objects with this prefix
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_name_prefix: Option<String>,
    /// PayloadFormat specifies the contents of the message payload.
    /// See https://cloud.google.com/storage/docs/pubsub-notifications#payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload_format: Option<String>,
}

impl CloudStorageSourceSpec {
    /// Whether notifications of `event_type` are requested.
    pub fn subscribes_to(&self, event_type: &str) -> bool {
        match self.event_types.as_deref() {
            None | Some([]) => true,
            Some(types) => types.iter().any(|t| t == event_type),
        }
    }

    /// The CloudEvent `source` of events emitted for the bucket.
    pub fn event_source(&self) -> String {
        naming::storage_event_source(&self.bucket)
    }
}

#[derive(ConditionType, EnumSetType, Deserialize, Serialize, Debug, JsonSchema)]
pub enum CloudStorageSourceCondition {
    /// True when the CloudStorageSource is ready to send events.
    Ready,
    #[dependent]
    PullSubscriptionReady,
    #[dependent]
    TopicReady,
    /// True when GCS has been configured properly to send Notification events.
    #[dependent]
    NotificationReady,
}

impl PubSubConditionType for CloudStorageSourceCondition {
    fn pull_subscription_ready() -> Self {
        CloudStorageSourceCondition::PullSubscriptionReady
    }

    fn topic_ready() -> Self {
        CloudStorageSourceCondition::TopicReady
    }
}

/// Communicates the observed state of the [`CloudStorageSource`] (from the controller).
#[derive(Serialize, Deserialize, Debug, Clone, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CloudStorageSourceStatus {
    /// This brings in the Status for our GCP PubSub event sources:
    /// * observed_generation
    /// * conditions
    /// * service_account_name
    /// * sink_uri, project_id, topic_id and subscription_id
    #[serde(flatten)]
    pub pubsub_status: PubSubStatus<CloudStorageSourceCondition>,
    /// NotificationID is the ID that GCS identifies this notification as.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification_id: Option<String>,
}

impl ConditionAccessor<CloudStorageSourceCondition> for CloudStorageSourceStatus {
    fn conditions(&self) -> &Conditions<CloudStorageSourceCondition> {
        self.pubsub_status.conditions()
    }

    fn conditions_mut(&mut self) -> &mut Conditions<CloudStorageSourceCondition> {
        self.pubsub_status.conditions_mut()
    }
}

impl ProvisioningManager<CloudStorageSourceCondition> for CloudStorageSourceStatus {
    fn pubsub_status(&mut self) -> &mut PubSubStatus<CloudStorageSourceCondition> {
        &mut self.pubsub_status
    }
}

impl CloudStorageSourceStatus {
    /// Record the notification GCS created for the bucket.
    pub fn mark_notification(&mut self, notification_id: &str) {
        self.notification_id = Some(notification_id.to_string());
        self.manager()
            .mark_true(CloudStorageSourceCondition::NotificationReady);
    }

    pub fn mark_no_notification(&mut self, reason: &str, message: Option<String>) {
        self.manager()
            .mark_false(CloudStorageSourceCondition::NotificationReady, reason, message);
    }
}

impl ReadyResource for CloudStorageSource {
    type Condition = CloudStorageSourceCondition;

    fn status_conditions(&self) -> Option<&Conditions<CloudStorageSourceCondition>> {
        self.status.as_ref().map(|s| s.conditions())
    }
}

impl Identifiable for CloudStorageSource {
    fn identity_spec(&self) -> &IdentitySpec {
        &self.spec.pubsub_spec.identity_spec
    }

    fn identity_spec_mut(&mut self) -> &mut IdentitySpec {
        &mut self.spec.pubsub_spec.identity_spec
    }

    fn identity_status(&self) -> Option<&IdentityStatus<CloudStorageSourceCondition>> {
        self.pubsub_status().map(|s| &s.identity_status)
    }

    fn identity_status_mut(&mut self) -> &mut IdentityStatus<CloudStorageSourceCondition> {
        &mut self.pubsub_status_mut().identity_status
    }
}

impl PubSubable for CloudStorageSource {
    fn pubsub_spec(&self) -> &PubSubSpec {
        &self.spec.pubsub_spec
    }

    fn pubsub_spec_mut(&mut self) -> &mut PubSubSpec {
        &mut self.spec.pubsub_spec
    }

    fn pubsub_status(&self) -> Option<&PubSubStatus<CloudStorageSourceCondition>> {
        self.status.as_ref().map(|s| &s.pubsub_status)
    }

    fn pubsub_status_mut(&mut self) -> &mut PubSubStatus<CloudStorageSourceCondition> {
        &mut self.status.get_or_insert_with(Default::default).pubsub_status
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use knative_gcp::conditions::{ConditionStatus, ConditionType as _, ReadinessPhase};
    use knative_gcp::pubsub_types::ensure_pubsub_dependents;
    use knative_gcp::GroupVersionKindExt;
    use std::fs;

    fn read_mock(filename: &str) -> CloudStorageSource {
        let path = format!("{}/../test/mock/{}", env!("CARGO_MANIFEST_DIR"), filename);
        let yaml = fs::read_to_string(path).expect("path to mock");
        serde_yaml::from_str(&yaml).unwrap()
    }

    fn storage_source() -> CloudStorageSource {
        let mut source = CloudStorageSource::new("storage-source", CloudStorageSourceSpec {
            pubsub_spec: PubSubSpec::default(),
            bucket: "my-bucket".into(),
            event_types: None,
            object_name_prefix: None,
            payload_format: None,
        });
        source.metadata.namespace = Some("default".into());
        source
    }

    #[test]
    fn group_version_kind() {
        let gvk = storage_source().group_version_kind();
        assert_eq!(gvk.group, "events.cloud.google.com");
        assert_eq!(gvk.version, "v1alpha1");
        assert_eq!(gvk.kind, "CloudStorageSource");
    }

    #[test]
    fn condition_set_extends_pubsub() {
        let source = storage_source();
        let set = source.condition_set();
        assert_eq!(set.happy(), CloudStorageSourceCondition::Ready);
        assert_eq!(
            set.dependents(),
            &[
                CloudStorageSourceCondition::PullSubscriptionReady,
                CloudStorageSourceCondition::TopicReady,
                CloudStorageSourceCondition::NotificationReady,
            ]
        );
        assert_eq!(ensure_pubsub_dependents(set), Ok(()));
    }

    #[test]
    fn lifecycle() {
        let mut source = storage_source();
        assert!(!source.is_ready());
        assert!(source.status.is_none());

        let status = source.status.get_or_insert_with(Default::default);
        assert_eq!(status.phase(), ReadinessPhase::Unknown);

        status.mark_topic("my-project", "topic").unwrap();
        let ready = status.get_top_level_condition().unwrap();
        assert_eq!(ready.status, ConditionStatus::Unknown);
        assert_eq!(ready.reason.as_deref(), Some("PullSubscriptionReady"));
        assert_eq!(status.phase(), ReadinessPhase::InProgress);

        status.mark_subscription("subscription").unwrap();
        status.mark_no_notification(
            "NotificationFailed",
            Some("permission denied on bucket".into()),
        );
        let ready = status.get_top_level_condition().unwrap();
        assert_eq!(ready.status, ConditionStatus::False);
        assert_eq!(ready.reason.as_deref(), Some("NotificationFailed"));
        assert_eq!(ready.message.as_deref(), Some("permission denied on bucket"));
        assert_eq!(status.phase(), ReadinessPhase::Failed);

        status.mark_notification("17");
        assert_eq!(status.notification_id.as_deref(), Some("17"));
        assert_eq!(status.phase(), ReadinessPhase::Ready);
        assert!(source.is_ready());
    }

    #[test]
    fn capabilities_alias_the_resource() {
        let mut source = storage_source();
        source.identity_spec_mut().google_service_account = Some("gsa".into());
        assert_eq!(
            source.spec.pubsub_spec.identity_spec.google_service_account.as_deref(),
            Some("gsa")
        );

        source.identity_status_mut().mark_identity_bound("ksa");
        source.pubsub_status_mut().topic_id = Some("topic".into());
        let status = source.status.as_ref().unwrap();
        assert_eq!(
            status.pubsub_status.identity_status.service_account_name.as_deref(),
            Some("ksa")
        );
        assert_eq!(status.pubsub_status.topic_id.as_deref(), Some("topic"));
        assert_eq!(
            source.topic_name().unwrap(),
            "cre-src_cloudstoragesource_default_storage-source"
        );
    }

    #[test]
    fn deserializes_from_yaml() {
        let source = read_mock("cloudstoragesource.yaml");
        let spec = &source.spec;
        assert_eq!(spec.bucket, "my-bucket");
        assert_eq!(spec.object_name_prefix.as_deref(), Some("uploads/"));
        assert_eq!(spec.payload_format.as_deref(), Some(PAYLOAD_FORMAT_JSON_API_V1));
        assert!(spec.subscribes_to(CLOUD_STORAGE_SOURCE_DELETE));
        assert!(!spec.subscribes_to(CLOUD_STORAGE_SOURCE_ARCHIVE));
        assert_eq!(spec.event_source(), "//storage.googleapis.com/buckets/my-bucket");
        assert_eq!(spec.pubsub_spec.project.as_deref(), Some("my-project"));
        assert!(spec.pubsub_spec.source_spec.sink.is_some());

        assert!(source.is_ready());
        let status = source.status.as_ref().unwrap();
        assert_eq!(status.notification_id.as_deref(), Some("17"));
        assert_eq!(status.pubsub_status.identity_status.status.observed_generation, Some(3));
        assert_eq!(
            status.pubsub_status.topic_id.as_deref(),
            source.topic_name().ok().as_deref()
        );
        // conditions from newer controllers are kept but ignored
        assert_eq!(status.conditions().len(), 5);
        assert_eq!(status.conditions()[4].type_.to_string(), "SchedulerReady");
    }

    #[test]
    fn serializes_wire_field_names() {
        let mut source = read_mock("cloudstoragesource.yaml");
        let status = source.status.as_mut().unwrap();
        status.mark_no_notification("NotificationDeleted", None);

        let value = serde_json::to_value(&source).unwrap();
        let spec = &value["spec"];
        assert_eq!(spec["bucket"], "my-bucket");
        assert_eq!(spec["eventTypes"][0], CLOUD_STORAGE_SOURCE_FINALIZE);
        assert_eq!(spec["objectNamePrefix"], "uploads/");
        assert_eq!(spec["payloadFormat"], "JSON_API_V1");
        assert_eq!(spec["project"], "my-project");
        assert_eq!(spec["ceOverrides"]["extensions"]["team"], "storage");
        assert_eq!(spec["sink"]["ref"]["kind"], "Service");

        let status = &value["status"];
        assert_eq!(status["notificationId"], "17");
        assert_eq!(status["sinkUri"], "http://event-display.default.svc.cluster.local/");
        assert_eq!(status["projectId"], "my-project");
        assert_eq!(status["subscriptionId"], "cre-pull_cloudstoragesource_default_storage-source");
        assert_eq!(status["serviceAccountName"], "storage-source-ksa");
        assert_eq!(status["conditions"][0]["type"], "Ready");
        assert_eq!(status["conditions"][0]["status"], "False");
        assert_eq!(status["conditions"][0]["reason"], "NotificationDeleted");
        // untouched conditions keep their transition time
        assert_eq!(status["conditions"][2]["lastTransitionTime"], "2022-06-01T11:57:00Z");
        assert_eq!(status["conditions"][4]["reason"], "NotConfigured");
    }

    #[test]
    fn ready_follows_dependents_not_the_stored_value() {
        let source: CloudStorageSource = serde_yaml::from_str(
            r#"
apiVersion: events.cloud.google.com/v1alpha1
kind: CloudStorageSource
metadata:
  name: storage-source
  namespace: default
spec:
  bucket: my-bucket
status:
  conditions:
    - type: Ready
      status: "True"
    - type: PullSubscriptionReady
      status: "True"
    - type: TopicReady
      status: "True"
    - type: NotificationReady
      status: "False"
      reason: NotificationDeleted
"#,
        )
        .unwrap();
        assert!(!source.is_ready());

        let status = source.status.as_ref().unwrap();
        assert_eq!(status.phase(), ReadinessPhase::Failed);
        let ready = status.get_top_level_condition().unwrap();
        assert_eq!(ready.status, ConditionStatus::False);
        assert_eq!(ready.reason.as_deref(), Some("NotificationDeleted"));
    }

    #[test]
    fn condition_names() {
        assert_eq!(CloudStorageSourceCondition::NotificationReady.as_str(), "NotificationReady");
        assert_eq!(
            CloudStorageSourceCondition::condition_set().happy(),
            CloudStorageSourceCondition::Ready
        );
    }
}
