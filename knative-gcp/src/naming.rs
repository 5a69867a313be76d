//! Names of the external objects backing a source.
//!
//! Every function here is pure, so repeated reconciles of the same resource
//! always address the same topic and subscription.

pub const PUBSUB_DOMAIN: &str = "pubsub.googleapis.com";
pub const STORAGE_DOMAIN: &str = "storage.googleapis.com";

const TOPIC_PREFIX: &str = "cre-src";
const SUBSCRIPTION_PREFIX: &str = "cre-pull";

/// The CloudEvent `source` of messages published to a Pub/Sub topic.
pub fn pubsub_event_source(project: &str, topic: &str) -> String {
    format!("//{PUBSUB_DOMAIN}/{project}/topics/{topic}")
}

/// The CloudEvent `source` of notifications from a Cloud Storage bucket.
pub fn storage_event_source(bucket: &str) -> String {
    format!("//{STORAGE_DOMAIN}/buckets/{bucket}")
}

/// Kubernetes kinds, namespaces and names never contain `_`, so joining on it
/// keeps names from different kinds apart.
fn generate_name(prefix: &str, kind: &str, namespace: &str, name: &str) -> String {
    format!("{prefix}_{}_{namespace}_{name}", kind.to_lowercase())
}

/// The Pub/Sub topic owned by the source `kind` `namespace/name`.
pub fn topic_name(kind: &str, namespace: &str, name: &str) -> String {
    generate_name(TOPIC_PREFIX, kind, namespace, name)
}

/// The Pub/Sub pull subscription owned by the source `kind` `namespace/name`.
pub fn subscription_name(kind: &str, namespace: &str, name: &str) -> String {
    generate_name(SUBSCRIPTION_PREFIX, kind, namespace, name)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn pubsub_event_source_format() {
        assert_eq!(
            pubsub_event_source("PROJECT", "TOPIC"),
            "//pubsub.googleapis.com/PROJECT/topics/TOPIC"
        );
    }

    #[test]
    fn storage_event_source_format() {
        assert_eq!(
            storage_event_source("my-bucket"),
            "//storage.googleapis.com/buckets/my-bucket"
        );
    }

    #[test]
    fn names_are_namespaced_by_kind() {
        let storage = topic_name("CloudStorageSource", "default", "source");
        assert_eq!(storage, "cre-src_cloudstoragesource_default_source");
        assert_eq!(storage, topic_name("CloudStorageSource", "default", "source"));
        assert_ne!(storage, topic_name("CloudPubSubSource", "default", "source"));
        assert_ne!(
            topic_name("CloudStorageSource", "a-b", "c"),
            topic_name("CloudStorageSource", "a", "b-c")
        );
        assert_eq!(
            subscription_name("CloudStorageSource", "default", "source"),
            "cre-pull_cloudstoragesource_default_source"
        );
    }
}
