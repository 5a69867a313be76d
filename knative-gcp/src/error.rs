use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("{kind} is missing metadata.{field}")]
    MissingMetadata { kind: String, field: &'static str },
    /// Provisioned ids only change through an explicit reprovisioning.
    #[error("topic {current} is already provisioned, refusing to replace it with {proposed}")]
    TopicConflict { current: String, proposed: String },
    #[error("subscription {current} is already provisioned, refusing to replace it with {proposed}")]
    SubscriptionConflict { current: String, proposed: String },
    #[error("condition set of {kind} must depend on {condition}")]
    MissingDependent {
        kind: &'static str,
        condition: &'static str,
    },
    #[error("destination missing Ref and URI, expected at least one")]
    EmptyDestination,
}
