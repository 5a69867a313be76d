pub mod destination;
pub mod identity_types;
pub mod pubsub_types;
pub mod source_types;
pub mod status_types;
