pub mod events;
pub mod pubsub;
