//! Derive [`ConditionType`] on your own enums to describe which conditions gate the readiness of
//! a resource.
//!
//! The enum must contain exactly one `Ready` or `Succeeded` variant, the happy condition.
//! Variants marked `#[dependent]` must all be true for the happy condition to be true.
//!
//! ```ignore
//! #[derive(ConditionType, EnumSetType, Serialize, Deserialize, Debug, JsonSchema)]
//! pub enum StorageCondition {
//!     Ready,
//!     #[dependent]
//!     TopicReady,
//!     #[dependent]
//!     NotificationReady,
//! }
//! ```
//!
//! Besides the `ConditionType` implementation this generates a `StorageConditionType` trait with
//! a constructor per variant (`topic_ready()`), and a `StorageConditionManager` trait that gives
//! every `ConditionAccessor` `mark_topic_ready()`, `mark_topic_ready_with_reason()`,
//! `mark_not_topic_ready()` and `mark_topic_ready_unknown()`.
//!
//! [`ConditionType`]: ../knative_gcp_conditions/trait.ConditionType.html
use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput};

mod error;
mod inner;

pub(crate) const REQUIRED_VARIANTS: [&str; 2] = ["Ready", "Succeeded"];

#[proc_macro_derive(ConditionType, attributes(dependent))]
pub fn derive_condition_type(input: TokenStream) -> TokenStream {
    let ast = parse_macro_input!(input as DeriveInput);
    inner::inner_derive(ast).unwrap_or_else(|err| err.to_compile_error().into())
}
