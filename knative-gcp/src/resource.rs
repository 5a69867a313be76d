use crate::error::Error;
use knative_gcp_conditions::{ConditionSet, ConditionType, Conditions, ReadinessPhase};
use kube::core::GroupVersionKind;
use kube::Resource;

/// Exposes the static group, version and kind of a resource, used for owner
/// references and webhook routing.
pub trait GroupVersionKindExt {
    fn group_version_kind(&self) -> GroupVersionKind;
}

impl<R: Resource<DynamicType = ()>> GroupVersionKindExt for R {
    fn group_version_kind(&self) -> GroupVersionKind {
        GroupVersionKind {
            group: R::group(&()).into_owned(),
            version: R::version(&()).into_owned(),
            kind: R::kind(&()).into_owned(),
        }
    }
}

/// Kinds whose readiness is described by the conditions in their status.
pub trait ReadyResource: Resource<DynamicType = ()> {
    type Condition: ConditionType;

    /// `None` until a controller has written a status.
    fn status_conditions(&self) -> Option<&Conditions<Self::Condition>>;

    fn condition_set(&self) -> &'static ConditionSet<Self::Condition> {
        <Self::Condition as ConditionType>::condition_set()
    }

    /// Computed from the dependents on every call.
    fn is_ready(&self) -> bool {
        self.status_conditions()
            .map_or(false, |conditions| self.condition_set().is_happy(conditions))
    }

    fn phase(&self) -> ReadinessPhase {
        self.status_conditions()
            .map_or(ReadinessPhase::Unknown, |conditions| {
                self.condition_set().phase(conditions)
            })
    }
}

/// Returns the `(namespace, name)` of a namespaced resource.
pub fn object_key<R: Resource<DynamicType = ()> + ?Sized>(resource: &R) -> Result<(&str, &str), Error> {
    let meta = resource.meta();
    let missing = |field| Error::MissingMetadata {
        kind: R::kind(&()).into_owned(),
        field,
    };
    let namespace = meta.namespace.as_deref().ok_or_else(|| missing("namespace"))?;
    let name = meta.name.as_deref().ok_or_else(|| missing("name"))?;
    Ok((namespace, name))
}
