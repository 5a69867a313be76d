use crate::error::Error;
use k8s_openapi::api::core::v1::ObjectReference;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use url::Url;

/// Destination represents a target of an invocation over HTTP.
#[derive(Deserialize, Serialize, Clone, Debug, Default, JsonSchema, PartialEq)]
pub struct Destination {
    /// Ref points to an Addressable.
    #[serde(rename = "ref", default, skip_serializing_if = "Option::is_none")]
    pub ref_: Option<KReference>,
    /// URI can be an absolute URL(non-empty scheme and non-empty host) pointing to the target or a relative URI.
    /// Relative URIs will be resolved using the base URI retrieved from Ref.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<Url>,
}

impl Destination {
    /// Returns the URI if it can be used without resolving `ref`, `None` if
    /// the Addressable behind `ref` must be resolved first.
    pub fn direct_uri(&self) -> Result<Option<&Url>, Error> {
        match (&self.ref_, &self.uri) {
            (Some(_), _) => Ok(None),
            (None, Some(uri)) => Ok(Some(uri)),
            (None, None) => Err(Error::EmptyDestination),
        }
    }
}

impl From<KReference> for Destination {
    fn from(reference: KReference) -> Self {
        Destination {
            ref_: Some(reference.normalized()),
            uri: None,
        }
    }
}

impl From<Url> for Destination {
    fn from(uri: Url) -> Self {
        Destination {
            ref_: None,
            uri: Some(uri),
        }
    }
}

/// KReference contains enough information to refer to another object.
/// It's a trimmed down version of corev1.ObjectReference.
#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct KReference {
    /// Kind of the referent.
    pub kind: String,
    /// Namespace of the referent, defaulted to the namespace of the object
    /// holding it if left out.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    /// Name of the referent.
    pub name: String,
    /// API version of the referent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    /// Group of the API, without the version of the group. An alternative to
    /// the APIVersion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

impl KReference {
    /// Fold `group` into `api_version`, handling the case that this was done already.
    pub fn normalized(self) -> KReference {
        let api_version = match (self.api_version, self.group) {
            (Some(api_version), _) if api_version.contains('/') => Some(api_version),
            (Some(api_version), Some(group)) => Some(group + "/" + &api_version),
            (Some(api_version), None) => Some(api_version),
            (None, _) => None,
        };
        KReference {
            api_version,
            group: None,
            ..self
        }
    }
}

impl From<KReference> for ObjectReference {
    fn from(reference: KReference) -> ObjectReference {
        ObjectReference {
            name: Some(reference.name),
            namespace: reference.namespace,
            api_version: reference.api_version,
            kind: Some(reference.kind),
            ..Default::default()
        }
    }
}
