use crate::ConditionType;
use chrono::{DateTime, Utc};
use enumset::EnumSet;
use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::ops::Deref;

/// The state of a [`Condition`].
#[derive(Deserialize, Serialize, Clone, Copy, Debug, JsonSchema, PartialEq, Eq)]
pub enum ConditionStatus {
    True,
    False,
    Unknown,
}

impl Default for ConditionStatus {
    fn default() -> Self {
        ConditionStatus::Unknown
    }
}

#[derive(Deserialize, Serialize, Clone, Copy, Debug, JsonSchema, PartialEq, Eq)]
#[non_exhaustive]
/// The importance of a conditions status.
pub enum ConditionSeverity {
    Error,
    Warning,
    Info,
}

impl ConditionSeverity {
    pub fn is_err(&self) -> bool {
        *self == ConditionSeverity::Error
    }
}

impl Default for ConditionSeverity {
    fn default() -> Self {
        ConditionSeverity::Error
    }
}

/// The `type` of a [`Condition`].
///
/// Names that the [`ConditionType`] does not know about are kept verbatim in
/// [`ConditionName::Other`], so that documents written by a newer controller
/// survive a read-modify-write cycle.
#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, PartialEq, Eq)]
#[serde(untagged)]
pub enum ConditionName<C> {
    Known(C),
    Other(String),
}

impl<C: ConditionType> ConditionName<C> {
    /// Resolve a raw condition type name against `C`.
    pub fn parse(name: &str) -> Self {
        EnumSet::<C>::all()
            .iter()
            .find(|c| c.as_str() == name)
            .map(ConditionName::Known)
            .unwrap_or_else(|| ConditionName::Other(name.to_string()))
    }

    pub fn known(&self) -> Option<C> {
        match self {
            ConditionName::Known(c) => Some(*c),
            ConditionName::Other(_) => None,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ConditionName::Known(c) => c.as_str(),
            ConditionName::Other(name) => name,
        }
    }
}

impl<C: ConditionType> From<C> for ConditionName<C> {
    fn from(condition_type: C) -> Self {
        ConditionName::Known(condition_type)
    }
}

impl<C: ConditionType> fmt::Display for ConditionName<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A custom resource status condition.
#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Condition<C: ConditionType> {
    #[serde(rename = "type")]
    pub type_: ConditionName<C>,
    pub status: ConditionStatus,
    /// ConditionSeverityError specifies that a failure of a condition type
    /// should be viewed as an error.  As "Error" is the default for conditions
    /// we use the empty string (coupled with omitempty) to avoid confusion in
    /// the case where the condition is in state "True" (aka nothing is wrong).
    // In rust lang we accomplish this with Error as a Default variant
    #[serde(default)]
    #[serde(skip_serializing_if = "ConditionSeverity::is_err")]
    pub severity: ConditionSeverity,
    /// Set by [`Conditions`] whenever `status` changes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<C: ConditionType> Condition<C> {
    pub fn new(type_: impl Into<ConditionName<C>>, status: ConditionStatus) -> Self {
        Condition {
            type_: type_.into(),
            status,
            severity: ConditionSeverity::default(),
            last_transition_time: None,
            reason: None,
            message: None,
        }
    }

    pub fn with_reason(mut self, reason: Option<String>, message: Option<String>) -> Self {
        self.reason = reason;
        self.message = message;
        self
    }

    pub fn is_true(&self) -> bool {
        self.status == ConditionStatus::True
    }

    pub fn is_false(&self) -> bool {
        self.status == ConditionStatus::False
    }

    pub fn is_unknown(&self) -> bool {
        self.status == ConditionStatus::Unknown
    }
}

/// A [`Vec`] of [`Condition`] that holds at most one entry per type and
/// maintains transition times.
#[derive(Serialize, Clone, Debug, JsonSchema, PartialEq)]
pub struct Conditions<C: ConditionType>(Vec<Condition<C>>);

impl<C: ConditionType> Default for Conditions<C> {
    fn default() -> Self {
        Conditions(Vec::new())
    }
}

impl<C: ConditionType> Deref for Conditions<C> {
    type Target = [Condition<C>];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<C: ConditionType> FromIterator<Condition<C>> for Conditions<C> {
    fn from_iter<I: IntoIterator<Item = Condition<C>>>(iter: I) -> Self {
        let mut conditions: Vec<Condition<C>> = Vec::new();
        for condition in iter {
            if conditions.iter().any(|c| c.type_ == condition.type_) {
                tracing::debug!(condition = %condition.type_, "dropping duplicate condition");
                continue;
            }
            conditions.push(condition);
        }
        Conditions(conditions)
    }
}

impl<'de, C> Deserialize<'de> for Conditions<C>
where
    C: ConditionType + Deserialize<'de>,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let conditions = Vec::<Condition<C>>::deserialize(deserializer)?;
        Ok(conditions.into_iter().collect())
    }
}

impl<C: ConditionType> Conditions<C> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, condition_type: C) -> Option<&Condition<C>> {
        self.get_by_name(&ConditionName::Known(condition_type))
    }

    pub fn get_by_name(&self, name: &ConditionName<C>) -> Option<&Condition<C>> {
        self.0.iter().find(|c| c.type_ == *name)
    }

    /// Upsert a condition, returning whether its status transitioned.
    ///
    /// The stored `last_transition_time` is kept unless the status changes.
    pub(crate) fn set(&mut self, condition: Condition<C>) -> bool {
        let now = Utc::now();
        match self.0.iter_mut().find(|c| c.type_ == condition.type_) {
            Some(existing) if existing.status == condition.status => {
                existing.severity = condition.severity;
                existing.reason = condition.reason;
                existing.message = condition.message;
                existing.last_transition_time.get_or_insert(now);
                false
            }
            Some(existing) => {
                tracing::debug!(
                    condition = %condition.type_,
                    from = ?existing.status,
                    to = ?condition.status,
                    reason = ?condition.reason,
                    "condition transitioned"
                );
                *existing = Condition {
                    last_transition_time: Some(now),
                    ..condition
                };
                true
            }
            None => {
                tracing::debug!(
                    condition = %condition.type_,
                    to = ?condition.status,
                    reason = ?condition.reason,
                    "condition reported"
                );
                self.0.push(Condition {
                    last_transition_time: Some(now),
                    ..condition
                });
                true
            }
        }
    }
}
