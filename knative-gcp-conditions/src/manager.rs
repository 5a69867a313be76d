use crate::{
    Condition, ConditionName, ConditionSet, ConditionStatus, ConditionType, Conditions,
    ReadinessPhase,
};
use enumset::EnumSet;
use std::borrow::Cow;

/// Mutates [`Conditions`] in accordance with the dependency chain defined by a
/// [`ConditionSet`], recomputing the happy condition after every change.
///
/// Callers are expected to hold at most one manager per resource at a time;
/// the borrow checker already enforces this for a single status value.
pub struct ConditionManager<'a, C>
where
    C: ConditionType,
{
    set: &'a ConditionSet<C>,
    conditions: &'a mut Conditions<C>,
}

impl<'a, C> ConditionManager<'a, C>
where
    C: ConditionType,
{
    pub fn new(set: &'a ConditionSet<C>, conditions: &'a mut Conditions<C>) -> Self {
        ConditionManager { set, conditions }
    }

    pub fn condition_set(&self) -> &ConditionSet<C> {
        self.set
    }

    pub fn conditions(&self) -> &Conditions<C> {
        self.conditions
    }

    /// Returns the stored condition, or `None` if it has not been reported yet.
    /// The happy condition is computed, see [`ConditionSet::get`].
    pub fn get_condition(&self, condition_type: C) -> Option<Cow<'_, Condition<C>>> {
        self.set.get(self.conditions, condition_type)
    }

    /// Returns the happy [`Condition`] as the dependents describe it.
    pub fn get_top_level_condition(&self) -> Option<Cow<'_, Condition<C>>> {
        self.get_condition(self.set.happy())
    }

    pub fn is_happy(&self) -> bool {
        self.set.is_happy(self.conditions)
    }

    pub fn phase(&self) -> ReadinessPhase {
        self.set.phase(self.conditions)
    }

    /// Upsert a condition and recompute the happy condition.
    ///
    /// Writes to the happy condition itself are ignored: it only ever
    /// reflects the dependents.
    pub fn set_condition(
        &mut self,
        condition_type: C,
        status: ConditionStatus,
        reason: Option<&str>,
        message: Option<String>,
    ) {
        if condition_type == self.set.happy() {
            tracing::warn!(
                condition = condition_type.as_str(),
                ?status,
                "ignoring direct update of the happy condition"
            );
        } else {
            self.store(ConditionName::Known(condition_type), status, reason, message);
        }
        self.recompute();
    }

    /// Upsert a condition by its raw type name.
    ///
    /// Names unknown to `C` are stored as informational conditions and never
    /// take part in readiness.
    pub fn set_other(
        &mut self,
        name: &str,
        status: ConditionStatus,
        reason: Option<&str>,
        message: Option<String>,
    ) {
        match ConditionName::<C>::parse(name) {
            ConditionName::Known(condition_type) => {
                self.set_condition(condition_type, status, reason, message)
            }
            other => {
                self.store(other, status, reason, message);
                self.recompute();
            }
        }
    }

    pub fn mark_true(&mut self, condition_type: C) {
        self.set_condition(condition_type, ConditionStatus::True, None, None)
    }

    pub fn mark_true_with_reason(
        &mut self,
        condition_type: C,
        reason: &str,
        message: Option<String>,
    ) {
        self.set_condition(condition_type, ConditionStatus::True, Some(reason), message)
    }

    /// Set the status of the condition type to false. If the type is a
    /// dependent the happy condition turns false as well, unless an earlier
    /// dependent already explains the failure.
    pub fn mark_false(&mut self, condition_type: C, reason: &str, message: Option<String>) {
        self.set_condition(condition_type, ConditionStatus::False, Some(reason), message)
    }

    pub fn mark_unknown(&mut self, condition_type: C, reason: &str, message: Option<String>) {
        self.set_condition(condition_type, ConditionStatus::Unknown, Some(reason), message)
    }

    /// Write the aggregate of the dependents into the happy condition.
    pub fn recompute(&mut self) {
        let aggregate = self.set.aggregate(self.conditions);
        self.conditions.set(aggregate);
    }

    /// Dependents with a stored condition, whatever their status.
    pub fn reported_dependents(&self) -> EnumSet<C> {
        self.set
            .dependents()
            .iter()
            .copied()
            .filter(|d| self.conditions.get(*d).is_some())
            .collect()
    }

    /// Dependents that currently hold the happy condition back, including
    /// those that have not been reported.
    pub fn unhappy_dependents(&self) -> EnumSet<C> {
        self.set
            .dependents()
            .iter()
            .copied()
            .filter(|d| !self.conditions.get(*d).map_or(false, Condition::is_true))
            .collect()
    }

    /// Conditions that do not take part in readiness.
    pub fn informational(&self) -> impl Iterator<Item = &Condition<C>> + '_ {
        let set = self.set;
        self.conditions
            .iter()
            .filter(move |c| !c.type_.known().map_or(false, |t| set.is_terminal(t)))
    }

    fn store(
        &mut self,
        name: ConditionName<C>,
        status: ConditionStatus,
        reason: Option<&str>,
        message: Option<String>,
    ) {
        let severity = self.set.severity(&name);
        let condition = Condition {
            severity,
            ..Condition::new(name, status).with_reason(reason.map(str::to_string), message)
        };
        self.conditions.set(condition);
    }
}
