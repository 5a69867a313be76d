//! Status conditions for resources whose readiness depends on several
//! independently reported sub-resources.
//!
//! A [`ConditionSet`] names one happy condition (`Ready` or `Succeeded`) and the
//! dependent conditions that gate it. The happy condition is never trusted as
//! stored: reads compute it from the dependents, and a [`ConditionManager`]
//! writes the result back after every update.
use enumset::{EnumSet, EnumSetType};
use std::borrow::Cow;
use std::fmt::Debug;
use thiserror::Error;

mod condition;
mod manager;

pub use condition::{Condition, ConditionName, ConditionSeverity, ConditionStatus, Conditions};
pub use manager::ConditionManager;

/// Enums that implement [`ConditionType`] can be used to differentiate [`Condition`]
/// and describe the state of the resource.
///
/// Usually derived with `#[derive(ConditionType)]`.
pub trait ConditionType: EnumSetType + Default + Debug + Send + Sync + 'static {
    /// The top-level variant that determines overall readiness of the resource.
    fn happy() -> Self;
    /// Variants that must be true to consider the happy condition true, in
    /// the order they are consulted.
    fn dependents() -> &'static [Self];
    /// The name of the variant on the wire.
    fn as_str(&self) -> &'static str;
    /// The process-wide [`ConditionSet`] of this type.
    fn condition_set() -> &'static ConditionSet<Self>;
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionSetError {
    #[error("dependents may not contain the happy condition {0}")]
    HappyIsDependent(&'static str),
    #[error("dependent {0} is listed more than once")]
    DuplicateDependent(&'static str),
}

/// Coarse lifecycle of a resource, derived from its stored conditions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReadinessPhase {
    /// No dependent has been reported yet.
    Unknown,
    /// Nothing has failed but not every dependent is true.
    InProgress,
    Ready,
    Failed,
}

/// Defines how the variants of a [`ConditionType`]
/// depend on one another.
#[derive(Clone, Debug, PartialEq)]
pub struct ConditionSet<C: ConditionType> {
    happy: C,
    dependents: Vec<C>,
    terminal: EnumSet<C>,
}

impl<C: ConditionType> ConditionSet<C> {
    pub fn new(happy: C, dependents: &[C]) -> Result<Self, ConditionSetError> {
        let mut terminal = EnumSet::new();
        for dependent in dependents {
            if *dependent == happy {
                return Err(ConditionSetError::HappyIsDependent(happy.as_str()));
            }
            if !terminal.insert(*dependent) {
                return Err(ConditionSetError::DuplicateDependent(dependent.as_str()));
            }
        }
        terminal.insert(happy);

        Ok(ConditionSet {
            happy,
            dependents: dependents.to_vec(),
            terminal,
        })
    }

    /// Build the set declared by `C` itself.
    ///
    /// ### Panic
    /// *Panics* if `C` declares its happy condition as a dependent.
    pub fn from_type() -> Self {
        Self::new(C::happy(), C::dependents()).unwrap_or_else(|err| {
            panic!("invalid ConditionType {}: {err}", std::any::type_name::<C>())
        })
    }

    pub fn happy(&self) -> C {
        self.happy
    }

    pub fn dependents(&self) -> &[C] {
        &self.dependents
    }

    pub fn is_dependent(&self, condition_type: C) -> bool {
        condition_type != self.happy && self.terminal.contains(condition_type)
    }

    /// Whether the [`ConditionType`] determines happiness.
    pub fn is_terminal(&self, condition_type: C) -> bool {
        self.terminal.contains(condition_type)
    }

    pub fn severity(&self, name: &ConditionName<C>) -> ConditionSeverity {
        match name.known() {
            Some(condition_type) if self.is_terminal(condition_type) => ConditionSeverity::Error,
            _ => ConditionSeverity::Info,
        }
    }

    /// Compute the happy condition from the stored dependents.
    ///
    /// All true makes it true. Otherwise the first false dependent in
    /// declaration order decides, then the first unknown or missing one. A
    /// missing dependent is reported under its own name as the reason.
    pub fn aggregate(&self, conditions: &Conditions<C>) -> Condition<C> {
        let mut unknown = None;
        for dependent in &self.dependents {
            match conditions.get(*dependent) {
                Some(cond) if cond.is_true() => {}
                Some(cond) if cond.is_false() => {
                    return self.happy_condition(
                        ConditionStatus::False,
                        cond.reason.clone(),
                        cond.message.clone(),
                    )
                }
                Some(cond) => {
                    unknown.get_or_insert_with(|| (cond.reason.clone(), cond.message.clone()));
                }
                None => {
                    unknown.get_or_insert_with(|| {
                        (
                            Some(dependent.as_str().to_string()),
                            Some(format!("{} has not been reported", dependent.as_str())),
                        )
                    });
                }
            }
        }

        match unknown {
            Some((reason, message)) => {
                self.happy_condition(ConditionStatus::Unknown, reason, message)
            }
            None => self.happy_condition(ConditionStatus::True, None, None),
        }
    }

    /// The happy condition as the dependents currently describe it.
    ///
    /// The stored entry only contributes its `last_transition_time`, and only
    /// while it agrees on the status.
    pub fn top_level(&self, conditions: &Conditions<C>) -> Condition<C> {
        let mut current = self.aggregate(conditions);
        if let Some(stored) = conditions
            .get(self.happy)
            .filter(|stored| stored.status == current.status)
        {
            current.last_transition_time = stored.last_transition_time;
        }
        current
    }

    /// Look up a condition, computing the happy condition instead of reading
    /// it. Returns `None` for the happy condition while nothing is stored.
    pub fn get<'a>(
        &self,
        conditions: &'a Conditions<C>,
        condition_type: C,
    ) -> Option<Cow<'a, Condition<C>>> {
        if condition_type != self.happy {
            conditions.get(condition_type).map(Cow::Borrowed)
        } else if conditions.is_empty() {
            None
        } else {
            Some(Cow::Owned(self.top_level(conditions)))
        }
    }

    pub fn is_happy(&self, conditions: &Conditions<C>) -> bool {
        self.aggregate(conditions).is_true()
    }

    pub fn phase(&self, conditions: &Conditions<C>) -> ReadinessPhase {
        let reported = self
            .dependents
            .iter()
            .any(|d| conditions.get(*d).is_some());
        if !reported && !self.dependents.is_empty() {
            return ReadinessPhase::Unknown;
        }

        match self.aggregate(conditions).status {
            ConditionStatus::True => ReadinessPhase::Ready,
            ConditionStatus::False => ReadinessPhase::Failed,
            ConditionStatus::Unknown => ReadinessPhase::InProgress,
        }
    }

    /// Bind this set to the conditions of a single resource.
    pub fn manage<'a>(&'a self, conditions: &'a mut Conditions<C>) -> ConditionManager<'a, C> {
        ConditionManager::new(self, conditions)
    }

    fn happy_condition(
        &self,
        status: ConditionStatus,
        reason: Option<String>,
        message: Option<String>,
    ) -> Condition<C> {
        Condition::new(self.happy, status).with_reason(reason, message)
    }
}

/// Provides [`ConditionManager`] access to the [`Conditions`] of a status.
pub trait ConditionAccessor<C: ConditionType> {
    /// Return the conditions of your CR status type.
    fn conditions(&self) -> &Conditions<C>;

    fn conditions_mut(&mut self) -> &mut Conditions<C>;

    fn condition_set(&self) -> &'static ConditionSet<C> {
        C::condition_set()
    }

    /// Returns a [`ConditionManager`] for more fine-grained control of [`Conditions`].
    fn manager(&mut self) -> ConditionManager<'_, C> {
        let set = self.condition_set();
        set.manage(self.conditions_mut())
    }

    /// Returns true if the resource is ready overall.
    fn is_ready(&self) -> bool {
        self.condition_set().is_happy(self.conditions())
    }

    fn get_condition(&self, condition_type: C) -> Option<Cow<'_, Condition<C>>> {
        self.condition_set().get(self.conditions(), condition_type)
    }

    fn get_top_level_condition(&self) -> Option<Cow<'_, Condition<C>>> {
        self.get_condition(self.condition_set().happy())
    }

    fn phase(&self) -> ReadinessPhase {
        self.condition_set().phase(self.conditions())
    }
}
