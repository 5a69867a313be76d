use enumset::EnumSetType;
use knative_gcp_conditions::{
    ConditionAccessor, ConditionName, ConditionStatus, ConditionType as _, Conditions,
};
use knative_gcp_derive::ConditionType;
use serde::{Deserialize, Serialize};
use schemars::JsonSchema;

#[derive(ConditionType, EnumSetType, Serialize, Deserialize, Debug, JsonSchema)]
enum MyCondition {
    Ready,
    #[dependent]
    SinkProvided,
    #[dependent]
    TopicReady,
    Informational,
}

#[derive(ConditionType, EnumSetType, Serialize, Deserialize, Debug, JsonSchema)]
enum JobCondition {
    Succeeded,
    #[dependent]
    Deployed,
}

#[derive(ConditionType, EnumSetType, Serialize, Deserialize, Debug, JsonSchema)]
enum RenamedCondition {
    Ready,
    #[dependent]
    #[serde(rename = "TopicProvisioned")]
    TopicReady,
}

#[derive(Default)]
struct MyStatus {
    conditions: Conditions<MyCondition>,
}

impl ConditionAccessor<MyCondition> for MyStatus {
    fn conditions(&self) -> &Conditions<MyCondition> {
        &self.conditions
    }

    fn conditions_mut(&mut self) -> &mut Conditions<MyCondition> {
        &mut self.conditions
    }
}

#[test]
fn variant_functions_exist() {
    assert_eq!(MyCondition::SinkProvided, MyCondition::sink_provided());
    assert_eq!(MyCondition::TopicReady, MyCondition::topic_ready());
    assert_eq!(JobCondition::Deployed, JobCondition::deployed());
}

#[test]
fn has_dependents() {
    assert_eq!(MyCondition::happy(), MyCondition::Ready);
    assert_eq!(
        [MyCondition::SinkProvided, MyCondition::TopicReady],
        MyCondition::dependents()
    );
    assert_eq!(JobCondition::happy(), JobCondition::Succeeded);
    assert_eq!(MyCondition::default(), MyCondition::Ready);
}

#[test]
fn names_match_the_wire() {
    assert_eq!(MyCondition::TopicReady.as_str(), "TopicReady");
    assert_eq!(MyCondition::Informational.to_string(), "Informational");
    assert_eq!(
        serde_json::to_value(MyCondition::SinkProvided).unwrap(),
        serde_json::json!("SinkProvided")
    );
}

#[test]
fn condition_set_is_shared() {
    let first = MyCondition::condition_set();
    let second = MyCondition::condition_set();
    assert!(std::ptr::eq(first, second));
    assert!(first.is_dependent(MyCondition::TopicReady));
    assert!(!first.is_dependent(MyCondition::Informational));
}

#[test]
fn generated_manager_marks_conditions() {
    let mut status = MyStatus::default();
    status.mark_sink_provided();
    assert!(!status.is_ready());

    status.mark_topic_ready_unknown("Creating", None);
    assert_eq!(
        status.get_condition(MyCondition::TopicReady).map(|c| c.status),
        Some(ConditionStatus::Unknown)
    );

    status.mark_topic_ready();
    assert!(status.is_ready());

    status.mark_not_informational("NotImportant", None);
    assert!(status.is_ready());

    status.mark_not_sink_provided("NoSink", Some("sink is gone".into()));
    assert!(!status.is_ready());
    let ready = status.get_top_level_condition().unwrap();
    assert_eq!(ready.reason.as_deref(), Some("NoSink"));
    assert_eq!(ready.message.as_deref(), Some("sink is gone"));

    status.mark_sink_provided_with_reason("Resolved", None);
    assert!(status.is_ready());
}

#[test]
fn renamed_variants_keep_their_wire_name() {
    assert_eq!(RenamedCondition::TopicReady.as_str(), "TopicProvisioned");
    assert_eq!(
        serde_json::to_value(RenamedCondition::TopicReady).unwrap(),
        serde_json::json!(RenamedCondition::TopicReady.as_str())
    );
    assert_eq!(
        ConditionName::<RenamedCondition>::parse("TopicProvisioned"),
        ConditionName::Known(RenamedCondition::TopicReady)
    );
    assert_eq!(
        ConditionName::<RenamedCondition>::parse("TopicReady"),
        ConditionName::Other("TopicReady".into())
    );
}
