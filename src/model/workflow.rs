use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::case::{Case, Urgency};

/// When a workflow rule fires. Only column entry exists today; the enum
/// keeps config files forward-compatible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Trigger {
    ColumnEnter,
}

/// A predicate over the case as it stands after the move's explicit
/// updates. All of a rule's conditions must hold for it to fire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Condition {
    TagContains(String),
    BenefitType(String),
    FieldEmpty(String),
    FieldNotEmpty(String),
    UrgencyIs(Urgency),
}

impl Condition {
    pub fn holds(&self, case: &Case) -> bool {
        match self {
            Condition::TagContains(tag) => case.has_tag(tag),
            Condition::BenefitType(bt) => case.benefit_type.as_deref() == Some(bt.as_str()),
            Condition::FieldEmpty(field) => case.field_is_blank(field),
            Condition::FieldNotEmpty(field) => !case.field_is_blank(field),
            Condition::UrgencyIs(u) => case.urgency == *u,
        }
    }
}

/// What a fired rule does to the case (or to the move itself)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleAction {
    /// Append an open task with this title
    AddTask(String),
    /// Assign the case to the user with this id
    SetResponsible(String),
    /// Veto the whole move with this reason
    BlockMove(String),
    SetUrgency(Urgency),
    AddTag(String),
    /// Queue a notification with this message
    SendNotification(String),
}

/// A configured automation rule, evaluated when a case enters its target
/// column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowRule {
    pub id: String,
    pub name: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
    pub trigger: Trigger,
    pub target_column_id: String,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    pub actions: Vec<RuleAction>,
}

fn default_active() -> bool {
    true
}

/// A queued outbound notification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub case_id: String,
    pub internal_id: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub read: bool,
}
