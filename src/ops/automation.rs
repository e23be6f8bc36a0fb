use chrono::{DateTime, Utc};

use crate::model::case::{Case, Urgency};
use crate::model::config::User;
use crate::model::workflow::{Notification, RuleAction, Trigger, WorkflowRule};

/// What the automation engine produced for one column entry: extra log
/// lines, queued notifications, and possibly a veto.
#[derive(Debug, Default)]
pub struct Automation {
    pub logs: Vec<String>,
    pub notifications: Vec<Notification>,
    /// Veto reason. When set, the whole move (including the explicit
    /// updates already applied to `case`) must be discarded.
    pub block: Option<String>,
}

impl Automation {
    pub fn is_blocked(&self) -> bool {
        self.block.is_some()
    }
}

/// Run every active COLUMN_ENTER rule targeting `column_id` against the
/// case and apply the matching rules' actions to it.
///
/// Conditions are evaluated against a frozen snapshot of the case as it
/// stood on entry (after the move's explicit updates, before any rule
/// action), so one rule's writes can never satisfy another rule's
/// conditions. Actions run in declaration order; a BLOCK_MOVE stops both
/// the current rule and all remaining rules.
pub fn run_column_rules(
    case: &mut Case,
    rules: &[WorkflowRule],
    column_id: &str,
    users: &[User],
    now: DateTime<Utc>,
) -> Automation {
    let snapshot = case.clone();
    let mut out = Automation::default();

    for rule in rules {
        if !rule.is_active || rule.trigger != Trigger::ColumnEnter {
            continue;
        }
        if rule.target_column_id != column_id {
            continue;
        }
        if !rule.conditions.iter().all(|c| c.holds(&snapshot)) {
            continue;
        }
        for action in &rule.actions {
            if apply_action(case, action, users, now, &mut out) {
                // vetoed; nothing further applies
                return out;
            }
        }
    }
    out
}

/// Apply one action. Returns true when the action vetoed the move.
fn apply_action(
    case: &mut Case,
    action: &RuleAction,
    users: &[User],
    now: DateTime<Utc>,
    out: &mut Automation,
) -> bool {
    match action {
        RuleAction::AddTask(title) => {
            case.add_task(title.clone());
            out.logs.push(format!("Tarefa criada: {}", title));
        }
        RuleAction::SetResponsible(user_id) => {
            // Unknown ids are skipped; a stale rule must not blank the field
            if let Some(user) = users.iter().find(|u| &u.id == user_id)
                && case.responsible_id.as_deref() != Some(user_id.as_str())
            {
                case.responsible_id = Some(user.id.clone());
                case.responsible_name = Some(user.name.clone());
                out.logs.push(format!("Responsável definido: {}", user.name));
            }
        }
        RuleAction::SetUrgency(urgency) => {
            if case.urgency != *urgency {
                case.urgency = *urgency;
                out.logs
                    .push(format!("Urgência definida: {}", urgency.label()));
            }
        }
        RuleAction::AddTag(tag) => {
            if case.add_tag(tag) {
                out.logs.push(format!("Etiqueta adicionada: {}", tag));
            }
        }
        RuleAction::SendNotification(message) => {
            out.notifications.push(Notification {
                case_id: case.id.clone(),
                internal_id: case.internal_id.clone(),
                message: message.clone(),
                created_at: now,
                read: false,
            });
        }
        RuleAction::BlockMove(reason) => {
            out.block = Some(reason.clone());
            return true;
        }
    }
    false
}
