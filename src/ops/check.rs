use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::model::board::board_has_column;
use crate::model::config::OfficeConfig;
use crate::model::office::Office;
use crate::model::workflow::RuleAction;

/// Structured result from `tram check`, suitable for --json output.
#[derive(Debug, Default, Serialize)]
pub struct CheckResult {
    pub valid: bool,
    pub errors: Vec<CheckError>,
    pub warnings: Vec<CheckWarning>,
}

/// A validation error (something that should be fixed).
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum CheckError {
    /// The same column id appears on more than one board; transitions and
    /// rules address columns by id alone, so this is ambiguous
    #[serde(rename = "duplicate_column")]
    DuplicateColumn { column_id: String, views: Vec<String> },
    /// An action zone points at a column its target board doesn't have
    #[serde(rename = "zone_target")]
    ZoneTarget {
        zone_id: String,
        view: String,
        column_id: String,
    },
    /// A transition rule references a column no board has
    #[serde(rename = "transition_target")]
    TransitionTarget { column_id: String },
    /// A workflow rule targets a column no board has
    #[serde(rename = "rule_target")]
    RuleTarget { rule_id: String, column_id: String },
    /// A workflow rule assigns to a user that isn't configured
    #[serde(rename = "rule_user")]
    RuleUser { rule_id: String, user_id: String },
    /// A case sits in a column its board doesn't have
    #[serde(rename = "unknown_column")]
    UnknownColumn {
        internal_id: String,
        view: String,
        column_id: String,
    },
    /// A derived case points at a parent that no longer exists
    #[serde(rename = "dangling_parent")]
    DanglingParent {
        internal_id: String,
        parent_id: String,
    },
    /// Two case files claim the same internal number
    #[serde(rename = "duplicate_internal_id")]
    DuplicateInternalId {
        internal_id: String,
        case_ids: Vec<String>,
    },
}

/// A validation warning (non-critical issue).
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum CheckWarning {
    /// A case's responsible references a user that isn't configured
    #[serde(rename = "unknown_responsible")]
    UnknownResponsible {
        internal_id: String,
        user_id: String,
    },
    /// A case's deadline window ends before it starts
    #[serde(rename = "inverted_deadline")]
    InvertedDeadline { internal_id: String },
    /// An action zone is not active on any board, so it can never be used
    #[serde(rename = "unreachable_zone")]
    UnreachableZone { zone_id: String },
    /// A workflow rule has no actions
    #[serde(rename = "rule_without_actions")]
    RuleWithoutActions { rule_id: String },
}

// ---------------------------------------------------------------------------
// Main check entry point
// ---------------------------------------------------------------------------

/// Validate the office and return structured results.
///
/// This is a read-only operation — it does not modify anything.
///
/// Checks performed:
/// 1. Column ids are unique across boards
/// 2. Action zones target existing columns and are active somewhere
/// 3. Transition rules reference existing columns
/// 4. Workflow rules target existing columns and known users
/// 5. Cases sit in existing columns, parent links resolve, internal
///    numbers are unique; warnings for stale responsibles and inverted
///    deadline windows
pub fn check_office(office: &Office) -> CheckResult {
    let mut result = CheckResult::default();
    check_topology(&office.config, &mut result);
    check_cases(office, &mut result);
    result.valid = result.errors.is_empty();
    result
}

// ---------------------------------------------------------------------------
// Topology validation
// ---------------------------------------------------------------------------

fn check_topology(config: &OfficeConfig, result: &mut CheckResult) {
    // column id → views it appears on
    let mut locations: HashMap<&str, Vec<&'static str>> = HashMap::new();
    for (view, columns) in &config.boards {
        for column in columns {
            locations.entry(&column.id).or_default().push(view.key());
        }
    }
    let mut duplicated: Vec<(&str, &Vec<&'static str>)> = locations
        .iter()
        .filter(|(_, views)| views.len() > 1)
        .map(|(id, views)| (*id, views))
        .collect();
    duplicated.sort_by_key(|(id, _)| *id);
    for (column_id, views) in duplicated {
        result.errors.push(CheckError::DuplicateColumn {
            column_id: column_id.to_string(),
            views: views.iter().map(|v| v.to_string()).collect(),
        });
    }

    let known_columns: HashSet<&str> = locations.keys().copied().collect();
    let known_users: HashSet<&str> = config.users.iter().map(|u| u.id.as_str()).collect();

    for zone in &config.zones {
        if !board_has_column(&config.boards, zone.target_view, &zone.target_column_id) {
            result.errors.push(CheckError::ZoneTarget {
                zone_id: zone.id.clone(),
                view: zone.target_view.key().to_string(),
                column_id: zone.target_column_id.clone(),
            });
        }
        if zone.active_in_views.is_empty() {
            result.warnings.push(CheckWarning::UnreachableZone {
                zone_id: zone.id.clone(),
            });
        }
    }

    for rule in &config.transitions {
        if !known_columns.contains(rule.to.as_str()) {
            result.errors.push(CheckError::TransitionTarget {
                column_id: rule.to.clone(),
            });
        }
        if let Some(from) = &rule.from
            && !known_columns.contains(from.as_str())
        {
            result.errors.push(CheckError::TransitionTarget {
                column_id: from.clone(),
            });
        }
    }

    for rule in &config.rules {
        if !known_columns.contains(rule.target_column_id.as_str()) {
            result.errors.push(CheckError::RuleTarget {
                rule_id: rule.id.clone(),
                column_id: rule.target_column_id.clone(),
            });
        }
        if rule.actions.is_empty() {
            result.warnings.push(CheckWarning::RuleWithoutActions {
                rule_id: rule.id.clone(),
            });
        }
        for action in &rule.actions {
            if let RuleAction::SetResponsible(user_id) = action
                && !known_users.contains(user_id.as_str())
            {
                result.errors.push(CheckError::RuleUser {
                    rule_id: rule.id.clone(),
                    user_id: user_id.clone(),
                });
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Case validation
// ---------------------------------------------------------------------------

fn check_cases(office: &Office, result: &mut CheckResult) {
    // internal number → case ids claiming it
    let mut claims: HashMap<&str, Vec<&str>> = HashMap::new();
    for case in &office.cases {
        claims
            .entry(&case.internal_id)
            .or_default()
            .push(&case.id);
    }
    let mut duplicated: Vec<(&str, &Vec<&str>)> = claims
        .iter()
        .filter(|(_, ids)| ids.len() > 1)
        .map(|(internal, ids)| (*internal, ids))
        .collect();
    duplicated.sort_by_key(|(internal, _)| *internal);
    for (internal_id, case_ids) in duplicated {
        result.errors.push(CheckError::DuplicateInternalId {
            internal_id: internal_id.to_string(),
            case_ids: case_ids.iter().map(|id| id.to_string()).collect(),
        });
    }

    for case in &office.cases {
        if !office.config.has_column(case.view, &case.column_id) {
            result.errors.push(CheckError::UnknownColumn {
                internal_id: case.internal_id.clone(),
                view: case.view.key().to_string(),
                column_id: case.column_id.clone(),
            });
        }

        if let Some(parent_id) = &case.parent_case_id
            && office.case(parent_id).is_none()
        {
            result.errors.push(CheckError::DanglingParent {
                internal_id: case.internal_id.clone(),
                parent_id: parent_id.clone(),
            });
        }

        if let Some(user_id) = &case.responsible_id
            && office.config.user(user_id).is_none()
        {
            result.warnings.push(CheckWarning::UnknownResponsible {
                internal_id: case.internal_id.clone(),
                user_id: user_id.clone(),
            });
        }

        if let (Some(start), Some(end)) = (case.deadline_start, case.deadline_end)
            && end < start
        {
            result.warnings.push(CheckWarning::InvertedDeadline {
                internal_id: case.internal_id.clone(),
            });
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
