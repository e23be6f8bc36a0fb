use serde::Serialize;

use crate::model::board::{ColumnDef, View};
use crate::model::case::{Case, HistoryEntry, Urgency, br_date};
use crate::model::transition::{ConclusionOutcome, ReturnMode};
use crate::model::workflow::{Notification, WorkflowRule};
use crate::ops::search::SearchHit;

// ---------------------------------------------------------------------------
// JSON output structs
// ---------------------------------------------------------------------------

/// One case as a board card. `show --json` dumps the full case document
/// instead; this is the curated listing shape.
#[derive(Serialize)]
pub struct CaseCardJson {
    pub id: String,
    pub internal_id: String,
    pub client: String,
    pub view: &'static str,
    pub column: String,
    pub urgency: &'static str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub responsible: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub benefit_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline_end: Option<String>,
}

#[derive(Serialize)]
pub struct BoardJson {
    pub view: &'static str,
    pub title: &'static str,
    pub columns: Vec<ColumnJson>,
}

#[derive(Serialize)]
pub struct ColumnJson {
    pub id: String,
    pub title: String,
    pub cases: usize,
}

#[derive(Serialize)]
pub struct PendingJson {
    pub case_id: String,
    pub kind: &'static str,
    pub from: String,
    pub to: String,
    pub missing: Vec<&'static str>,
}

#[derive(Serialize)]
pub struct SearchHitJson {
    pub case_id: String,
    pub internal_id: String,
    pub field: &'static str,
    pub text: String,
}

#[derive(Serialize)]
pub struct HistoryEntryJson {
    pub date: String,
    pub action: String,
    pub details: String,
    pub user: String,
}

#[derive(Serialize)]
pub struct NotificationJson {
    pub internal_id: String,
    pub message: String,
    pub created_at: String,
    pub read: bool,
}

#[derive(Serialize)]
pub struct RuleJson {
    pub id: String,
    pub name: String,
    pub active: bool,
    pub column: String,
    pub conditions: usize,
    pub actions: usize,
}

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

pub fn case_to_card(case: &Case) -> CaseCardJson {
    CaseCardJson {
        id: case.id.clone(),
        internal_id: case.internal_id.clone(),
        client: case.client_name.clone(),
        view: case.view.key(),
        column: case.column_id.clone(),
        urgency: case.urgency.key(),
        tags: case.tags.clone(),
        responsible: case.responsible_name.clone(),
        benefit_type: case.benefit_type.clone(),
        deadline_end: case.deadline_end.map(br_date),
    }
}

pub fn history_to_json(entry: &HistoryEntry) -> HistoryEntryJson {
    HistoryEntryJson {
        date: entry.date.to_rfc3339(),
        action: entry.action.clone(),
        details: entry.details.clone(),
        user: entry.user.clone(),
    }
}

pub fn notification_to_json(note: &Notification) -> NotificationJson {
    NotificationJson {
        internal_id: note.internal_id.clone(),
        message: note.message.clone(),
        created_at: note.created_at.to_rfc3339(),
        read: note.read,
    }
}

pub fn rule_to_json(rule: &WorkflowRule) -> RuleJson {
    RuleJson {
        id: rule.id.clone(),
        name: rule.name.clone(),
        active: rule.is_active,
        column: rule.target_column_id.clone(),
        conditions: rule.conditions.len(),
        actions: rule.actions.len(),
    }
}

pub fn hit_to_json(hit: &SearchHit) -> SearchHitJson {
    SearchHitJson {
        case_id: hit.case_id.clone(),
        internal_id: hit.internal_id.clone(),
        field: hit.field.key(),
        text: hit.text.clone(),
    }
}

// ---------------------------------------------------------------------------
// Human-readable formatting
// ---------------------------------------------------------------------------

fn urgency_char(urgency: Urgency) -> char {
    match urgency {
        Urgency::High => '!',
        Urgency::Medium => '-',
        Urgency::Low => '.',
    }
}

/// Format a case as a one-line summary
pub fn format_case_line(case: &Case) -> String {
    let tags_str = if case.tags.is_empty() {
        String::new()
    } else {
        format!(
            " {}",
            case.tags
                .iter()
                .map(|t| format!("#{}", t))
                .collect::<Vec<_>>()
                .join(" ")
        )
    };
    let responsible = case
        .responsible_name
        .as_ref()
        .map(|n| format!(" @{}", n))
        .unwrap_or_default();
    format!(
        "[{}] {} {}{}{}",
        urgency_char(case.urgency),
        case.internal_id,
        case.client_name,
        tags_str,
        responsible
    )
}

/// Format detailed case view
pub fn format_case_detail(case: &Case, column_title: &str) -> Vec<String> {
    let mut lines = Vec::new();

    lines.push(format!(
        "[{}] {} {}",
        urgency_char(case.urgency),
        case.internal_id,
        case.client_name
    ));
    lines.push(format!(
        "quadro: {} / {}",
        case.view.title(),
        column_title
    ));
    if let Some(benefit_type) = &case.benefit_type {
        lines.push(format!("benefício: {}", benefit_type));
    }
    if let Some(responsible) = &case.responsible_name {
        lines.push(format!("responsável: {}", responsible));
    }
    if !case.tags.is_empty() {
        lines.push(format!(
            "etiquetas: {}",
            case.tags
                .iter()
                .map(|t| format!("#{}", t))
                .collect::<Vec<_>>()
                .join(" ")
        ));
    }
    if let Some(protocol) = &case.protocol_number {
        let date = case
            .protocol_date
            .map(|d| format!(" em {}", br_date(d)))
            .unwrap_or_default();
        lines.push(format!("protocolo: {}{}", protocol, date));
    }
    if let Some(date) = case.pericia_date {
        let location = case
            .pericia_location
            .as_ref()
            .map(|l| format!(" ({})", l))
            .unwrap_or_default();
        lines.push(format!("perícia: {}{}", br_date(date), location));
    }
    if let Some(end) = case.deadline_end {
        let start = case
            .deadline_start
            .map(|d| format!("{} a ", br_date(d)))
            .unwrap_or_default();
        lines.push(format!("prazo: {}{}", start, br_date(end)));
    }
    if let Some(details) = &case.exigency_details {
        lines.push(format!("exigência: {}", details));
    }
    if let Some(nb) = &case.benefit_number {
        let date = case
            .benefit_date
            .map(|d| format!(" em {}", br_date(d)))
            .unwrap_or_default();
        lines.push(format!("NB: {}{}", nb, date));
    }
    if let Some(dcb) = case.dcb_date {
        lines.push(format!("DCB: {}", br_date(dcb)));
    }
    if let Some(protocol) = &case.appeal_ordinario_protocol {
        lines.push(format!("recurso ordinário: {}", protocol));
    }
    if let Some(protocol) = &case.appeal_especial_protocol {
        lines.push(format!("recurso especial: {}", protocol));
    }
    if let Some(outcome) = &case.appeal_outcome {
        let date = case
            .appeal_decision_date
            .map(|d| format!(" em {}", br_date(d)))
            .unwrap_or_default();
        lines.push(format!("decisão do recurso: {}{}", outcome, date));
    }
    if !case.missing_docs.is_empty() {
        lines.push(format!("documentos pendentes: {}", case.missing_docs.join(", ")));
    }
    for ms in &case.mandados_seguranca {
        lines.push(format!(
            "MS: NPU {} impetrado em {}",
            ms.npu,
            br_date(ms.filing_date)
        ));
    }
    if let Some(parent) = &case.parent_case_id {
        lines.push(format!("derivado de: {}", parent));
    }
    if !case.tasks.is_empty() {
        lines.push("tarefas:".to_string());
        for task in &case.tasks {
            let mark = if task.completed { 'x' } else { ' ' };
            lines.push(format!("  [{}] {}", mark, task.title));
        }
    }

    lines
}

/// Format a board's column listing with case counts
pub fn format_board_listing(view: View, columns: &[ColumnDef], cases: &[Case]) -> Vec<String> {
    let mut lines = Vec::new();
    lines.push(format!("== {} ({}) ==", view.title(), view.key()));
    for column in columns {
        let count = cases
            .iter()
            .filter(|c| c.view == view && c.column_id == column.id)
            .count();
        lines.push(format!("  {}  {} ({})", column.id, column.title, count));
    }
    lines
}

pub fn format_history_entry(entry: &HistoryEntry) -> String {
    format!(
        "{}  [{}] {}: {}",
        entry.date.format("%d/%m/%Y %H:%M"),
        entry.action,
        entry.user,
        entry.details
    )
}

pub fn format_notification(note: &Notification) -> String {
    let mark = if note.read { ' ' } else { '*' };
    format!(
        "[{}] {}  {}  {}",
        mark,
        note.created_at.format("%d/%m/%Y %H:%M"),
        note.internal_id,
        note.message
    )
}

// ---------------------------------------------------------------------------
// Input parsing
// ---------------------------------------------------------------------------

/// Parse a view key
pub fn parse_view(s: &str) -> Result<View, String> {
    View::parse(s).ok_or_else(|| {
        format!(
            "unknown view '{}' (expected: ADMIN, AUX_DOENCA, RECURSO_ADM, JUDICIAL, DECISORIO)",
            s
        )
    })
}

pub fn parse_urgency(s: &str) -> Result<Urgency, String> {
    Urgency::parse(s).ok_or_else(|| format!("unknown urgency '{}' (expected: low, medium, high)", s))
}

pub fn parse_outcome(s: &str) -> Result<ConclusionOutcome, String> {
    ConclusionOutcome::parse(s)
        .ok_or_else(|| format!("unknown outcome '{}' (expected: granted, denied, partial)", s))
}

pub fn parse_return_mode(s: &str) -> Result<ReturnMode, String> {
    ReturnMode::parse(s).ok_or_else(|| format!("unknown return mode '{}' (expected: move, clone)", s))
}

pub fn parse_date(s: &str) -> Result<chrono::NaiveDate, String> {
    chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| format!("invalid date '{}' (expected YYYY-MM-DD)", s))
}
