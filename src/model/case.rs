use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::board::{ADMIN_TRIAGE_COLUMN, APPEAL_TRIAGE_COLUMN, JUDICIAL_TRIAGE_COLUMN, View};

// Tags with fixed meaning to the transition executor. Anything else is a
// free-form label.
pub const TAG_MANDADO_SEGURANCA: &str = "MANDADO DE SEGURANÇA";
pub const TAG_URGENTE: &str = "URGENTE";
pub const TAG_MS_SOLICITADO: &str = "MS SOLICITADO";
pub const TAG_MS_IMPETRADO: &str = "MS IMPETRADO";
pub const TAG_COM_MS: &str = "COM MS";
pub const TAG_FALTA_DOCS: &str = "Falta Docs";
pub const TAG_PARCIALMENTE_PROVIDO: &str = "PARCIALMENTE PROVIDO";
pub const TAG_A_RECEBER: &str = "A RECEBER";
pub const TAG_RECURSO_PARCIAL: &str = "RECURSO PARCIAL";
pub const TAG_INDEFERIDO: &str = "INDEFERIDO";
pub const TAG_CONCEDIDO: &str = "CONCEDIDO";

// History entry actions
pub const ACTION_CREATION: &str = "Criação";
pub const ACTION_MOVEMENT: &str = "Movimentação";
pub const ACTION_UPDATE: &str = "Atualização";

/// Actor recorded on history entries produced by automation rather than a
/// named user
pub const SYSTEM_ACTOR: &str = "Sistema";

/// Case urgency level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Urgency {
    Low,
    #[default]
    Medium,
    High,
}

impl Urgency {
    /// Stable key used in JSON output and CLI arguments
    pub fn key(self) -> &'static str {
        match self {
            Urgency::Low => "LOW",
            Urgency::Medium => "MEDIUM",
            Urgency::High => "HIGH",
        }
    }

    /// Display label used in listings and history lines
    pub fn label(self) -> &'static str {
        match self {
            Urgency::Low => "Baixa",
            Urgency::Medium => "Média",
            Urgency::High => "Alta",
        }
    }

    pub fn parse(s: &str) -> Option<Urgency> {
        match s.to_ascii_uppercase().as_str() {
            "LOW" => Some(Urgency::Low),
            "MEDIUM" => Some(Urgency::Medium),
            "HIGH" => Some(Urgency::High),
            _ => None,
        }
    }
}

/// Status of one administrative appeal instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppealStatus {
    Aguardando,
    Provido,
    Improvido,
}

/// Status of an incidental writ filing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MsStatus {
    Aguardando,
    Deferido,
    Indeferido,
}

/// Why a writ of mandamus was filed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MsReason {
    DemoraAnalise,
    DemoraImplantacao,
}

/// An incidental writ-of-mandamus filing recorded on the parent case
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MandadoSeguranca {
    /// Unified court process number
    pub npu: String,
    pub filing_date: NaiveDate,
    pub status: MsStatus,
    pub reason: MsReason,
}

/// A to-do item attached to a case
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseTask {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub completed: bool,
}

/// One append-only audit record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub date: DateTime<Utc>,
    /// Broad action category ("Criação", "Movimentação")
    pub action: String,
    pub details: String,
    /// Acting user's display name, or "Sistema"
    pub user: String,
}

/// One legal matter, pinned to exactly one column of one board
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Case {
    /// Store key
    pub id: String,
    /// Human-facing number like `2024.010`; derived cases carry a suffix
    pub internal_id: String,
    pub client_name: String,
    /// Which board the case lives on
    pub view: View,
    /// Which column of that board
    pub column_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub benefit_type: Option<String>,
    #[serde(default)]
    pub urgency: Urgency,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub responsible_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub responsible_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_update: DateTime<Utc>,
    /// Last time a staff member reviewed the case; maintained by board
    /// front ends and carried through the store
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_checked_at: Option<DateTime<Utc>>,

    // --- Lifecycle identifiers, filled in by transitions ---
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pericia_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pericia_location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline_start: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline_end: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exigency_details: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub benefit_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub benefit_date: Option<NaiveDate>,
    /// Benefit cessation date
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dcb_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub appeal_ordinario_protocol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub appeal_ordinario_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub appeal_ordinario_status: Option<AppealStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub appeal_especial_protocol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub appeal_especial_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub appeal_especial_status: Option<AppealStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub appeal_decision_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub appeal_outcome: Option<String>,

    // --- Collections ---
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing_docs: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tasks: Vec<CaseTask>,
    /// Attached file names (paths are external to the tracker)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mandados_seguranca: Vec<MandadoSeguranca>,
    pub history: Vec<HistoryEntry>,

    /// Set on derived cases (appeal split, return clone, writ child)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_case_id: Option<String>,
}

impl Case {
    /// All-empty case body shared by the constructors. History starts empty;
    /// each constructor seeds its own creation entry.
    fn blank(
        id: String,
        internal_id: String,
        client_name: String,
        view: View,
        column_id: String,
        now: DateTime<Utc>,
    ) -> Case {
        Case {
            id,
            internal_id,
            client_name,
            view,
            column_id,
            benefit_type: None,
            urgency: Urgency::default(),
            responsible_id: None,
            responsible_name: None,
            created_at: now,
            last_update: now,
            last_checked_at: None,
            protocol_number: None,
            protocol_date: None,
            pericia_date: None,
            pericia_location: None,
            deadline_start: None,
            deadline_end: None,
            exigency_details: None,
            benefit_number: None,
            benefit_date: None,
            dcb_date: None,
            appeal_ordinario_protocol: None,
            appeal_ordinario_date: None,
            appeal_ordinario_status: None,
            appeal_especial_protocol: None,
            appeal_especial_date: None,
            appeal_especial_status: None,
            appeal_decision_date: None,
            appeal_outcome: None,
            missing_docs: Vec::new(),
            tasks: Vec::new(),
            files: Vec::new(),
            tags: Vec::new(),
            mandados_seguranca: Vec::new(),
            history: Vec::new(),
            parent_case_id: None,
        }
    }

    /// Create a fresh case in the given column
    pub fn new(
        id: String,
        internal_id: String,
        client_name: String,
        view: View,
        column_id: String,
        user: &str,
        now: DateTime<Utc>,
    ) -> Case {
        let mut case = Case::blank(id, internal_id, client_name, view, column_id, now);
        case.history.push(HistoryEntry {
            date: now,
            action: ACTION_CREATION.to_string(),
            details: "Caso criado".to_string(),
            user: user.to_string(),
        });
        case
    }

    /// Derive the appeal child spawned by a partially granted conclusion.
    /// Copies history and files (deep), keeps client identity and benefit
    /// type, and resets every lifecycle identifier. Deadlines are filled in
    /// by the caller from the decision date.
    pub fn split_child(&self, user: &str, now: DateTime<Utc>) -> Case {
        let internal_id = derived_internal_id(&self.internal_id, "R");
        let mut child = Case::blank(
            case_id_for(&internal_id),
            internal_id,
            self.client_name.clone(),
            View::RecursoAdm,
            APPEAL_TRIAGE_COLUMN.to_string(),
            now,
        );
        child.parent_case_id = Some(self.id.clone());
        child.benefit_type = self.benefit_type.clone();
        child.history = self.history.clone();
        child.files = self.files.clone();
        child.tags = vec![TAG_RECURSO_PARCIAL.to_string(), TAG_INDEFERIDO.to_string()];
        child.history.push(HistoryEntry {
            date: now,
            action: ACTION_CREATION.to_string(),
            details: format!("Derivado de {} por indeferimento parcial", self.internal_id),
            user: user.to_string(),
        });
        child.add_task("Elaborar recurso administrativo".to_string());
        child
    }

    /// Derive the fresh administrative filing created by a return-clone
    /// drop. Only client identity, benefit type, and attached files carry
    /// over; protocol data comes from the form.
    pub fn return_clone(
        &self,
        protocol_number: Option<String>,
        protocol_date: Option<NaiveDate>,
        user: &str,
        now: DateTime<Utc>,
    ) -> Case {
        let internal_id = derived_internal_id(&self.internal_id, "R");
        let mut child = Case::blank(
            case_id_for(&internal_id),
            internal_id,
            self.client_name.clone(),
            View::Admin,
            ADMIN_TRIAGE_COLUMN.to_string(),
            now,
        );
        child.parent_case_id = Some(self.id.clone());
        child.benefit_type = self.benefit_type.clone();
        child.files = self.files.clone();
        child.protocol_number = protocol_number;
        child.protocol_date = protocol_date;
        child.history.push(HistoryEntry {
            date: now,
            action: ACTION_CREATION.to_string(),
            details: format!("Novo requerimento derivado de {}", self.internal_id),
            user: user.to_string(),
        });
        child
    }

    /// Derive the judicial case created by a writ-of-mandamus drop. The
    /// source case is not touched here; the caller tags it separately.
    pub fn writ_child(&self, user: &str, now: DateTime<Utc>) -> Case {
        let internal_id = derived_internal_id(&self.internal_id, "MS");
        let mut child = Case::blank(
            case_id_for(&internal_id),
            internal_id,
            self.client_name.clone(),
            View::Judicial,
            JUDICIAL_TRIAGE_COLUMN.to_string(),
            now,
        );
        child.parent_case_id = Some(self.id.clone());
        child.benefit_type = self.benefit_type.clone();
        child.tags = vec![TAG_MANDADO_SEGURANCA.to_string(), TAG_URGENTE.to_string()];
        child.history.push(HistoryEntry {
            date: now,
            action: ACTION_CREATION.to_string(),
            details: format!("Mandado de Segurança derivado de {}", self.internal_id),
            user: user.to_string(),
        });
        child.add_task("Elaborar petição inicial do Mandado de Segurança".to_string());
        child
    }

    // --- Tags ---

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Add a tag if absent. Returns whether the tag set changed.
    pub fn add_tag(&mut self, tag: &str) -> bool {
        if self.has_tag(tag) {
            return false;
        }
        self.tags.push(tag.to_string());
        true
    }

    /// Remove a tag if present. Returns whether the tag set changed.
    pub fn remove_tag(&mut self, tag: &str) -> bool {
        let before = self.tags.len();
        self.tags.retain(|t| t != tag);
        self.tags.len() != before
    }

    /// Replace `from` with `to`, keeping the tag set free of duplicates.
    /// No-op when `from` is absent.
    pub fn swap_tag(&mut self, from: &str, to: &str) -> bool {
        if !self.remove_tag(from) {
            return false;
        }
        self.add_tag(to);
        true
    }

    // --- Tasks ---

    /// Next free task id (`t1`, `t2`, ...)
    pub fn next_task_id(&self) -> String {
        let max = self
            .tasks
            .iter()
            .filter_map(|t| t.id.strip_prefix('t'))
            .filter_map(|n| n.parse::<u32>().ok())
            .max()
            .unwrap_or(0);
        format!("t{}", max + 1)
    }

    /// Append an open task, returning its id
    pub fn add_task(&mut self, title: String) -> String {
        let id = self.next_task_id();
        self.tasks.push(CaseTask {
            id: id.clone(),
            title,
            completed: false,
        });
        id
    }

    // --- History ---

    pub fn log_history(&mut self, action: &str, details: String, user: &str, now: DateTime<Utc>) {
        self.history.push(HistoryEntry {
            date: now,
            action: action.to_string(),
            details,
            user: user.to_string(),
        });
    }

    // --- Field inspection (workflow conditions) ---

    /// Whether a named field is blank, by the snake_case keys workflow
    /// conditions use. Unknown keys count as blank so a misspelled
    /// condition never silently passes a not-empty check.
    pub fn field_is_blank(&self, field: &str) -> bool {
        fn opt(s: &Option<String>) -> bool {
            s.as_deref().map_or(true, |v| v.trim().is_empty())
        }
        match field {
            "client_name" => self.client_name.trim().is_empty(),
            "benefit_type" => opt(&self.benefit_type),
            "responsible_id" => opt(&self.responsible_id),
            "protocol_number" => opt(&self.protocol_number),
            "protocol_date" => self.protocol_date.is_none(),
            "pericia_date" => self.pericia_date.is_none(),
            "pericia_location" => opt(&self.pericia_location),
            "deadline_start" => self.deadline_start.is_none(),
            "deadline_end" => self.deadline_end.is_none(),
            "exigency_details" => opt(&self.exigency_details),
            "benefit_number" => opt(&self.benefit_number),
            "benefit_date" => self.benefit_date.is_none(),
            "dcb_date" => self.dcb_date.is_none(),
            "appeal_outcome" => opt(&self.appeal_outcome),
            "missing_docs" => self.missing_docs.is_empty(),
            "tags" => self.tags.is_empty(),
            "files" => self.files.is_empty(),
            _ => true,
        }
    }
}

/// Derive a child internal id from a parent's. First derivation appends
/// `-R` (or `-MS`); later ones increment a trailing numeral, so
/// `2024.010-R` becomes `2024.010-R2`.
pub fn derived_internal_id(parent: &str, marker: &str) -> String {
    let suffix = format!("-{marker}");
    if let Some(pos) = parent.rfind(&suffix) {
        let rest = &parent[pos + suffix.len()..];
        if rest.chars().all(|c| c.is_ascii_digit()) {
            let n: u32 = rest.parse().unwrap_or(1);
            return format!("{}{}{}", &parent[..pos], suffix, n + 1);
        }
    }
    format!("{parent}{suffix}")
}

/// Store key derived from an internal id (`2024.010-R` -> `c-2024-010-r`)
pub fn case_id_for(internal_id: &str) -> String {
    let slug: String = internal_id
        .chars()
        .map(|c| match c {
            '.' | ' ' | '/' => '-',
            c => c.to_ascii_lowercase(),
        })
        .collect();
    format!("c-{slug}")
}

/// Dates in history lines use the Brazilian day-first format
pub fn br_date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}
