use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::board::{
    ADMIN_TRIAGE_COLUMN, ESPECIAL_COLUMN, HEARING_COLUMN, ORDINARIO_COLUMN, PAYMENT_COLUMN, View,
};

/// Structured-data flows that can gate a move
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransitionType {
    ProtocolInss,
    ProtocolAppeal,
    Deadline,
    ConclusionNb,
    Pendency,
    AdminReturn,
    AppealReturn,
}

impl TransitionType {
    pub fn key(self) -> &'static str {
        match self {
            TransitionType::ProtocolInss => "PROTOCOL_INSS",
            TransitionType::ProtocolAppeal => "PROTOCOL_APPEAL",
            TransitionType::Deadline => "DEADLINE",
            TransitionType::ConclusionNb => "CONCLUSION_NB",
            TransitionType::Pendency => "PENDENCY",
            TransitionType::AdminReturn => "ADMIN_RETURN",
            TransitionType::AppealReturn => "APPEAL_RETURN",
        }
    }
}

/// Outcome of a benefit-number conclusion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConclusionOutcome {
    Granted,
    Denied,
    Partial,
}

impl ConclusionOutcome {
    pub fn key(self) -> &'static str {
        match self {
            ConclusionOutcome::Granted => "GRANTED",
            ConclusionOutcome::Denied => "DENIED",
            ConclusionOutcome::Partial => "PARTIAL",
        }
    }

    pub fn parse(s: &str) -> Option<ConclusionOutcome> {
        match s.to_ascii_uppercase().as_str() {
            "GRANTED" => Some(ConclusionOutcome::Granted),
            "DENIED" => Some(ConclusionOutcome::Denied),
            "PARTIAL" => Some(ConclusionOutcome::Partial),
            _ => None,
        }
    }
}

/// How a return-to-admin drop is carried out: move the case back, or leave
/// it where it is and open a fresh filing as a clone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReturnMode {
    #[default]
    Move,
    Clone,
}

impl ReturnMode {
    pub fn parse(s: &str) -> Option<ReturnMode> {
        match s.to_ascii_uppercase().as_str() {
            "MOVE" => Some(ReturnMode::Move),
            "CLONE" => Some(ReturnMode::Clone),
            _ => None,
        }
    }
}

/// One row of the transition table: moves landing on `to` (from `from`,
/// or from anywhere when `from` is `None`) require the given flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    pub to: String,
    pub kind: TransitionType,
}

/// First rule whose `to` matches the destination and whose `from` matches
/// the source or is the wildcard. Declaration order is the priority order.
pub fn match_transition<'a>(
    rules: &'a [TransitionRule],
    from: &str,
    to: &str,
) -> Option<&'a TransitionRule> {
    rules
        .iter()
        .find(|r| r.to == to && r.from.as_deref().map_or(true, |f| f == from))
}

/// The standard transition table
pub fn default_transitions() -> Vec<TransitionRule> {
    fn any_to(to: &str, kind: TransitionType) -> TransitionRule {
        TransitionRule {
            from: None,
            to: to.to_string(),
            kind,
        }
    }
    vec![
        any_to("adm_doc_pendente", TransitionType::Pendency),
        any_to("adm_protocolado", TransitionType::ProtocolInss),
        any_to("aux_protocolado", TransitionType::ProtocolInss),
        any_to(HEARING_COLUMN, TransitionType::ProtocolInss),
        any_to("jud_protocolado", TransitionType::ProtocolInss),
        any_to("adm_exigencia", TransitionType::Deadline),
        any_to(ORDINARIO_COLUMN, TransitionType::ProtocolAppeal),
        any_to(ESPECIAL_COLUMN, TransitionType::ProtocolAppeal),
        any_to("rec_decidido", TransitionType::AppealReturn),
        any_to("dec_concluido", TransitionType::ConclusionNb),
        any_to(PAYMENT_COLUMN, TransitionType::ConclusionNb),
        any_to(ADMIN_TRIAGE_COLUMN, TransitionType::AdminReturn),
    ]
}

/// Structured input collected for a matched transition. Everything is
/// optional at the type level; `missing_fields` names what a given
/// transition still needs before it can execute.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransitionForm {
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
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<ConclusionOutcome>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dcb_date: Option<NaiveDate>,
    /// Appeal decision date (APPEAL_RETURN) or conclusion decision date
    /// (CONCLUSION_NB, seeds the split child's deadlines)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub appeal_outcome: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing_docs: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_mode: Option<ReturnMode>,
    /// Reassign the case while moving it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_responsible_id: Option<String>,
}

/// Form fields a transition cannot execute without. The hearing column
/// wants a scheduled date instead of a protocol number.
pub fn required_fields(kind: TransitionType, destination_column: &str) -> &'static [&'static str] {
    match kind {
        TransitionType::ProtocolInss if destination_column == HEARING_COLUMN => &["pericia_date"],
        TransitionType::ProtocolInss => &["protocol_number"],
        TransitionType::ProtocolAppeal => &["protocol_number"],
        TransitionType::AppealReturn => &["appeal_outcome"],
        TransitionType::Deadline => &["deadline_end"],
        TransitionType::ConclusionNb => &["outcome"],
        TransitionType::Pendency | TransitionType::AdminReturn => &[],
    }
}

impl TransitionForm {
    fn has(&self, field: &str) -> bool {
        match field {
            "protocol_number" => self.protocol_number.is_some(),
            "pericia_date" => self.pericia_date.is_some(),
            "deadline_end" => self.deadline_end.is_some(),
            "appeal_outcome" => self.appeal_outcome.is_some(),
            "outcome" => self.outcome.is_some(),
            _ => true,
        }
    }

    pub fn missing_fields(
        &self,
        kind: TransitionType,
        destination_column: &str,
    ) -> Vec<&'static str> {
        required_fields(kind, destination_column)
            .iter()
            .copied()
            .filter(|f| !self.has(f))
            .collect()
    }
}

/// A move paused while its transition form is collected
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingMove {
    pub case_id: String,
    pub source_view: View,
    pub source_column_id: String,
    pub target_view: View,
    pub target_column_id: String,
    pub kind: TransitionType,
    /// Acting user's id, carried through to history attribution
    pub user_id: String,
}
