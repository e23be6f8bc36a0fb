use chrono::{DateTime, Duration, NaiveDate, Utc};

use crate::io::store::{CaseStore, StoreError};
use crate::model::board::{HEARING_COLUMN, ORDINARIO_COLUMN, PAYMENT_COLUMN, View};
use crate::model::case::{
    ACTION_UPDATE, AppealStatus, Case, MandadoSeguranca, MsReason, MsStatus, SYSTEM_ACTOR,
    TAG_A_RECEBER, TAG_COM_MS, TAG_CONCEDIDO, TAG_FALTA_DOCS, TAG_INDEFERIDO,
    TAG_MANDADO_SEGURANCA, TAG_MS_IMPETRADO, TAG_MS_SOLICITADO, TAG_PARCIALMENTE_PROVIDO,
    Urgency, br_date,
};
use crate::model::config::User;
use crate::model::transition::{ConclusionOutcome, ReturnMode, TransitionForm, TransitionType};

/// Administrative appeal window used to seed a split child's deadlines
/// from the decision date.
const APPEAL_WINDOW_DAYS: i64 = 30;

/// A writ filing that must be mirrored onto the parent case after the
/// primary move persists.
#[derive(Debug, Clone, PartialEq)]
pub struct IncidentalFiling {
    pub parent_id: String,
    pub npu: String,
    pub filing_date: NaiveDate,
}

/// Everything a transition did beyond mutating the case in place.
#[derive(Debug)]
pub struct TransitionEffect {
    /// Log lines to become history entries, attributed to the acting user.
    pub logs: Vec<String>,
    /// Derived case to create (appeal split or return clone).
    pub child: Option<Case>,
    /// Cross-case writ sync to run after the primary save.
    pub incidental: Option<IncidentalFiling>,
    /// Overrides the requested drop destination (partial conclusion
    /// redirects to the payment column).
    pub destination: Option<(View, String)>,
    /// False when the source case must stay exactly where (and as) it is.
    pub move_source: bool,
}

impl Default for TransitionEffect {
    fn default() -> TransitionEffect {
        TransitionEffect {
            logs: Vec::new(),
            child: None,
            incidental: None,
            destination: None,
            move_source: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Transition execution
// ---------------------------------------------------------------------------

/// Apply a matched transition's structured data to the case. The caller
/// has already validated required fields; absent optional fields simply
/// leave their branch out. The case's view/column are not touched here;
/// the finalizer applies the (possibly overridden) destination.
pub fn execute_transition(
    case: &mut Case,
    kind: TransitionType,
    dest_column: &str,
    form: &TransitionForm,
    acting: &User,
    users: &[User],
    now: DateTime<Utc>,
) -> TransitionEffect {
    let today = now.date_naive();
    let mut effect = TransitionEffect::default();

    match kind {
        TransitionType::Pendency => {
            case.missing_docs = form.missing_docs.clone();
            if case.missing_docs.is_empty() {
                effect
                    .logs
                    .push("Caso marcado com documentação pendente".to_string());
            } else {
                case.add_tag(TAG_FALTA_DOCS);
                effect.logs.push(format!(
                    "Documentação pendente: {}",
                    case.missing_docs.join(", ")
                ));
            }
        }

        TransitionType::ProtocolInss => {
            if dest_column == HEARING_COLUMN {
                // The hearing column captures an expert-exam appointment
                // instead of a protocol number.
                if let Some(date) = form.pericia_date {
                    case.pericia_date = Some(date);
                    case.pericia_location = form.pericia_location.clone();
                    match &case.pericia_location {
                        Some(location) => effect.logs.push(format!(
                            "Perícia agendada para {} em {}",
                            br_date(date),
                            location
                        )),
                        None => effect
                            .logs
                            .push(format!("Perícia agendada para {}", br_date(date))),
                    }
                }
            } else if let Some(number) = &form.protocol_number {
                let date = form.protocol_date.unwrap_or(today);
                case.protocol_number = Some(number.clone());
                case.protocol_date = Some(date);
                effect.logs.push(format!(
                    "Protocolado no INSS sob nº {} em {}",
                    number,
                    br_date(date)
                ));
            }

            // A protocol on a requested writ is the filing itself; mirror
            // it onto the parent case.
            if let Some(parent_id) = &case.parent_case_id
                && (case.has_tag(TAG_MANDADO_SEGURANCA) || case.has_tag(TAG_MS_SOLICITADO))
                && let Some(npu) = &case.protocol_number
            {
                effect.incidental = Some(IncidentalFiling {
                    parent_id: parent_id.clone(),
                    npu: npu.clone(),
                    filing_date: case.protocol_date.unwrap_or(today),
                });
            }
        }

        TransitionType::ProtocolAppeal => {
            if let Some(number) = &form.protocol_number {
                let date = form.protocol_date.unwrap_or(today);
                if dest_column == ORDINARIO_COLUMN {
                    case.appeal_ordinario_protocol = Some(number.clone());
                    case.appeal_ordinario_date = Some(date);
                    case.appeal_ordinario_status = Some(AppealStatus::Aguardando);
                    effect.logs.push(format!(
                        "Recurso ordinário protocolado sob nº {} em {}",
                        number,
                        br_date(date)
                    ));
                } else {
                    case.appeal_especial_protocol = Some(number.clone());
                    case.appeal_especial_date = Some(date);
                    case.appeal_especial_status = Some(AppealStatus::Aguardando);
                    effect.logs.push(format!(
                        "Recurso especial protocolado sob nº {} em {}",
                        number,
                        br_date(date)
                    ));
                }
            }
        }

        TransitionType::AppealReturn => {
            if let Some(outcome) = &form.appeal_outcome {
                let date = form.decision_date.unwrap_or(today);
                case.appeal_decision_date = Some(date);
                case.appeal_outcome = Some(outcome.clone());
                effect.logs.push(format!(
                    "Recurso decidido em {}: {}",
                    br_date(date),
                    outcome
                ));
            }
        }

        TransitionType::Deadline => {
            if let Some(end) = form.deadline_end {
                case.deadline_start = Some(form.deadline_start.unwrap_or(today));
                case.deadline_end = Some(end);
                case.exigency_details = form.exigency_details.clone();
                match &case.exigency_details {
                    Some(details) => effect
                        .logs
                        .push(format!("Exigência até {}: {}", br_date(end), details)),
                    None => effect.logs.push(format!("Exigência até {}", br_date(end))),
                }
            }
        }

        TransitionType::ConclusionNb => {
            if let Some(outcome) = form.outcome {
                if let Some(nb) = &form.benefit_number {
                    case.benefit_number = Some(nb.clone());
                    case.benefit_date = Some(form.benefit_date.unwrap_or(today));
                    effect
                        .logs
                        .push(format!("Benefício concluído sob NB {}", nb));
                }
                match outcome {
                    ConclusionOutcome::Partial => {
                        // Granted part goes to payment; the denied part
                        // continues as a fresh appeal case.
                        effect.destination =
                            Some((View::Decisorio, PAYMENT_COLUMN.to_string()));
                        if let Some(dcb) = form.dcb_date {
                            case.dcb_date = Some(dcb);
                        }
                        case.add_tag(TAG_PARCIALMENTE_PROVIDO);
                        case.add_tag(TAG_A_RECEBER);
                        case.urgency = Urgency::High;
                        effect
                            .logs
                            .push("Concessão parcial: parcela deferida a receber".to_string());

                        let decision = form.decision_date.unwrap_or(today);
                        let mut child = case.split_child(&acting.name, now);
                        child.deadline_start = Some(decision);
                        child.deadline_end = Some(decision + Duration::days(APPEAL_WINDOW_DAYS));
                        effect.logs.push(format!(
                            "Recurso da parcela indeferida aberto ({})",
                            child.internal_id
                        ));
                        effect.child = Some(child);
                    }
                    ConclusionOutcome::Granted => {
                        if let Some(dcb) = form.dcb_date {
                            case.dcb_date = Some(dcb);
                        }
                        case.swap_tag(TAG_INDEFERIDO, TAG_CONCEDIDO);
                        if dest_column == PAYMENT_COLUMN {
                            case.add_tag(TAG_A_RECEBER);
                        }
                        effect.logs.push("Benefício concedido".to_string());
                    }
                    ConclusionOutcome::Denied => {
                        if let Some(end) = form.deadline_end {
                            case.deadline_end = Some(end);
                        }
                        case.swap_tag(TAG_CONCEDIDO, TAG_INDEFERIDO);
                        effect.logs.push("Benefício indeferido".to_string());
                    }
                }
            }
        }

        TransitionType::AdminReturn => {
            if form.return_mode == Some(ReturnMode::Clone) {
                // The source case stays byte-for-byte untouched; only a
                // fresh filing is opened.
                let child = case.return_clone(
                    form.protocol_number.clone(),
                    form.protocol_date,
                    &acting.name,
                    now,
                );
                effect.move_source = false;
                effect.child = Some(child);
                return effect;
            }
            effect
                .logs
                .push("Retornado à triagem administrativa".to_string());
        }
    }

    // Reassignment rides along with any of the branches above.
    if let Some(new_id) = &form.new_responsible_id
        && case.responsible_id.as_deref() != Some(new_id.as_str())
        && let Some(user) = users.iter().find(|u| &u.id == new_id)
    {
        case.responsible_id = Some(user.id.clone());
        case.responsible_name = Some(user.name.clone());
        effect
            .logs
            .push(format!("Responsável alterado para {}", user.name));
    }

    effect
}

// ---------------------------------------------------------------------------
// Incidental writ sync
// ---------------------------------------------------------------------------

/// Mirror a writ filing onto the parent case: append the MandadoSeguranca
/// record and swap the request tag for the filed tags. Runs after the
/// primary move has persisted; returns false when the parent is gone.
pub fn sync_incidental_filing<S: CaseStore>(
    store: &mut S,
    filing: &IncidentalFiling,
    now: DateTime<Utc>,
) -> Result<bool, StoreError> {
    let Some(mut parent) = store.get_case(&filing.parent_id)? else {
        return Ok(false);
    };

    parent.mandados_seguranca.push(MandadoSeguranca {
        npu: filing.npu.clone(),
        filing_date: filing.filing_date,
        status: MsStatus::Aguardando,
        reason: MsReason::DemoraAnalise,
    });
    parent.remove_tag(TAG_MS_SOLICITADO);
    parent.add_tag(TAG_MS_IMPETRADO);
    parent.add_tag(TAG_COM_MS);
    parent.log_history(
        ACTION_UPDATE,
        format!("Mandado de Segurança impetrado (NPU {})", filing.npu),
        SYSTEM_ACTOR,
        now,
    );
    parent.last_update = now;

    store.save_case(&parent)?;
    Ok(true)
}
