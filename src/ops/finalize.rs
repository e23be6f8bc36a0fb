use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::io::recovery::{
    RecoveryCategory, RecoveryEntry, log_case_write_failure, log_recovery, log_sync_failure,
};
use crate::io::store::{CaseStore, StoreError};
use crate::model::board::{DropError, DropTarget, View, resolve_drop};
use crate::model::case::{ACTION_MOVEMENT, Case, SYSTEM_ACTOR, TAG_MS_SOLICITADO};
use crate::model::config::{OfficeConfig, User};
use crate::model::transition::{PendingMove, TransitionForm, TransitionType, match_transition};
use crate::ops::automation::run_column_rules;
use crate::ops::executor::{TransitionEffect, execute_transition, sync_incidental_filing};

#[derive(Debug, Error)]
pub enum MoveError {
    #[error(transparent)]
    Drop(#[from] DropError),
    #[error("no move is pending")]
    NoPending,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// What a move request came back with.
#[derive(Debug)]
pub enum MoveRequest {
    /// The move ran to completion in one step.
    Done(MoveOutcome),
    /// A transition matched; collect the listed fields and call
    /// `submit_form`.
    NeedsForm {
        kind: TransitionType,
        missing: Vec<&'static str>,
    },
}

#[derive(Debug, PartialEq)]
pub enum MoveOutcome {
    /// Persisted. `child_id` is set when a linked case was created.
    Completed {
        case_id: String,
        child_id: Option<String>,
    },
    /// An automation rule vetoed the move; nothing was persisted.
    Blocked { reason: String },
    /// Drop on the case's own column; nothing recorded.
    Noop,
    /// Unknown case or user; nothing happened.
    Ignored,
}

// ---------------------------------------------------------------------------
// Board session
// ---------------------------------------------------------------------------

/// One user's interaction with the boards: resolves drops, pauses moves
/// that need a transition form, and finishes them against the store. The
/// paused-move slot is plain data so the CLI can park it in .state.json
/// between invocations.
pub struct BoardSession<S: CaseStore> {
    store: S,
    config: OfficeConfig,
    tramita_dir: PathBuf,
    pending: Option<PendingMove>,
}

impl<S: CaseStore> BoardSession<S> {
    pub fn new(store: S, config: OfficeConfig, tramita_dir: &Path) -> BoardSession<S> {
        BoardSession {
            store,
            config,
            tramita_dir: tramita_dir.to_path_buf(),
            pending: None,
        }
    }

    pub fn with_pending(mut self, pending: Option<PendingMove>) -> BoardSession<S> {
        self.pending = pending;
        self
    }

    pub fn pending(&self) -> Option<&PendingMove> {
        self.pending.as_ref()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Resolve a drop and either finish the move immediately or pause it
    /// for its transition form. A new request supersedes any paused move.
    pub fn request_move(
        &mut self,
        case_id: &str,
        target: &str,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<MoveRequest, MoveError> {
        self.pending = None;

        let Some(case) = self.store.get_case(case_id)? else {
            return Ok(MoveRequest::Done(MoveOutcome::Ignored));
        };
        let Some(user) = self.config.user(user_id).cloned() else {
            return Ok(MoveRequest::Done(MoveOutcome::Ignored));
        };

        let target = resolve_drop(&self.config.boards, &self.config.zones, case.view, target)?;
        let (dest_view, dest_column) = match target {
            DropTarget::WritClone => {
                return self.file_writ_request(case, &user, now).map(MoveRequest::Done);
            }
            DropTarget::Column { view, column_id } => (view, column_id),
        };

        if dest_view == case.view && dest_column == case.column_id {
            return Ok(MoveRequest::Done(MoveOutcome::Noop));
        }

        if let Some(rule) = match_transition(&self.config.transitions, &case.column_id, &dest_column)
        {
            let kind = rule.kind;
            let missing = TransitionForm::default().missing_fields(kind, &dest_column);
            self.pending = Some(PendingMove {
                case_id: case.id.clone(),
                source_view: case.view,
                source_column_id: case.column_id.clone(),
                target_view: dest_view,
                target_column_id: dest_column,
                kind,
                user_id: user.id.clone(),
            });
            return Ok(MoveRequest::NeedsForm { kind, missing });
        }

        // No transition involved: a plain move, recorded with one line.
        let from_title = self
            .config
            .column_title(case.view, &case.column_id)
            .to_string();
        let to_title = self.config.column_title(dest_view, &dest_column).to_string();
        let mut effect = TransitionEffect::default();
        effect.logs.push(if dest_view == case.view {
            format!("Movido de {} para {}", from_title, to_title)
        } else {
            format!(
                "Movido de {} ({}) para {} ({})",
                from_title,
                case.view.title(),
                to_title,
                dest_view.title()
            )
        });
        self.finalize_move(case, effect, dest_view, &dest_column, &user, now)
            .map(MoveRequest::Done)
    }

    /// Complete a paused move with its transition form. Reports the still
    /// missing fields (keeping the move paused) when the form is short.
    pub fn submit_form(
        &mut self,
        form: &TransitionForm,
        now: DateTime<Utc>,
    ) -> Result<MoveRequest, MoveError> {
        let Some(pending) = self.pending.clone() else {
            return Err(MoveError::NoPending);
        };

        let missing = form.missing_fields(pending.kind, &pending.target_column_id);
        if !missing.is_empty() {
            return Ok(MoveRequest::NeedsForm {
                kind: pending.kind,
                missing,
            });
        }

        // Re-read the case: the paused slot may have outlived other
        // edits, and the last write wins.
        let Some(mut working) = self.store.get_case(&pending.case_id)? else {
            self.pending = None;
            return Ok(MoveRequest::Done(MoveOutcome::Ignored));
        };
        let Some(user) = self.config.user(&pending.user_id).cloned() else {
            self.pending = None;
            return Ok(MoveRequest::Done(MoveOutcome::Ignored));
        };

        let effect = execute_transition(
            &mut working,
            pending.kind,
            &pending.target_column_id,
            form,
            &user,
            &self.config.users,
            now,
        );
        self.finalize_move(
            working,
            effect,
            pending.target_view,
            &pending.target_column_id,
            &user,
            now,
        )
        .map(MoveRequest::Done)
    }

    /// Abandon the paused move. The case was never touched.
    pub fn cancel(&mut self) -> Option<PendingMove> {
        self.pending.take()
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    /// Writ zone drop: the source stays in place (it only gains the
    /// request tag and one history line) and a linked judicial case is
    /// opened. The new case is saved before the source is updated.
    fn file_writ_request(
        &mut self,
        mut source: Case,
        user: &User,
        now: DateTime<Utc>,
    ) -> Result<MoveOutcome, MoveError> {
        let child = source.writ_child(&user.name, now);
        source.add_tag(TAG_MS_SOLICITADO);
        source.log_history(
            ACTION_MOVEMENT,
            format!("Mandado de Segurança solicitado ({})", child.internal_id),
            &user.name,
            now,
        );
        source.last_update = now;

        if let Err(e) = self.store.save_case(&child) {
            log_case_write_failure(&self.tramita_dir, &child, &e.to_string());
            return Err(e.into());
        }
        if let Err(e) = self.store.save_case(&source) {
            log_case_write_failure(&self.tramita_dir, &source, &e.to_string());
            return Err(e.into());
        }
        Ok(MoveOutcome::Completed {
            case_id: source.id,
            child_id: Some(child.id),
        })
    }

    /// The back half of every move: apply the destination (the effect may
    /// override it), run column rules and honor a veto, write history,
    /// persist, then queue notifications and the parent sync.
    fn finalize_move(
        &mut self,
        mut working: Case,
        effect: TransitionEffect,
        dest_view: View,
        dest_column: &str,
        user: &User,
        now: DateTime<Utc>,
    ) -> Result<MoveOutcome, MoveError> {
        let (dest_view, dest_column) = match &effect.destination {
            Some((view, column)) => (*view, column.clone()),
            None => (dest_view, dest_column.to_string()),
        };

        let mut notifications = Vec::new();
        if effect.move_source {
            let entered_new_column = working.column_id != dest_column;
            working.view = dest_view;
            working.column_id = dest_column.clone();

            let mut automation_logs = Vec::new();
            if entered_new_column {
                let run = run_column_rules(
                    &mut working,
                    &self.config.rules,
                    &dest_column,
                    &self.config.users,
                    now,
                );
                if let Some(reason) = run.block {
                    // Veto: the move is abandoned wholesale, nothing is
                    // persisted and no history is written.
                    self.pending = None;
                    return Ok(MoveOutcome::Blocked { reason });
                }
                automation_logs = run.logs;
                notifications = run.notifications;
            }

            for line in &effect.logs {
                working.log_history(ACTION_MOVEMENT, line.clone(), &user.name, now);
            }
            for line in &automation_logs {
                working.log_history(ACTION_MOVEMENT, line.clone(), SYSTEM_ACTOR, now);
            }
            working.last_update = now;
        }

        let mut child_id = None;
        if let Some(child) = &effect.child {
            if let Err(e) = self.store.save_case(child) {
                log_case_write_failure(&self.tramita_dir, child, &e.to_string());
                return Err(e.into());
            }
            child_id = Some(child.id.clone());
        }
        if effect.move_source
            && let Err(e) = self.store.save_case(&working)
        {
            log_case_write_failure(&self.tramita_dir, &working, &e.to_string());
            return Err(e.into());
        }

        // Cross-case side effects ride behind the primary save; their
        // failures are logged but never roll the move back.
        if let Some(filing) = &effect.incidental {
            match sync_incidental_filing(&mut self.store, filing, now) {
                Ok(true) => {}
                Ok(false) => log_sync_failure(
                    &self.tramita_dir,
                    &filing.parent_id,
                    &filing.npu,
                    "parent case not found",
                ),
                Err(e) => log_sync_failure(
                    &self.tramita_dir,
                    &filing.parent_id,
                    &filing.npu,
                    &e.to_string(),
                ),
            }
        }

        if !notifications.is_empty()
            && let Err(e) = self.store.save_notifications(&notifications)
        {
            log_recovery(
                &self.tramita_dir,
                RecoveryEntry {
                    timestamp: now,
                    category: RecoveryCategory::Write,
                    description: "failed to queue notifications".to_string(),
                    fields: vec![
                        ("Case".to_string(), working.id.clone()),
                        ("Error".to_string(), e.to_string()),
                    ],
                    body: String::new(),
                },
            );
        }

        self.pending = None;
        Ok(MoveOutcome::Completed {
            case_id: working.id,
            child_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::board::{
        ADMIN_TRIAGE_COLUMN, APPEAL_TRIAGE_COLUMN, JUDICIAL_TRIAGE_COLUMN, PAYMENT_COLUMN,
        default_boards, default_zones,
    };
    use crate::model::case::{
        ACTION_CREATION, TAG_A_RECEBER, TAG_COM_MS, TAG_CONCEDIDO, TAG_INDEFERIDO,
        TAG_MANDADO_SEGURANCA, TAG_MS_IMPETRADO, TAG_PARCIALMENTE_PROVIDO, TAG_RECURSO_PARCIAL,
        TAG_URGENTE, Urgency,
    };
    use crate::model::config::OfficeInfo;
    use crate::model::transition::{ConclusionOutcome, default_transitions};
    use crate::model::workflow::{Condition, Notification, RuleAction, Trigger, WorkflowRule};
    use chrono::TimeZone;
    use std::collections::HashMap;
    use std::io;
    use tempfile::TempDir;

    /// In-memory store; `fail_saves_for` makes one case id unwritable.
    #[derive(Default)]
    struct MemStore {
        cases: HashMap<String, Case>,
        notifications: Vec<Notification>,
        fail_saves_for: Option<String>,
    }

    impl CaseStore for MemStore {
        fn save_case(&mut self, case: &Case) -> Result<(), StoreError> {
            if self.fail_saves_for.as_deref() == Some(case.id.as_str()) {
                return Err(StoreError::WriteError {
                    path: PathBuf::from(format!("{}.json", case.id)),
                    source: io::Error::new(io::ErrorKind::PermissionDenied, "acesso negado"),
                });
            }
            self.cases.insert(case.id.clone(), case.clone());
            Ok(())
        }

        fn get_case(&self, id: &str) -> Result<Option<Case>, StoreError> {
            Ok(self.cases.get(id).cloned())
        }

        fn all_cases(&self) -> Result<Vec<Case>, StoreError> {
            let mut all: Vec<Case> = self.cases.values().cloned().collect();
            all.sort_by(|a, b| a.internal_id.cmp(&b.internal_id));
            Ok(all)
        }

        fn save_notifications(&mut self, notifications: &[Notification]) -> Result<(), StoreError> {
            self.notifications.extend(notifications.iter().cloned());
            Ok(())
        }

        fn notifications(&self) -> Result<Vec<Notification>, StoreError> {
            Ok(self.notifications.clone())
        }

        fn mark_notifications_read(&mut self) -> Result<(), StoreError> {
            for n in &mut self.notifications {
                n.read = true;
            }
            Ok(())
        }
    }

    fn test_config(rules: Vec<WorkflowRule>) -> OfficeConfig {
        OfficeConfig {
            office: OfficeInfo {
                name: "Escritório Teste".to_string(),
            },
            users: vec![
                User {
                    id: "u1".to_string(),
                    name: "Ana".to_string(),
                },
                User {
                    id: "u2".to_string(),
                    name: "Bruno".to_string(),
                },
            ],
            boards: default_boards(),
            zones: default_zones(),
            transitions: default_transitions(),
            rules,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 2, 1, 12, 0, 0).unwrap()
    }

    fn sample_case(id: &str, internal: &str, view: View, column: &str) -> Case {
        Case::new(
            id.to_string(),
            internal.to_string(),
            "Maria Silva".to_string(),
            view,
            column.to_string(),
            "Ana",
            now(),
        )
    }

    fn session_with(
        cases: Vec<Case>,
        rules: Vec<WorkflowRule>,
    ) -> (BoardSession<MemStore>, TempDir) {
        let tmp = TempDir::new().unwrap();
        let mut store = MemStore::default();
        for case in cases {
            store.save_case(&case).unwrap();
        }
        let session = BoardSession::new(store, test_config(rules), tmp.path());
        (session, tmp)
    }

    fn outcome(request: MoveRequest) -> MoveOutcome {
        match request {
            MoveRequest::Done(outcome) => outcome,
            MoveRequest::NeedsForm { kind, .. } => {
                panic!("expected a finished move, got a form for {:?}", kind)
            }
        }
    }

    #[test]
    fn plain_move_appends_one_generic_entry() {
        let case = sample_case("c1", "2024.001", View::Admin, ADMIN_TRIAGE_COLUMN);
        let (mut session, _tmp) = session_with(vec![case], vec![]);

        let req = session.request_move("c1", "adm_analise", "u1", now()).unwrap();
        assert_eq!(
            outcome(req),
            MoveOutcome::Completed {
                case_id: "c1".to_string(),
                child_id: None,
            }
        );

        let case = session.store().get_case("c1").unwrap().unwrap();
        assert_eq!(case.column_id, "adm_analise");
        assert_eq!(case.history.len(), 2);
        let entry = &case.history[1];
        assert_eq!(entry.action, ACTION_MOVEMENT);
        assert_eq!(entry.user, "Ana");
        assert_eq!(entry.details, "Movido de Triagem para Em Análise");
    }

    #[test]
    fn cross_board_move_names_both_boards() {
        let case = sample_case("c1", "2024.001", View::Admin, ADMIN_TRIAGE_COLUMN);
        let (mut session, _tmp) = session_with(vec![case], vec![]);

        let req = session
            .request_move("c1", "zone_decisorio", "u1", now())
            .unwrap();
        outcome(req);

        let case = session.store().get_case("c1").unwrap().unwrap();
        assert_eq!(case.view, View::Decisorio);
        assert_eq!(case.column_id, "dec_analise");
        assert_eq!(
            case.history[1].details,
            "Movido de Triagem (Administrativo) para Em Análise (Mesa Decisória)"
        );
    }

    #[test]
    fn drop_on_own_column_is_a_noop() {
        let case = sample_case("c1", "2024.001", View::Admin, ADMIN_TRIAGE_COLUMN);
        let (mut session, _tmp) = session_with(vec![case.clone()], vec![]);

        let req = session
            .request_move("c1", ADMIN_TRIAGE_COLUMN, "u1", now())
            .unwrap();
        assert_eq!(outcome(req), MoveOutcome::Noop);
        assert_eq!(session.store().get_case("c1").unwrap().unwrap(), case);
    }

    #[test]
    fn unknown_case_and_unknown_user_are_ignored() {
        let case = sample_case("c1", "2024.001", View::Admin, ADMIN_TRIAGE_COLUMN);
        let (mut session, _tmp) = session_with(vec![case], vec![]);

        let req = session.request_move("ghost", "adm_analise", "u1", now()).unwrap();
        assert_eq!(outcome(req), MoveOutcome::Ignored);

        let req = session.request_move("c1", "adm_analise", "ghost", now()).unwrap();
        assert_eq!(outcome(req), MoveOutcome::Ignored);
        let case = session.store().get_case("c1").unwrap().unwrap();
        assert_eq!(case.column_id, ADMIN_TRIAGE_COLUMN);
    }

    #[test]
    fn unknown_target_is_an_error() {
        let case = sample_case("c1", "2024.001", View::Admin, ADMIN_TRIAGE_COLUMN);
        let (mut session, _tmp) = session_with(vec![case], vec![]);

        let err = session.request_move("c1", "nope", "u1", now()).unwrap_err();
        assert!(matches!(err, MoveError::Drop(DropError::UnknownTarget(_))));
    }

    #[test]
    fn zone_outside_its_boards_is_unavailable() {
        let case = sample_case("c1", "2024.001", View::Judicial, JUDICIAL_TRIAGE_COLUMN);
        let (mut session, _tmp) = session_with(vec![case], vec![]);

        let err = session
            .request_move("c1", "zone_pericia", "u1", now())
            .unwrap_err();
        assert!(matches!(
            err,
            MoveError::Drop(DropError::ZoneUnavailable { .. })
        ));
    }

    #[test]
    fn transition_pauses_for_its_form() {
        let case = sample_case("c1", "2024.001", View::Admin, ADMIN_TRIAGE_COLUMN);
        let (mut session, _tmp) = session_with(vec![case.clone()], vec![]);

        let req = session
            .request_move("c1", "adm_protocolado", "u1", now())
            .unwrap();
        match req {
            MoveRequest::NeedsForm { kind, missing } => {
                assert_eq!(kind, TransitionType::ProtocolInss);
                assert_eq!(missing, vec!["protocol_number"]);
            }
            MoveRequest::Done(o) => panic!("expected a form, got {:?}", o),
        }
        assert!(session.pending().is_some());
        // nothing persisted while the form is open
        assert_eq!(session.store().get_case("c1").unwrap().unwrap(), case);
    }

    #[test]
    fn expert_exam_move_records_one_entry() {
        let case = sample_case("c1", "2024.001", View::Admin, ADMIN_TRIAGE_COLUMN);
        let (mut session, _tmp) = session_with(vec![case], vec![]);

        let req = session.request_move("c1", "zone_pericia", "u1", now()).unwrap();
        match req {
            MoveRequest::NeedsForm { missing, .. } => assert_eq!(missing, vec!["pericia_date"]),
            MoveRequest::Done(o) => panic!("expected a form, got {:?}", o),
        }

        let form = TransitionForm {
            pericia_date: chrono::NaiveDate::from_ymd_opt(2024, 3, 1),
            pericia_location: Some("APS Centro".to_string()),
            ..TransitionForm::default()
        };
        let req = session.submit_form(&form, now()).unwrap();
        outcome(req);
        assert!(session.pending().is_none());

        let case = session.store().get_case("c1").unwrap().unwrap();
        assert_eq!(case.view, View::AuxDoenca);
        assert_eq!(case.column_id, "aux_pericia");
        assert_eq!(case.pericia_location.as_deref(), Some("APS Centro"));
        // creation plus exactly one entry for the whole transition
        assert_eq!(case.history.len(), 2);
        assert_eq!(case.history[0].action, ACTION_CREATION);
        assert_eq!(
            case.history[1].details,
            "Perícia agendada para 01/03/2024 em APS Centro"
        );
        assert_eq!(case.history[1].user, "Ana");
    }

    #[test]
    fn short_form_keeps_the_move_paused() {
        let case = sample_case("c1", "2024.001", View::Admin, ADMIN_TRIAGE_COLUMN);
        let (mut session, _tmp) = session_with(vec![case.clone()], vec![]);

        session
            .request_move("c1", "adm_protocolado", "u1", now())
            .unwrap();
        let req = session.submit_form(&TransitionForm::default(), now()).unwrap();
        match req {
            MoveRequest::NeedsForm { missing, .. } => assert_eq!(missing, vec!["protocol_number"]),
            MoveRequest::Done(o) => panic!("expected a form, got {:?}", o),
        }
        assert!(session.pending().is_some());
        assert_eq!(session.store().get_case("c1").unwrap().unwrap(), case);
    }

    #[test]
    fn cancel_drops_the_paused_move() {
        let case = sample_case("c1", "2024.001", View::Admin, ADMIN_TRIAGE_COLUMN);
        let (mut session, _tmp) = session_with(vec![case.clone()], vec![]);

        session
            .request_move("c1", "adm_protocolado", "u1", now())
            .unwrap();
        let pending = session.cancel().unwrap();
        assert_eq!(pending.case_id, "c1");
        assert!(session.pending().is_none());
        assert_eq!(session.store().get_case("c1").unwrap().unwrap(), case);
    }

    #[test]
    fn submit_without_a_pending_move_errors() {
        let (mut session, _tmp) = session_with(vec![], vec![]);
        let err = session
            .submit_form(&TransitionForm::default(), now())
            .unwrap_err();
        assert!(matches!(err, MoveError::NoPending));
    }

    #[test]
    fn veto_abandons_the_move_wholesale() {
        let rules = vec![WorkflowRule {
            id: "r1".to_string(),
            name: "Pagamento exige NB".to_string(),
            is_active: true,
            trigger: Trigger::ColumnEnter,
            target_column_id: "dec_analise".to_string(),
            conditions: vec![Condition::FieldEmpty("benefit_number".to_string())],
            actions: vec![RuleAction::BlockMove(
                "Caso sem NB não entra na mesa".to_string(),
            )],
        }];
        let case = sample_case("c1", "2024.001", View::Admin, ADMIN_TRIAGE_COLUMN);
        let (mut session, _tmp) = session_with(vec![case.clone()], rules);

        let req = session
            .request_move("c1", "zone_decisorio", "u1", now())
            .unwrap();
        assert_eq!(
            outcome(req),
            MoveOutcome::Blocked {
                reason: "Caso sem NB não entra na mesa".to_string(),
            }
        );
        // untouched: same column, no history, no notifications
        assert_eq!(session.store().get_case("c1").unwrap().unwrap(), case);
        assert!(session.store().notifications().unwrap().is_empty());
        assert!(session.pending().is_none());
    }

    #[test]
    fn automation_lines_are_attributed_to_the_system() {
        let rules = vec![WorkflowRule {
            id: "r1".to_string(),
            name: "Análise urgente".to_string(),
            is_active: true,
            trigger: Trigger::ColumnEnter,
            target_column_id: "adm_analise".to_string(),
            conditions: vec![],
            actions: vec![
                RuleAction::AddTag(TAG_URGENTE.to_string()),
                RuleAction::SendNotification("Caso entrou em análise".to_string()),
            ],
        }];
        let case = sample_case("c1", "2024.001", View::Admin, ADMIN_TRIAGE_COLUMN);
        let (mut session, _tmp) = session_with(vec![case], rules);

        let req = session.request_move("c1", "adm_analise", "u1", now()).unwrap();
        outcome(req);

        let case = session.store().get_case("c1").unwrap().unwrap();
        assert!(case.has_tag(TAG_URGENTE));
        assert_eq!(case.history.len(), 3);
        assert_eq!(case.history[1].user, "Ana");
        assert_eq!(case.history[2].user, SYSTEM_ACTOR);
        assert_eq!(case.history[2].details, "Etiqueta adicionada: URGENTE");

        let notes = session.store().notifications().unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].message, "Caso entrou em análise");
        assert_eq!(notes[0].internal_id, "2024.001");
        assert!(!notes[0].read);
    }

    #[test]
    fn writ_zone_opens_a_linked_case() {
        let case = sample_case("c1", "2024.001", View::Admin, ADMIN_TRIAGE_COLUMN);
        let (mut session, _tmp) = session_with(vec![case], vec![]);

        let req = session.request_move("c1", "zone_ms", "u1", now()).unwrap();
        assert_eq!(
            outcome(req),
            MoveOutcome::Completed {
                case_id: "c1".to_string(),
                child_id: Some("c-2024-001-ms".to_string()),
            }
        );

        let source = session.store().get_case("c1").unwrap().unwrap();
        // the source does not move boards
        assert_eq!(source.view, View::Admin);
        assert_eq!(source.column_id, ADMIN_TRIAGE_COLUMN);
        assert!(source.has_tag(TAG_MS_SOLICITADO));
        assert_eq!(
            source.history.last().unwrap().details,
            "Mandado de Segurança solicitado (2024.001-MS)"
        );

        let child = session.store().get_case("c-2024-001-ms").unwrap().unwrap();
        assert_eq!(child.view, View::Judicial);
        assert_eq!(child.column_id, JUDICIAL_TRIAGE_COLUMN);
        assert_eq!(child.parent_case_id.as_deref(), Some("c1"));
        assert!(child.has_tag(TAG_MANDADO_SEGURANCA));
        assert!(child.has_tag(TAG_URGENTE));
    }

    #[test]
    fn child_save_failure_aborts_before_the_source() {
        let case = sample_case("c1", "2024.001", View::Admin, ADMIN_TRIAGE_COLUMN);
        let (mut session, tmp) = session_with(vec![case.clone()], vec![]);
        session.store.fail_saves_for = Some("c-2024-001-ms".to_string());

        let err = session.request_move("c1", "zone_ms", "u1", now()).unwrap_err();
        assert!(matches!(err, MoveError::Store(_)));
        // the source was never updated
        assert_eq!(session.store().get_case("c1").unwrap().unwrap(), case);

        let log = std::fs::read_to_string(tmp.path().join(".recovery.log")).unwrap();
        assert!(log.contains("c-2024-001-ms"));
        assert!(log.contains("acesso negado"));
    }

    #[test]
    fn source_save_failure_keeps_the_child_and_logs() {
        let case = sample_case("c1", "2024.001", View::Admin, ADMIN_TRIAGE_COLUMN);
        let (mut session, tmp) = session_with(vec![case], vec![]);
        session.store.fail_saves_for = Some("c1".to_string());

        let err = session.request_move("c1", "zone_ms", "u1", now()).unwrap_err();
        assert!(matches!(err, MoveError::Store(_)));
        assert!(
            session
                .store()
                .get_case("c-2024-001-ms")
                .unwrap()
                .is_some()
        );

        let log = std::fs::read_to_string(tmp.path().join(".recovery.log")).unwrap();
        // the unsaved source is dumped for hand recovery
        assert!(log.contains("\"id\": \"c1\""));
        assert!(log.contains(TAG_MS_SOLICITADO));
    }

    #[test]
    fn writ_protocol_syncs_the_parent() {
        let parent = sample_case("p1", "2024.001", View::Admin, ADMIN_TRIAGE_COLUMN);
        let mut writ = sample_case("w1", "2024.001-MS", View::Judicial, JUDICIAL_TRIAGE_COLUMN);
        writ.parent_case_id = Some("p1".to_string());
        writ.tags.push(TAG_MS_SOLICITADO.to_string());
        let (mut session, _tmp) = session_with(vec![parent, writ], vec![]);

        session
            .request_move("w1", "jud_protocolado", "u1", now())
            .unwrap();
        let form = TransitionForm {
            protocol_number: Some("12345".to_string()),
            protocol_date: chrono::NaiveDate::from_ymd_opt(2024, 1, 10),
            ..TransitionForm::default()
        };
        let req = session.submit_form(&form, now()).unwrap();
        outcome(req);

        let parent = session.store().get_case("p1").unwrap().unwrap();
        assert_eq!(parent.mandados_seguranca.len(), 1);
        assert_eq!(parent.mandados_seguranca[0].npu, "12345");
        assert!(parent.has_tag(TAG_MS_IMPETRADO));
        assert!(parent.has_tag(TAG_COM_MS));
        assert!(!parent.has_tag(TAG_MS_SOLICITADO));
    }

    #[test]
    fn missing_parent_logs_sync_and_completes() {
        let mut writ = sample_case("w1", "2024.001-MS", View::Judicial, JUDICIAL_TRIAGE_COLUMN);
        writ.parent_case_id = Some("ghost".to_string());
        writ.tags.push(TAG_MS_SOLICITADO.to_string());
        let (mut session, tmp) = session_with(vec![writ], vec![]);

        session
            .request_move("w1", "jud_protocolado", "u1", now())
            .unwrap();
        let form = TransitionForm {
            protocol_number: Some("777".to_string()),
            ..TransitionForm::default()
        };
        let req = session.submit_form(&form, now()).unwrap();
        assert!(matches!(outcome(req), MoveOutcome::Completed { .. }));

        // the move stands; only the sync is parked in the log
        let case = session.store().get_case("w1").unwrap().unwrap();
        assert_eq!(case.column_id, "jud_protocolado");
        let log = std::fs::read_to_string(tmp.path().join(".recovery.log")).unwrap();
        assert!(log.contains("ghost"));
        assert!(log.contains("parent case not found"));
    }

    #[test]
    fn partial_conclusion_redirects_and_splits() {
        let case = sample_case("c1", "2024.010", View::Decisorio, "dec_analise");
        let (mut session, _tmp) = session_with(vec![case], vec![]);

        let req = session.request_move("c1", "dec_concluido", "u1", now()).unwrap();
        match req {
            MoveRequest::NeedsForm { kind, missing } => {
                assert_eq!(kind, TransitionType::ConclusionNb);
                assert_eq!(missing, vec!["outcome"]);
            }
            MoveRequest::Done(o) => panic!("expected a form, got {:?}", o),
        }

        let form = TransitionForm {
            outcome: Some(ConclusionOutcome::Partial),
            benefit_number: Some("NB-900".to_string()),
            decision_date: chrono::NaiveDate::from_ymd_opt(2024, 2, 1),
            ..TransitionForm::default()
        };
        let req = session.submit_form(&form, now()).unwrap();
        assert_eq!(
            outcome(req),
            MoveOutcome::Completed {
                case_id: "c1".to_string(),
                child_id: Some("c-2024-010-r".to_string()),
            }
        );

        let source = session.store().get_case("c1").unwrap().unwrap();
        // redirected away from the requested column
        assert_eq!(source.column_id, PAYMENT_COLUMN);
        assert!(source.has_tag(TAG_PARCIALMENTE_PROVIDO));
        assert!(source.has_tag(TAG_A_RECEBER));
        assert_eq!(source.urgency, Urgency::High);

        let child = session.store().get_case("c-2024-010-r").unwrap().unwrap();
        assert_eq!(child.view, View::RecursoAdm);
        assert_eq!(child.column_id, APPEAL_TRIAGE_COLUMN);
        assert!(child.has_tag(TAG_RECURSO_PARCIAL));
        assert!(child.has_tag(TAG_INDEFERIDO));
        assert_eq!(
            child.deadline_end,
            chrono::NaiveDate::from_ymd_opt(2024, 3, 2)
        );
    }

    #[test]
    fn denied_conclusion_swaps_the_grant_tag() {
        let mut case = sample_case("c1", "2024.010", View::Decisorio, "dec_analise");
        case.tags.push(TAG_CONCEDIDO.to_string());
        let (mut session, _tmp) = session_with(vec![case], vec![]);

        session.request_move("c1", "dec_concluido", "u1", now()).unwrap();
        let form = TransitionForm {
            outcome: Some(ConclusionOutcome::Denied),
            deadline_end: chrono::NaiveDate::from_ymd_opt(2024, 4, 1),
            ..TransitionForm::default()
        };
        outcome(session.submit_form(&form, now()).unwrap());

        let case = session.store().get_case("c1").unwrap().unwrap();
        assert_eq!(case.tags, vec![TAG_INDEFERIDO.to_string()]);
        assert_eq!(
            case.deadline_end,
            chrono::NaiveDate::from_ymd_opt(2024, 4, 1)
        );
        assert_eq!(case.history.last().unwrap().details, "Benefício indeferido");
    }

    #[test]
    fn clone_return_leaves_the_source_byte_for_byte() {
        let mut case = sample_case("c1", "2024.010", View::Decisorio, "dec_concluido");
        case.tags.push(TAG_INDEFERIDO.to_string());
        let before = case.clone();
        let (mut session, _tmp) = session_with(vec![case], vec![]);

        // the return zone funnels into the admin triage transition
        session.request_move("c1", "zone_retorno", "u1", now()).unwrap();
        let form = TransitionForm {
            return_mode: Some(crate::model::transition::ReturnMode::Clone),
            protocol_number: Some("999".to_string()),
            ..TransitionForm::default()
        };
        let req = session.submit_form(&form, now()).unwrap();
        assert_eq!(
            outcome(req),
            MoveOutcome::Completed {
                case_id: "c1".to_string(),
                child_id: Some("c-2024-010-r".to_string()),
            }
        );

        // not moved, not logged, not retagged
        assert_eq!(session.store().get_case("c1").unwrap().unwrap(), before);

        let clone = session.store().get_case("c-2024-010-r").unwrap().unwrap();
        assert_eq!(clone.view, View::Admin);
        assert_eq!(clone.column_id, ADMIN_TRIAGE_COLUMN);
        assert_eq!(clone.protocol_number.as_deref(), Some("999"));
        assert!(clone.tags.is_empty());
    }

    #[test]
    fn plain_return_moves_the_source_home() {
        let case = sample_case("c1", "2024.010", View::Decisorio, "dec_concluido");
        let (mut session, _tmp) = session_with(vec![case], vec![]);

        session.request_move("c1", "zone_retorno", "u1", now()).unwrap();
        outcome(session.submit_form(&TransitionForm::default(), now()).unwrap());

        let case = session.store().get_case("c1").unwrap().unwrap();
        assert_eq!(case.view, View::Admin);
        assert_eq!(case.column_id, ADMIN_TRIAGE_COLUMN);
        assert_eq!(
            case.history.last().unwrap().details,
            "Retornado à triagem administrativa"
        );
    }

    #[test]
    fn new_request_supersedes_a_paused_move() {
        let case = sample_case("c1", "2024.001", View::Admin, ADMIN_TRIAGE_COLUMN);
        let (mut session, _tmp) = session_with(vec![case], vec![]);

        session
            .request_move("c1", "adm_protocolado", "u1", now())
            .unwrap();
        assert!(session.pending().is_some());

        // a fresh plain move lands and the stale form is gone
        outcome(session.request_move("c1", "adm_analise", "u1", now()).unwrap());
        assert!(session.pending().is_none());
        let case = session.store().get_case("c1").unwrap().unwrap();
        assert_eq!(case.column_id, "adm_analise");
    }
}
