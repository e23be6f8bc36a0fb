mod init;
pub use init::cmd_init;

use std::path::PathBuf;
use std::sync::Mutex;

use chrono::{DateTime, Datelike, NaiveTime, Utc};
use regex::Regex;

/// Global override for office directory (set by -C flag)
static OFFICE_DIR_OVERRIDE: Mutex<Option<PathBuf>> = Mutex::new(None);

use crate::cli::commands::*;
use crate::cli::output::*;
use crate::io::json_store::JsonStore;
use crate::io::office_io::{self, OfficeError};
use crate::io::recovery;
use crate::io::state::{SessionState, read_session_state, write_session_state};
use crate::io::store::CaseStore;
use crate::io::watcher::{CaseFeed, FeedEvent};
use crate::model::case::case_id_for;
use crate::model::office::Office;
use crate::model::{Case, TransitionForm, User};
use crate::ops::check;
use crate::ops::finalize::{BoardSession, MoveOutcome, MoveRequest};
use crate::ops::search;

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub fn dispatch(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let json = cli.json;

    // Store -C override for load_office_cwd()
    if let Some(ref dir) = cli.office_dir {
        let abs = std::fs::canonicalize(dir)
            .map_err(|e| format!("cannot resolve -C path '{}': {}", dir, e))?;
        OFFICE_DIR_OVERRIDE.lock().unwrap().replace(abs);
    }

    match cli.command {
        // Init is handled in main.rs before office discovery
        Commands::Init(args) => cmd_init(args),

        // Read commands
        Commands::Boards(args) => cmd_boards(args, json),
        Commands::List(args) => cmd_list(args, json),
        Commands::Show(args) => cmd_show(args, json),
        Commands::History(args) => cmd_history(args, json),
        Commands::Search(args) => cmd_search(args, json),
        Commands::Pending => cmd_pending(json),
        Commands::Check => cmd_check(json),

        // Write commands
        Commands::Add(args) => cmd_add(args),
        Commands::Move(args) => cmd_move(args),
        Commands::Submit(args) => cmd_submit(args),
        Commands::Cancel => cmd_cancel(),

        // Rules and notifications
        Commands::Rules(args) => cmd_rules(args, json),
        Commands::Notifications(args) => cmd_notifications(args, json),

        // Maintenance
        Commands::Recovery(args) => cmd_recovery(args, json),
        Commands::Watch => cmd_watch(),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn load_office_cwd() -> Result<Office, OfficeError> {
    let start = match OFFICE_DIR_OVERRIDE.lock().unwrap().as_ref() {
        Some(dir) => dir.clone(),
        None => std::env::current_dir().map_err(OfficeError::IoError)?,
    };
    let root = office_io::discover_office(&start)?;
    office_io::load_office(&root)
}

/// Open a board session over the office's store, resuming any paused move
/// from .state.json.
fn open_session(office: &Office) -> BoardSession<JsonStore> {
    let store = JsonStore::new(&office.tramita_dir);
    let pending = read_session_state(&office.tramita_dir).and_then(|s| s.pending_move);
    BoardSession::new(store, office.config.clone(), &office.tramita_dir).with_pending(pending)
}

/// Persist the session's pending move (or its absence) back to .state.json.
fn save_session(office: &Office, session: &BoardSession<JsonStore>) -> Result<(), std::io::Error> {
    let state = SessionState {
        pending_move: session.pending().cloned(),
    };
    write_session_state(&office.tramita_dir, &state)
}

/// Resolve the acting user: an explicit --user id, or the only configured
/// user when there is exactly one.
fn resolve_user(office: &Office, flag: Option<&str>) -> Result<User, String> {
    match flag {
        Some(id) => office
            .config
            .user(id)
            .cloned()
            .ok_or_else(|| format!("unknown user: {}", id)),
        None => match office.config.users.as_slice() {
            [only] => Ok(only.clone()),
            [] => Err("no users configured; add one to tramita/config.toml".to_string()),
            _ => Err("more than one user configured; pass --user <ID>".to_string()),
        },
    }
}

fn require_case<'a>(office: &'a Office, key: &str) -> Result<&'a Case, String> {
    office
        .find_case(key)
        .ok_or_else(|| format!("case not found: {}", key))
}

/// Translate the flat CLI flags into a transition form.
fn build_form(args: &FormArgs) -> Result<TransitionForm, String> {
    Ok(TransitionForm {
        protocol_number: args.protocol.clone(),
        protocol_date: args.protocol_date.as_deref().map(parse_date).transpose()?,
        pericia_date: args.pericia_date.as_deref().map(parse_date).transpose()?,
        pericia_location: args.pericia_location.clone(),
        deadline_start: args.deadline_start.as_deref().map(parse_date).transpose()?,
        deadline_end: args.deadline_end.as_deref().map(parse_date).transpose()?,
        exigency_details: args.details.clone(),
        benefit_number: args.benefit_number.clone(),
        benefit_date: args.benefit_date.as_deref().map(parse_date).transpose()?,
        outcome: args.outcome.as_deref().map(parse_outcome).transpose()?,
        dcb_date: args.dcb.as_deref().map(parse_date).transpose()?,
        decision_date: args.decision_date.as_deref().map(parse_date).transpose()?,
        appeal_outcome: args.appeal_outcome.clone(),
        missing_docs: args.missing_docs.clone(),
        return_mode: args
            .return_mode
            .as_deref()
            .map(parse_return_mode)
            .transpose()?,
        new_responsible_id: args.assign.clone(),
    })
}

/// Print the result of a finished or paused move.
fn report_move(
    session: &BoardSession<JsonStore>,
    request: MoveRequest,
) -> Result<(), Box<dyn std::error::Error>> {
    match request {
        MoveRequest::Done(MoveOutcome::Completed { case_id, child_id }) => {
            let internal = session
                .store()
                .get_case(&case_id)?
                .map(|c| c.internal_id)
                .unwrap_or(case_id);
            println!("{} updated", internal);
            if let Some(child_id) = child_id {
                let child = session
                    .store()
                    .get_case(&child_id)?
                    .map(|c| c.internal_id)
                    .unwrap_or(child_id);
                println!("derived: {}", child);
            }
        }
        MoveRequest::Done(MoveOutcome::Blocked { reason }) => {
            println!("move blocked: {}", reason);
        }
        MoveRequest::Done(MoveOutcome::Noop) => {
            println!("already there; nothing to do");
        }
        MoveRequest::Done(MoveOutcome::Ignored) => {
            println!("case or user no longer exists; move ignored");
        }
        MoveRequest::NeedsForm { kind, missing } => {
            println!("move paused: {} form required", kind.key());
            if !missing.is_empty() {
                println!("missing: {}", missing.join(", "));
            }
            println!("complete it with `tram submit` or drop it with `tram cancel`");
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Read command handlers
// ---------------------------------------------------------------------------

fn cmd_boards(args: BoardsArgs, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let office = load_office_cwd()?;
    let filter = args.view.as_deref().map(parse_view).transpose()?;

    if json {
        let mut boards = Vec::new();
        for (view, columns) in &office.config.boards {
            if let Some(f) = filter
                && *view != f
            {
                continue;
            }
            boards.push(BoardJson {
                view: view.key(),
                title: view.title(),
                columns: columns
                    .iter()
                    .map(|c| ColumnJson {
                        id: c.id.clone(),
                        title: c.title.clone(),
                        cases: office
                            .cases
                            .iter()
                            .filter(|case| case.view == *view && case.column_id == c.id)
                            .count(),
                    })
                    .collect(),
            });
        }
        println!("{}", serde_json::to_string_pretty(&boards)?);
    } else {
        let mut first = true;
        for (view, columns) in &office.config.boards {
            if let Some(f) = filter
                && *view != f
            {
                continue;
            }
            if !first {
                println!();
            }
            first = false;
            for line in format_board_listing(*view, columns, &office.cases) {
                println!("{}", line);
            }
        }
    }
    Ok(())
}

fn cmd_list(args: ListArgs, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let office = load_office_cwd()?;
    let view_filter = args.view.as_deref().map(parse_view).transpose()?;
    let urgency_filter = args.urgency.as_deref().map(parse_urgency).transpose()?;

    let mut cases: Vec<&Case> = office
        .cases
        .iter()
        .filter(|c| view_filter.map_or(true, |v| c.view == v))
        .filter(|c| args.column.as_deref().map_or(true, |col| c.column_id == col))
        .filter(|c| args.tag.as_deref().map_or(true, |t| c.has_tag(t)))
        .filter(|c| urgency_filter.map_or(true, |u| c.urgency == u))
        .filter(|c| {
            args.responsible
                .as_deref()
                .map_or(true, |r| c.responsible_id.as_deref() == Some(r))
        })
        .collect();
    cases.sort_by(|a, b| a.internal_id.cmp(&b.internal_id));

    if json {
        let cards: Vec<CaseCardJson> = cases.iter().map(|c| case_to_card(c)).collect();
        println!("{}", serde_json::to_string_pretty(&cards)?);
    } else {
        for case in &cases {
            if view_filter.is_some() {
                println!("{}", format_case_line(case));
            } else {
                println!("[{}] {}", case.view.key(), format_case_line(case));
            }
        }
    }
    Ok(())
}

fn cmd_show(args: ShowArgs, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let office = load_office_cwd()?;
    let case = require_case(&office, &args.id)?;

    if json {
        println!("{}", serde_json::to_string_pretty(case)?);
    } else {
        let column_title = office.config.column_title(case.view, &case.column_id);
        for line in format_case_detail(case, column_title) {
            println!("{}", line);
        }
        // Tail of the audit trail; `tram history` has the rest
        let skip = case.history.len().saturating_sub(5);
        if !case.history.is_empty() {
            println!();
            for entry in &case.history[skip..] {
                println!("{}", format_history_entry(entry));
            }
        }
    }
    Ok(())
}

fn cmd_history(args: HistoryArgs, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let office = load_office_cwd()?;
    let case = require_case(&office, &args.id)?;

    let skip = case.history.len().saturating_sub(args.limit);
    let entries = &case.history[skip..];

    if json {
        let items: Vec<HistoryEntryJson> = entries.iter().map(history_to_json).collect();
        println!("{}", serde_json::to_string_pretty(&items)?);
    } else {
        for entry in entries {
            println!("{}", format_history_entry(entry));
        }
    }
    Ok(())
}

fn cmd_search(args: SearchArgs, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let office = load_office_cwd()?;
    let re = Regex::new(&args.pattern)?;
    let view_filter = args.view.as_deref().map(parse_view).transpose()?;
    let hits = search::search_cases(&office.cases, &re, view_filter);

    if json {
        let items: Vec<SearchHitJson> = hits.iter().map(hit_to_json).collect();
        println!("{}", serde_json::to_string_pretty(&items)?);
    } else {
        for hit in &hits {
            println!("{}  {}: {}", hit.internal_id, hit.field.label(), hit.text);
        }
    }
    Ok(())
}

fn cmd_pending(json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let office = load_office_cwd()?;
    let session = open_session(&office);

    let Some(pending) = session.pending() else {
        if json {
            println!("null");
        } else {
            println!("(no pending move)");
        }
        return Ok(());
    };

    let missing = TransitionForm::default().missing_fields(pending.kind, &pending.target_column_id);

    if json {
        let output = PendingJson {
            case_id: pending.case_id.clone(),
            kind: pending.kind.key(),
            from: format!("{}/{}", pending.source_view.key(), pending.source_column_id),
            to: format!("{}/{}", pending.target_view.key(), pending.target_column_id),
            missing,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        let internal = office
            .case(&pending.case_id)
            .map(|c| c.internal_id.as_str())
            .unwrap_or(pending.case_id.as_str());
        println!(
            "{}: {} → {} ({})",
            internal,
            pending.source_column_id,
            pending.target_column_id,
            pending.kind.key()
        );
        if missing.is_empty() {
            println!("ready: complete with `tram submit`");
        } else {
            println!("missing: {}", missing.join(", "));
        }
    }
    Ok(())
}

fn cmd_check(json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let office = load_office_cwd()?;
    let result = check::check_office(&office);

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        if !result.errors.is_empty() {
            println!("Errors:");
            for err in &result.errors {
                match err {
                    check::CheckError::DuplicateColumn { column_id, views } => {
                        println!(
                            "  column {} appears on several boards: {}",
                            column_id,
                            views.join(", ")
                        );
                    }
                    check::CheckError::ZoneTarget {
                        zone_id,
                        view,
                        column_id,
                    } => {
                        println!(
                            "  zone {} targets {}/{} which does not exist",
                            zone_id, view, column_id
                        );
                    }
                    check::CheckError::TransitionTarget { column_id } => {
                        println!("  transition table references unknown column: {}", column_id);
                    }
                    check::CheckError::RuleTarget { rule_id, column_id } => {
                        println!("  rule {} targets unknown column: {}", rule_id, column_id);
                    }
                    check::CheckError::RuleUser { rule_id, user_id } => {
                        println!("  rule {} assigns to unknown user: {}", rule_id, user_id);
                    }
                    check::CheckError::UnknownColumn {
                        internal_id,
                        view,
                        column_id,
                    } => {
                        println!(
                            "  {} sits in {}/{} which does not exist",
                            internal_id, view, column_id
                        );
                    }
                    check::CheckError::DanglingParent {
                        internal_id,
                        parent_id,
                    } => {
                        println!("  {} derives from missing case: {}", internal_id, parent_id);
                    }
                    check::CheckError::DuplicateInternalId {
                        internal_id,
                        case_ids,
                    } => {
                        println!(
                            "  {} is claimed by several files: {}",
                            internal_id,
                            case_ids.join(", ")
                        );
                    }
                }
            }
        }
        if !result.warnings.is_empty() {
            if !result.errors.is_empty() {
                println!();
            }
            println!("Warnings:");
            for warn in &result.warnings {
                match warn {
                    check::CheckWarning::UnknownResponsible {
                        internal_id,
                        user_id,
                    } => {
                        println!("  {} assigned to unknown user: {}", internal_id, user_id);
                    }
                    check::CheckWarning::InvertedDeadline { internal_id } => {
                        println!(
                            "  {} has a deadline window that ends before it starts",
                            internal_id
                        );
                    }
                    check::CheckWarning::UnreachableZone { zone_id } => {
                        println!("  zone {} is not active on any board", zone_id);
                    }
                    check::CheckWarning::RuleWithoutActions { rule_id } => {
                        println!("  rule {} has no actions", rule_id);
                    }
                }
            }
        }
        if result.valid {
            println!("✓ office is valid");
        } else {
            println!("✗ office has errors");
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Write command handlers
// ---------------------------------------------------------------------------

fn cmd_add(args: AddArgs) -> Result<(), Box<dyn std::error::Error>> {
    let office = load_office_cwd()?;
    let view = parse_view(&args.view)?;
    let column = office
        .config
        .triage_column(view)
        .ok_or_else(|| format!("board {} has no columns", view.key()))?
        .to_string();
    let user = resolve_user(&office, args.user.as_deref())?;

    let now = Utc::now();
    let internal_id = office.next_internal_id(now.date_naive().year());
    let id = case_id_for(&internal_id);

    let mut case = Case::new(
        id,
        internal_id.clone(),
        args.client.clone(),
        view,
        column,
        &user.name,
        now,
    );
    case.benefit_type = args.benefit_type.clone();
    if let Some(ref responsible) = args.responsible {
        let resp = office
            .config
            .user(responsible)
            .ok_or_else(|| format!("unknown user: {}", responsible))?;
        case.responsible_id = Some(resp.id.clone());
        case.responsible_name = Some(resp.name.clone());
    }

    let mut store = JsonStore::new(&office.tramita_dir);
    store.save_case(&case)?;
    println!("{}", internal_id);
    Ok(())
}

fn cmd_move(args: MoveArgs) -> Result<(), Box<dyn std::error::Error>> {
    let office = load_office_cwd()?;
    let case_id = require_case(&office, &args.id)?.id.clone();
    let user = resolve_user(&office, args.user.as_deref())?;
    let form = build_form(&args.form)?;
    let now = Utc::now();

    let mut session = open_session(&office);
    let mut request = session.request_move(&case_id, &args.target, &user.id, now)?;

    // One-shot completion: when the move pauses for its form, feed it the
    // flags from this same invocation.
    if matches!(request, MoveRequest::NeedsForm { .. }) {
        request = session.submit_form(&form, now)?;
    }

    save_session(&office, &session)?;
    report_move(&session, request)
}

fn cmd_submit(args: SubmitArgs) -> Result<(), Box<dyn std::error::Error>> {
    let office = load_office_cwd()?;
    let form = build_form(&args.form)?;
    let now = Utc::now();

    let mut session = open_session(&office);
    let request = session.submit_form(&form, now)?;

    save_session(&office, &session)?;
    report_move(&session, request)
}

fn cmd_cancel() -> Result<(), Box<dyn std::error::Error>> {
    let office = load_office_cwd()?;
    let mut session = open_session(&office);

    match session.cancel() {
        Some(pending) => {
            save_session(&office, &session)?;
            let internal = office
                .case(&pending.case_id)
                .map(|c| c.internal_id.as_str())
                .unwrap_or(pending.case_id.as_str());
            println!("cancelled move of {}", internal);
        }
        None => println!("(no pending move)"),
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Rules and notifications
// ---------------------------------------------------------------------------

fn cmd_rules(args: RulesCmd, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    match args.action {
        None | Some(RulesAction::List) => cmd_rules_list(json),
        Some(RulesAction::Enable(a)) => cmd_rule_toggle(a.id, true),
        Some(RulesAction::Disable(a)) => cmd_rule_toggle(a.id, false),
    }
}

fn cmd_rules_list(json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let office = load_office_cwd()?;

    if json {
        let items: Vec<RuleJson> = office.config.rules.iter().map(rule_to_json).collect();
        println!("{}", serde_json::to_string_pretty(&items)?);
    } else {
        if office.config.rules.is_empty() {
            println!("(no rules configured)");
        }
        for rule in &office.config.rules {
            let mark = if rule.is_active { 'x' } else { ' ' };
            println!(
                "[{}] {}  {} @ {} ({} conditions, {} actions)",
                mark,
                rule.id,
                rule.name,
                rule.target_column_id,
                rule.conditions.len(),
                rule.actions.len()
            );
        }
    }
    Ok(())
}

fn cmd_rule_toggle(rule_id: String, active: bool) -> Result<(), Box<dyn std::error::Error>> {
    let office = load_office_cwd()?;
    let (_, mut doc) = office_io::read_config(&office.tramita_dir)?;

    if !office_io::set_rule_active(&mut doc, &rule_id, active) {
        return Err(format!("rule not found: {}", rule_id).into());
    }
    office_io::write_config(&office.tramita_dir, &doc)?;

    println!("{} {}", rule_id, if active { "enabled" } else { "disabled" });
    Ok(())
}

fn cmd_notifications(
    args: NotificationsArgs,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let office = load_office_cwd()?;
    let mut store = JsonStore::new(&office.tramita_dir);
    let notifications = store.notifications()?;

    let shown: Vec<_> = notifications
        .iter()
        .filter(|n| !args.unread || !n.read)
        .collect();

    if json {
        let items: Vec<NotificationJson> = shown.iter().map(|n| notification_to_json(n)).collect();
        println!("{}", serde_json::to_string_pretty(&items)?);
    } else {
        if shown.is_empty() {
            println!("(no notifications)");
        }
        for n in &shown {
            println!("{}", format_notification(n));
        }
    }

    if args.mark_read {
        store.mark_notifications_read()?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Maintenance handlers
// ---------------------------------------------------------------------------

fn cmd_recovery(args: RecoveryCmd, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let office = load_office_cwd()?;

    if let Some(RecoveryAction::Path) = args.action {
        println!(
            "{}",
            recovery::recovery_log_path(&office.tramita_dir).display()
        );
        return Ok(());
    }

    let since = match args.since.as_deref() {
        Some(s) => Some(parse_since(s)?),
        None => None,
    };
    let limit = args.limit.or(Some(10));
    let entries = recovery::read_recovery_entries(&office.tramita_dir, limit, since);

    if json {
        let items: Vec<serde_json::Value> = entries.iter().map(|e| e.to_json()).collect();
        println!("{}", serde_json::to_string_pretty(&items)?);
    } else {
        if entries.is_empty() {
            println!("(recovery log is empty)");
        }
        for entry in &entries {
            println!("{}", entry.to_display_markdown());
        }
    }
    Ok(())
}

fn parse_since(s: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    parse_date(s).map(|d| d.and_time(NaiveTime::MIN).and_utc())
}

fn cmd_watch() -> Result<(), Box<dyn std::error::Error>> {
    let office = load_office_cwd()?;
    let feed = CaseFeed::start(&office.tramita_dir)?;
    println!("watching {} (ctrl-c to stop)", office.tramita_dir.display());

    loop {
        for event in feed.poll() {
            match event {
                FeedEvent::Changed(paths) => {
                    for path in paths {
                        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("?");
                        println!("changed: {}", name);
                    }
                }
            }
        }
        std::thread::sleep(std::time::Duration::from_millis(200));
    }
}
