use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "tram", about = concat!("[#] tramita v", env!("CARGO_PKG_VERSION"), " - kanban for the benefits practice"), version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Run against a different office directory
    #[arg(short = 'C', long = "office-dir", global = true)]
    pub office_dir: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new tramita office in the current directory
    Init(InitArgs),
    /// Show board columns (all boards, or one view)
    Boards(BoardsArgs),
    /// List cases
    List(ListArgs),
    /// Show case details
    Show(ShowArgs),
    /// Open a new case in a view's triage column
    Add(AddArgs),
    /// Move a case to a column or action zone
    Move(MoveArgs),
    /// Complete a paused move with its transition fields
    Submit(SubmitArgs),
    /// Abandon the paused move
    Cancel,
    /// Show the paused move, if any
    Pending,
    /// Show a case's history
    History(HistoryArgs),
    /// Search cases by regex
    Search(SearchArgs),
    /// Validate office integrity
    Check,
    /// List or toggle workflow rules
    Rules(RulesCmd),
    /// List notifications
    Notifications(NotificationsArgs),
    /// View the recovery log
    Recovery(RecoveryCmd),
    /// Watch the case store and report changes
    Watch,
}

// ---------------------------------------------------------------------------
// Init args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct InitArgs {
    /// Office name (default: inferred from directory name)
    #[arg(long)]
    pub name: Option<String>,
    /// Add a staff user: --user <id> "name" (repeatable)
    #[arg(long, num_args = 2, value_names = ["ID", "NAME"], action = clap::ArgAction::Append)]
    pub user: Vec<String>,
    /// Reinitialize even if tramita/ already exists
    #[arg(long)]
    pub force: bool,
}

// ---------------------------------------------------------------------------
// Read command args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct BoardsArgs {
    /// View to show (ADMIN, AUX_DOENCA, RECURSO_ADM, JUDICIAL, DECISORIO)
    pub view: Option<String>,
}

#[derive(Args)]
pub struct ListArgs {
    /// View to list (default: all views)
    pub view: Option<String>,
    /// Filter by column id
    #[arg(long)]
    pub column: Option<String>,
    /// Filter by tag
    #[arg(long)]
    pub tag: Option<String>,
    /// Filter by urgency (low, medium, high)
    #[arg(long)]
    pub urgency: Option<String>,
    /// Filter by responsible user id
    #[arg(long)]
    pub responsible: Option<String>,
}

#[derive(Args)]
pub struct ShowArgs {
    /// Case id or internal number
    pub id: String,
}

#[derive(Args)]
pub struct HistoryArgs {
    /// Case id or internal number
    pub id: String,
    /// Maximum number of entries to show
    #[arg(long, default_value = "20")]
    pub limit: usize,
}

#[derive(Args)]
pub struct SearchArgs {
    /// Regex pattern to search for
    pub pattern: String,
    /// Limit search to one view
    #[arg(long)]
    pub view: Option<String>,
}

// ---------------------------------------------------------------------------
// Write command args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct AddArgs {
    /// View the case starts on
    pub view: String,
    /// Client name
    pub client: String,
    /// Benefit type sought
    #[arg(long = "benefit-type")]
    pub benefit_type: Option<String>,
    /// Responsible user id
    #[arg(long)]
    pub responsible: Option<String>,
    /// Acting user id (default: the only configured user)
    #[arg(long)]
    pub user: Option<String>,
}

#[derive(Args)]
pub struct MoveArgs {
    /// Case id or internal number
    pub id: String,
    /// Destination column id or action zone id
    pub target: String,
    /// Acting user id (default: the only configured user)
    #[arg(long)]
    pub user: Option<String>,
    #[command(flatten)]
    pub form: FormArgs,
}

#[derive(Args)]
pub struct SubmitArgs {
    #[command(flatten)]
    pub form: FormArgs,
}

/// Structured transition fields. A transition only reads the ones it
/// cares about; dates are YYYY-MM-DD.
#[derive(Args, Default)]
pub struct FormArgs {
    /// Protocol number (INSS or appeal instance)
    #[arg(long)]
    pub protocol: Option<String>,
    /// Protocol date (default: today)
    #[arg(long)]
    pub protocol_date: Option<String>,
    /// Expert exam date
    #[arg(long)]
    pub pericia_date: Option<String>,
    /// Expert exam location
    #[arg(long)]
    pub pericia_location: Option<String>,
    /// Compliance window start (default: today)
    #[arg(long)]
    pub deadline_start: Option<String>,
    /// Compliance window end
    #[arg(long)]
    pub deadline_end: Option<String>,
    /// Exigency details
    #[arg(long)]
    pub details: Option<String>,
    /// Benefit number (NB)
    #[arg(long)]
    pub benefit_number: Option<String>,
    /// Benefit grant date (default: today)
    #[arg(long)]
    pub benefit_date: Option<String>,
    /// Conclusion outcome (granted, denied, partial)
    #[arg(long)]
    pub outcome: Option<String>,
    /// Benefit cessation date (DCB)
    #[arg(long)]
    pub dcb: Option<String>,
    /// Decision date (default: today)
    #[arg(long)]
    pub decision_date: Option<String>,
    /// Appeal outcome text
    #[arg(long)]
    pub appeal_outcome: Option<String>,
    /// Missing document (repeatable)
    #[arg(long = "missing-doc")]
    pub missing_docs: Vec<String>,
    /// Return to INSS mode (move or clone)
    #[arg(long)]
    pub return_mode: Option<String>,
    /// Reassign the case to this user id
    #[arg(long)]
    pub assign: Option<String>,
}

// ---------------------------------------------------------------------------
// Workflow rules
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct RulesCmd {
    #[command(subcommand)]
    pub action: Option<RulesAction>,
}

#[derive(Subcommand)]
pub enum RulesAction {
    /// List configured rules (default)
    List,
    /// Enable a rule
    Enable(RuleIdArg),
    /// Disable a rule
    Disable(RuleIdArg),
}

#[derive(Args)]
pub struct RuleIdArg {
    /// Rule id
    pub id: String,
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct NotificationsArgs {
    /// Show only unread notifications
    #[arg(long)]
    pub unread: bool,
    /// Mark all notifications as read
    #[arg(long = "mark-read")]
    pub mark_read: bool,
}

// ---------------------------------------------------------------------------
// Recovery log
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct RecoveryCmd {
    #[command(subcommand)]
    pub action: Option<RecoveryAction>,
    /// Maximum number of entries to show (default: 10)
    #[arg(long)]
    pub limit: Option<usize>,
    /// Show entries after this timestamp (ISO-8601)
    #[arg(long)]
    pub since: Option<String>,
}

#[derive(Subcommand)]
pub enum RecoveryAction {
    /// Print the absolute path to the recovery log
    Path,
}
