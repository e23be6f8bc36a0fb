use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for drop-target resolution
#[derive(Debug, Error)]
pub enum DropError {
    #[error("unknown column or action zone: {0}")]
    UnknownTarget(String),
    #[error("action zone '{zone}' is not available on the {view} board")]
    ZoneUnavailable { zone: String, view: String },
}

// Columns the transition executor treats specially.
pub const ADMIN_TRIAGE_COLUMN: &str = "adm_triagem";
pub const APPEAL_TRIAGE_COLUMN: &str = "rec_triagem";
pub const JUDICIAL_TRIAGE_COLUMN: &str = "jud_triagem";
pub const HEARING_COLUMN: &str = "aux_pericia";
pub const ORDINARIO_COLUMN: &str = "rec_ordinario";
pub const ESPECIAL_COLUMN: &str = "rec_especial";
pub const PAYMENT_COLUMN: &str = "dec_pagamento";

/// The five boards a case can live on. Every case belongs to exactly one
/// board at a time, via its (view, column_id) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum View {
    Admin,
    AuxDoenca,
    RecursoAdm,
    Judicial,
    Decisorio,
}

impl View {
    pub const ALL: [View; 5] = [
        View::Admin,
        View::AuxDoenca,
        View::RecursoAdm,
        View::Judicial,
        View::Decisorio,
    ];

    /// Stable key used in config files, JSON output, and CLI arguments
    pub fn key(self) -> &'static str {
        match self {
            View::Admin => "ADMIN",
            View::AuxDoenca => "AUX_DOENCA",
            View::RecursoAdm => "RECURSO_ADM",
            View::Judicial => "JUDICIAL",
            View::Decisorio => "DECISORIO",
        }
    }

    /// Board title shown to users
    pub fn title(self) -> &'static str {
        match self {
            View::Admin => "Administrativo",
            View::AuxDoenca => "Auxílio-Doença",
            View::RecursoAdm => "Recurso Administrativo",
            View::Judicial => "Judicial",
            View::Decisorio => "Mesa Decisória",
        }
    }

    pub fn parse(s: &str) -> Option<View> {
        match s.to_ascii_uppercase().as_str() {
            "ADMIN" => Some(View::Admin),
            "AUX_DOENCA" => Some(View::AuxDoenca),
            "RECURSO_ADM" => Some(View::RecursoAdm),
            "JUDICIAL" => Some(View::Judicial),
            "DECISORIO" => Some(View::Decisorio),
            _ => None,
        }
    }
}

/// A column within a board
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub id: String,
    pub title: String,
}

/// Board layout: each view's ordered column list. The first column of a
/// board is its triage column by convention.
pub type BoardMap = IndexMap<View, Vec<ColumnDef>>;

/// A virtual drop target rendered alongside real columns. Dropping a case
/// on a zone redirects the move to a column on another board, except for
/// zones with `clones_case` set, which leave the source case untouched and
/// create a linked case instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionZone {
    pub id: String,
    pub label: String,
    pub target_view: View,
    pub target_column_id: String,
    pub active_in_views: Vec<View>,
    #[serde(default)]
    pub clones_case: bool,
}

/// A resolved drop target, ready for transition matching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropTarget {
    /// Move to a concrete column, possibly on another board.
    Column { view: View, column_id: String },
    /// Writ-of-mandamus zone: the source stays put and a linked judicial
    /// case is created instead.
    WritClone,
}

// --- Drop resolution ---

/// Resolve a raw drop target (a column id on the current board, or an
/// action-zone id) into the concrete destination the move pipeline acts on.
/// Zone ids are checked first so a zone can never be shadowed by a column.
pub fn resolve_drop(
    boards: &BoardMap,
    zones: &[ActionZone],
    current_view: View,
    target: &str,
) -> Result<DropTarget, DropError> {
    if let Some(zone) = zones.iter().find(|z| z.id == target) {
        if !zone.active_in_views.contains(&current_view) {
            return Err(DropError::ZoneUnavailable {
                zone: zone.id.clone(),
                view: current_view.key().to_string(),
            });
        }
        if zone.clones_case {
            return Ok(DropTarget::WritClone);
        }
        return Ok(DropTarget::Column {
            view: zone.target_view,
            column_id: zone.target_column_id.clone(),
        });
    }
    if board_has_column(boards, current_view, target) {
        return Ok(DropTarget::Column {
            view: current_view,
            column_id: target.to_string(),
        });
    }
    Err(DropError::UnknownTarget(target.to_string()))
}

pub fn board_columns(boards: &BoardMap, view: View) -> &[ColumnDef] {
    boards.get(&view).map(Vec::as_slice).unwrap_or(&[])
}

pub fn board_has_column(boards: &BoardMap, view: View, column_id: &str) -> bool {
    board_columns(boards, view).iter().any(|c| c.id == column_id)
}

/// Column title for display, falling back to the raw id.
pub fn column_title<'a>(boards: &'a BoardMap, view: View, column_id: &'a str) -> &'a str {
    board_columns(boards, view)
        .iter()
        .find(|c| c.id == column_id)
        .map(|c| c.title.as_str())
        .unwrap_or(column_id)
}

// --- Built-in layout ---

fn col(id: &str, title: &str) -> ColumnDef {
    ColumnDef {
        id: id.to_string(),
        title: title.to_string(),
    }
}

/// The standard board layout, used when config.toml does not override it.
pub fn default_boards() -> BoardMap {
    let mut boards = IndexMap::new();
    boards.insert(
        View::Admin,
        vec![
            col(ADMIN_TRIAGE_COLUMN, "Triagem"),
            col("adm_doc_pendente", "Documentação Pendente"),
            col("adm_protocolado", "Protocolado no INSS"),
            col("adm_exigencia", "Em Exigência"),
            col("adm_analise", "Em Análise"),
        ],
    );
    boards.insert(
        View::AuxDoenca,
        vec![
            col("aux_triagem", "Triagem"),
            col("aux_protocolado", "Protocolado"),
            col(HEARING_COLUMN, "Perícia Agendada"),
            col("aux_analise", "Em Análise"),
        ],
    );
    boards.insert(
        View::RecursoAdm,
        vec![
            col(APPEAL_TRIAGE_COLUMN, "Triagem"),
            col(ORDINARIO_COLUMN, "Recurso Ordinário"),
            col(ESPECIAL_COLUMN, "Recurso Especial"),
            col("rec_decidido", "Decidido"),
        ],
    );
    boards.insert(
        View::Judicial,
        vec![
            col(JUDICIAL_TRIAGE_COLUMN, "Triagem"),
            col("jud_protocolado", "Protocolado"),
            col("jud_andamento", "Em Andamento"),
            col("jud_sentenca", "Sentença"),
        ],
    );
    boards.insert(
        View::Decisorio,
        vec![
            col("dec_analise", "Em Análise"),
            col("dec_concluido", "Concluído"),
            col(PAYMENT_COLUMN, "Pagamento"),
        ],
    );
    boards
}

/// The standard action zones.
pub fn default_zones() -> Vec<ActionZone> {
    vec![
        ActionZone {
            id: "zone_pericia".to_string(),
            label: "Perícia".to_string(),
            target_view: View::AuxDoenca,
            target_column_id: HEARING_COLUMN.to_string(),
            active_in_views: vec![View::Admin, View::AuxDoenca],
            clones_case: false,
        },
        ActionZone {
            id: "zone_recurso".to_string(),
            label: "Recurso".to_string(),
            target_view: View::RecursoAdm,
            target_column_id: APPEAL_TRIAGE_COLUMN.to_string(),
            active_in_views: vec![View::Admin, View::Decisorio],
            clones_case: false,
        },
        ActionZone {
            id: "zone_judicial".to_string(),
            label: "Judicializar".to_string(),
            target_view: View::Judicial,
            target_column_id: JUDICIAL_TRIAGE_COLUMN.to_string(),
            active_in_views: vec![View::Admin, View::RecursoAdm, View::Decisorio],
            clones_case: false,
        },
        ActionZone {
            id: "zone_decisorio".to_string(),
            label: "Mesa Decisória".to_string(),
            target_view: View::Decisorio,
            target_column_id: "dec_analise".to_string(),
            active_in_views: vec![View::Admin, View::AuxDoenca, View::RecursoAdm, View::Judicial],
            clones_case: false,
        },
        ActionZone {
            id: "zone_retorno".to_string(),
            label: "Retorno ao INSS".to_string(),
            target_view: View::Admin,
            target_column_id: ADMIN_TRIAGE_COLUMN.to_string(),
            active_in_views: vec![View::RecursoAdm, View::Judicial, View::Decisorio],
            clones_case: false,
        },
        ActionZone {
            id: "zone_ms".to_string(),
            label: "Mandado de Segurança".to_string(),
            target_view: View::Judicial,
            target_column_id: JUDICIAL_TRIAGE_COLUMN.to_string(),
            active_in_views: vec![View::Admin, View::AuxDoenca, View::RecursoAdm],
            clones_case: true,
        },
    ]
}
