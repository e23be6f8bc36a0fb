use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::model::PendingMove;

/// Persisted CLI session state (written to .state.json). Holds the move
/// that is paused waiting for its transition form, so `tram move`,
/// `tram submit`, and `tram cancel` can be separate invocations.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SessionState {
    #[serde(default)]
    pub pending_move: Option<PendingMove>,
}

/// Read .state.json from the tramita directory
pub fn read_session_state(tramita_dir: &Path) -> Option<SessionState> {
    let path = tramita_dir.join(".state.json");
    let content = fs::read_to_string(&path).ok()?;
    serde_json::from_str(&content).ok()
}

/// Write .state.json to the tramita directory
pub fn write_session_state(tramita_dir: &Path, state: &SessionState) -> Result<(), std::io::Error> {
    let path = tramita_dir.join(".state.json");
    let content = serde_json::to_string_pretty(state)?;
    fs::write(&path, content)
}
