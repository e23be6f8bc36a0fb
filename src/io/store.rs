use std::path::PathBuf;

use thiserror::Error;

use crate::model::{Case, Notification};

/// Error type for case-store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("could not read {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not write {path}: {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Persistence contract the move pipeline depends on. Writes are
/// last-write-wins per case id; there are no version tokens and no
/// cross-case transactions.
pub trait CaseStore {
    /// Upsert by case id.
    fn save_case(&mut self, case: &Case) -> Result<(), StoreError>;
    fn get_case(&self, id: &str) -> Result<Option<Case>, StoreError>;
    fn all_cases(&self) -> Result<Vec<Case>, StoreError>;
    /// Append to the notification queue.
    fn save_notifications(&mut self, notifications: &[Notification]) -> Result<(), StoreError>;
    fn notifications(&self) -> Result<Vec<Notification>, StoreError>;
    fn mark_notifications_read(&mut self) -> Result<(), StoreError>;
}
