use std::fs;
use std::path::{Path, PathBuf};

use crate::io::recovery::atomic_write;
use crate::io::store::{CaseStore, StoreError};
use crate::model::{Case, Notification};

/// One JSON file per case under `tramita/cases/`, plus a single
/// `notifications.json` queue. Every write goes through a temp file and
/// rename so concurrent readers never see a half-written document.
pub struct JsonStore {
    root: PathBuf,
}

impl JsonStore {
    pub fn new(tramita_dir: &Path) -> JsonStore {
        JsonStore {
            root: tramita_dir.to_path_buf(),
        }
    }

    pub fn cases_dir(&self) -> PathBuf {
        self.root.join("cases")
    }

    fn case_path(&self, id: &str) -> PathBuf {
        self.cases_dir().join(format!("{}.json", id))
    }

    fn notifications_path(&self) -> PathBuf {
        self.root.join("notifications.json")
    }

    fn read_case_file(&self, path: &Path) -> Result<Case, StoreError> {
        let text = fs::read_to_string(path).map_err(|e| StoreError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&text).map_err(|e| StoreError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

impl CaseStore for JsonStore {
    fn save_case(&mut self, case: &Case) -> Result<(), StoreError> {
        fs::create_dir_all(self.cases_dir())?;
        let path = self.case_path(&case.id);
        let mut content = serde_json::to_string_pretty(case).map_err(|e| StoreError::ParseError {
            path: path.clone(),
            source: e,
        })?;
        content.push('\n');
        atomic_write(&path, content.as_bytes())
            .map_err(|e| StoreError::WriteError { path, source: e })
    }

    fn get_case(&self, id: &str) -> Result<Option<Case>, StoreError> {
        let path = self.case_path(id);
        if !path.exists() {
            return Ok(None);
        }
        self.read_case_file(&path).map(Some)
    }

    fn all_cases(&self) -> Result<Vec<Case>, StoreError> {
        let dir = self.cases_dir();
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut cases = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            cases.push(self.read_case_file(&path)?);
        }
        // Directory order is arbitrary; keep listings stable
        cases.sort_by(|a, b| a.internal_id.cmp(&b.internal_id));
        Ok(cases)
    }

    fn save_notifications(&mut self, notifications: &[Notification]) -> Result<(), StoreError> {
        if notifications.is_empty() {
            return Ok(());
        }
        let mut all = self.notifications()?;
        all.extend(notifications.iter().cloned());
        self.write_all_notifications(&all)
    }

    fn notifications(&self) -> Result<Vec<Notification>, StoreError> {
        let path = self.notifications_path();
        if !path.exists() {
            return Ok(Vec::new());
        }
        let text = fs::read_to_string(&path).map_err(|e| StoreError::ReadError {
            path: path.clone(),
            source: e,
        })?;
        serde_json::from_str(&text).map_err(|e| StoreError::ParseError { path, source: e })
    }

    fn mark_notifications_read(&mut self) -> Result<(), StoreError> {
        let mut all = self.notifications()?;
        if all.iter().all(|n| n.read) {
            return Ok(());
        }
        for n in &mut all {
            n.read = true;
        }
        self.write_all_notifications(&all)
    }
}

impl JsonStore {
    fn write_all_notifications(&self, all: &[Notification]) -> Result<(), StoreError> {
        let path = self.notifications_path();
        let mut content =
            serde_json::to_string_pretty(all).map_err(|e| StoreError::ParseError {
                path: path.clone(),
                source: e,
            })?;
        content.push('\n');
        atomic_write(&path, content.as_bytes())
            .map_err(|e| StoreError::WriteError { path, source: e })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ADMIN_TRIAGE_COLUMN, View};
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    fn sample_case(id: &str, internal: &str) -> Case {
        let now = Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap();
        Case::new(
            id.to_string(),
            internal.to_string(),
            "Maria Silva".to_string(),
            View::Admin,
            ADMIN_TRIAGE_COLUMN.to_string(),
            "Ana",
            now,
        )
    }

    #[test]
    fn save_and_get_round_trip() {
        let tmp = TempDir::new().unwrap();
        let mut store = JsonStore::new(tmp.path());

        let case = sample_case("c1", "2024.001");
        store.save_case(&case).unwrap();

        let loaded = store.get_case("c1").unwrap().unwrap();
        assert_eq!(loaded, case);
        assert!(store.get_case("missing").unwrap().is_none());
    }

    #[test]
    fn save_is_upsert() {
        let tmp = TempDir::new().unwrap();
        let mut store = JsonStore::new(tmp.path());

        let mut case = sample_case("c1", "2024.001");
        store.save_case(&case).unwrap();
        case.client_name = "Maria S. Oliveira".to_string();
        store.save_case(&case).unwrap();

        let loaded = store.get_case("c1").unwrap().unwrap();
        assert_eq!(loaded.client_name, "Maria S. Oliveira");
        assert_eq!(store.all_cases().unwrap().len(), 1);
    }

    #[test]
    fn all_cases_sorted_by_internal_id() {
        let tmp = TempDir::new().unwrap();
        let mut store = JsonStore::new(tmp.path());

        store.save_case(&sample_case("cb", "2024.002")).unwrap();
        store.save_case(&sample_case("ca", "2024.001")).unwrap();
        store.save_case(&sample_case("cc", "2024.010")).unwrap();

        let ids: Vec<String> = store
            .all_cases()
            .unwrap()
            .into_iter()
            .map(|c| c.internal_id)
            .collect();
        assert_eq!(ids, vec!["2024.001", "2024.002", "2024.010"]);
    }

    #[test]
    fn empty_store_is_empty_not_an_error() {
        let tmp = TempDir::new().unwrap();
        let store = JsonStore::new(tmp.path());
        assert!(store.all_cases().unwrap().is_empty());
        assert!(store.notifications().unwrap().is_empty());
    }

    #[test]
    fn notifications_append_and_mark_read() {
        let tmp = TempDir::new().unwrap();
        let mut store = JsonStore::new(tmp.path());
        let now = Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap();

        let note = |msg: &str| Notification {
            case_id: "c1".to_string(),
            internal_id: "2024.001".to_string(),
            message: msg.to_string(),
            created_at: now,
            read: false,
        };
        store.save_notifications(&[note("primeira")]).unwrap();
        store.save_notifications(&[note("segunda")]).unwrap();

        let all = store.notifications().unwrap();
        assert_eq!(all.len(), 2);
        assert!(all.iter().all(|n| !n.read));

        store.mark_notifications_read().unwrap();
        assert!(store.notifications().unwrap().iter().all(|n| n.read));
    }

    #[test]
    fn non_json_files_are_ignored() {
        let tmp = TempDir::new().unwrap();
        let mut store = JsonStore::new(tmp.path());
        store.save_case(&sample_case("c1", "2024.001")).unwrap();
        std::fs::write(store.cases_dir().join("README.txt"), "not a case").unwrap();

        assert_eq!(store.all_cases().unwrap().len(), 1);
    }
}
