use std::path::PathBuf;

use super::case::Case;
use super::config::OfficeConfig;

/// A fully loaded office workspace
#[derive(Debug)]
pub struct Office {
    /// Directory containing `tramita/`
    pub root: PathBuf,
    /// The `tramita/` directory itself
    pub tramita_dir: PathBuf,
    pub config: OfficeConfig,
    /// Read cache of the case store; the store on disk is authoritative
    pub cases: Vec<Case>,
}

impl Office {
    pub fn case(&self, id: &str) -> Option<&Case> {
        self.cases.iter().find(|c| c.id == id)
    }

    /// Look up by store id or by human-facing internal id
    pub fn find_case(&self, key: &str) -> Option<&Case> {
        self.cases
            .iter()
            .find(|c| c.id == key || c.internal_id == key)
    }

    /// Next free intake number for the year, `YYYY.NNN`. Derived numbers
    /// (`2024.010-R`) don't advance the sequence.
    pub fn next_internal_id(&self, year: i32) -> String {
        let prefix = format!("{}.", year);
        let max = self
            .cases
            .iter()
            .filter_map(|c| c.internal_id.strip_prefix(&prefix))
            .filter(|rest| rest.chars().all(|ch| ch.is_ascii_digit()))
            .filter_map(|rest| rest.parse::<u32>().ok())
            .max()
            .unwrap_or(0);
        format!("{}.{:03}", year, max + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::board::{ADMIN_TRIAGE_COLUMN, View};
    use chrono::{TimeZone, Utc};

    fn office_with(internals: &[&str]) -> Office {
        let now = Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap();
        let cases = internals
            .iter()
            .enumerate()
            .map(|(i, internal)| {
                Case::new(
                    format!("c{}", i),
                    internal.to_string(),
                    "Maria Silva".to_string(),
                    View::Admin,
                    ADMIN_TRIAGE_COLUMN.to_string(),
                    "Ana",
                    now,
                )
            })
            .collect();
        Office {
            root: PathBuf::from("/tmp/escritorio"),
            tramita_dir: PathBuf::from("/tmp/escritorio/tramita"),
            config: OfficeConfig::default_for("Escritório Teste"),
            cases,
        }
    }

    #[test]
    fn numbering_starts_at_one_per_year() {
        let office = office_with(&[]);
        assert_eq!(office.next_internal_id(2024), "2024.001");
    }

    #[test]
    fn numbering_continues_from_the_highest() {
        let office = office_with(&["2024.001", "2024.007", "2024.003"]);
        assert_eq!(office.next_internal_id(2024), "2024.008");
        // another year runs its own sequence
        assert_eq!(office.next_internal_id(2025), "2025.001");
    }

    #[test]
    fn derived_numbers_do_not_advance_the_sequence() {
        let office = office_with(&["2024.010", "2024.010-R", "2024.010-MS"]);
        assert_eq!(office.next_internal_id(2024), "2024.011");
    }

    #[test]
    fn lookup_by_either_id() {
        let office = office_with(&["2024.001"]);
        assert!(office.case("c0").is_some());
        assert!(office.find_case("2024.001").is_some());
        assert!(office.find_case("c0").is_some());
        assert!(office.find_case("2024.999").is_none());
    }
}
