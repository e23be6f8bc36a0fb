use serde::{Deserialize, Serialize};

use super::board::{ActionZone, BoardMap, ColumnDef, View, default_boards, default_zones};
use super::transition::{TransitionRule, default_transitions};
use super::workflow::WorkflowRule;

/// Configuration from config.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfficeConfig {
    pub office: OfficeInfo,
    #[serde(default)]
    pub users: Vec<User>,
    /// Board layout; omitted sections fall back to the built-in defaults
    #[serde(default = "default_boards")]
    pub boards: BoardMap,
    #[serde(default = "default_zones")]
    pub zones: Vec<ActionZone>,
    #[serde(default = "default_transitions")]
    pub transitions: Vec<TransitionRule>,
    #[serde(default)]
    pub rules: Vec<WorkflowRule>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfficeInfo {
    pub name: String,
}

/// A staff member who can own cases
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
}

impl OfficeConfig {
    /// The built-in topology with no users or rules
    pub fn default_for(name: &str) -> OfficeConfig {
        OfficeConfig {
            office: OfficeInfo {
                name: name.to_string(),
            },
            users: Vec::new(),
            boards: default_boards(),
            zones: default_zones(),
            transitions: default_transitions(),
            rules: Vec::new(),
        }
    }

    pub fn user(&self, id: &str) -> Option<&User> {
        self.users.iter().find(|u| u.id == id)
    }

    pub fn columns(&self, view: View) -> &[ColumnDef] {
        self.boards.get(&view).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has_column(&self, view: View, column_id: &str) -> bool {
        self.columns(view).iter().any(|c| c.id == column_id)
    }

    /// Column title for display, falling back to the raw id
    pub fn column_title<'a>(&'a self, view: View, column_id: &'a str) -> &'a str {
        self.columns(view)
            .iter()
            .find(|c| c.id == column_id)
            .map(|c| c.title.as_str())
            .unwrap_or(column_id)
    }

    /// First column of the view's board; new and returned cases land here
    pub fn triage_column(&self, view: View) -> Option<&str> {
        self.columns(view).first().map(|c| c.id.as_str())
    }

    pub fn rule(&self, id: &str) -> Option<&WorkflowRule> {
        self.rules.iter().find(|r| r.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_gets_default_topology() {
        let toml_src = r#"
[office]
name = "Escritório Teste"

[[users]]
id = "u1"
name = "Ana"
"#;
        let config: OfficeConfig = toml::from_str(toml_src).unwrap();
        assert_eq!(config.office.name, "Escritório Teste");
        assert_eq!(config.users.len(), 1);
        assert_eq!(config.boards.len(), 5);
        assert_eq!(config.zones.len(), 6);
        assert_eq!(config.transitions.len(), 12);
        assert!(config.rules.is_empty());
        assert_eq!(config.triage_column(View::Admin), Some("adm_triagem"));
    }

    #[test]
    fn boards_section_overrides_defaults() {
        let toml_src = r#"
[office]
name = "Teste"

[[boards.ADMIN]]
id = "a1"
title = "Entrada"

[[boards.ADMIN]]
id = "a2"
title = "Saída"
"#;
        let config: OfficeConfig = toml::from_str(toml_src).unwrap();
        assert_eq!(config.boards.len(), 1);
        assert_eq!(config.columns(View::Admin).len(), 2);
        assert_eq!(config.triage_column(View::Admin), Some("a1"));
        assert!(config.columns(View::Judicial).is_empty());
    }

    #[test]
    fn column_title_falls_back_to_id() {
        let config: OfficeConfig = toml::from_str("[office]\nname = \"X\"\n").unwrap();
        assert_eq!(config.column_title(View::Admin, "adm_triagem"), "Triagem");
        assert_eq!(config.column_title(View::Admin, "mystery"), "mystery");
    }
}
