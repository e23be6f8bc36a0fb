use std::fs;

use crate::cli::commands::InitArgs;
use crate::io::office_io;

const CONFIG_TOML_TEMPLATE: &str = r##"[office]
name = "{name}"

# --- Staff ---
# Moves and history entries are attributed to users listed here.
#
# [[users]]
# id = "ana"
# name = "Ana Souza"

# --- Workflow rules ---
# Rules fire when a case enters their target column.
#
# [[rules]]
# id = "urgencia-pericia"
# name = "Urgência na perícia"
# trigger = "COLUMN_ENTER"
# target_column_id = "aux_pericia"
#
# [[rules.actions]]
# type = "SET_URGENCY"
# value = "HIGH"

# Boards, action zones, and the transition table have built-in defaults;
# add [boards], [[zones]], or [[transitions]] sections here to override.
"##;

/// Validate that a user ID is lowercase alphanumeric with hyphens only.
fn validate_user_id(id: &str) -> Result<(), String> {
    if id.is_empty() {
        return Err("user id cannot be empty".to_string());
    }
    if !id
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(format!(
            "invalid user id \"{}\" (use lowercase with hyphens, e.g. \"ana\")",
            id
        ));
    }
    Ok(())
}

/// Infer an office name from a directory name: replace hyphens with spaces, title-case.
fn infer_name(dir_name: &str) -> String {
    dir_name
        .split('-')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                None => String::new(),
                Some(c) => {
                    let upper: String = c.to_uppercase().collect();
                    upper + &chars.collect::<String>()
                }
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parse --user pairs from the flat Vec<String> produced by clap.
/// Each pair is (id, name).
fn parse_user_pairs(args: &[String]) -> Vec<(&str, &str)> {
    args.chunks(2)
        .filter_map(|chunk| {
            if chunk.len() == 2 {
                Some((chunk[0].as_str(), chunk[1].as_str()))
            } else {
                None
            }
        })
        .collect()
}

/// Render config.toml with user entries replacing the commented examples.
fn render_config_toml(name: &str, users: &[(&str, &str)]) -> String {
    let base = CONFIG_TOML_TEMPLATE.replace("{name}", name);

    if users.is_empty() {
        return base;
    }

    let mut user_section = String::new();
    for (id, uname) in users {
        user_section.push_str(&format!(
            "\n[[users]]\nid = \"{}\"\nname = \"{}\"\n",
            id, uname
        ));
    }

    base.replace(
        "# --- Staff ---\n# Moves and history entries are attributed to users listed here.\n#\n# [[users]]\n# id = \"ana\"\n# name = \"Ana Souza\"",
        &format!("# --- Staff ---{}", user_section.trim_end()),
    )
}

pub fn cmd_init(args: InitArgs) -> Result<(), Box<dyn std::error::Error>> {
    let cwd = std::env::current_dir()?;
    let tramita_dir = cwd.join("tramita");

    // Check if already initialized
    if tramita_dir.is_dir() && !args.force {
        return Err("tramita office already exists in ./tramita/ (use --force to rewrite config.toml)".into());
    }

    // Check for parent office and warn
    if let Some(parent) = cwd.parent()
        && let Ok(parent_root) = office_io::discover_office(parent)
    {
        eprintln!(
            "Note: parent office found at {}/tramita/",
            parent_root.display()
        );
        eprintln!("Creating new office in ./tramita/");
    }

    // Parse user pairs and validate IDs
    let user_pairs = parse_user_pairs(&args.user);
    for (id, _) in &user_pairs {
        validate_user_id(id)?;
    }

    // Check for duplicate user IDs
    let mut seen_ids = std::collections::HashSet::new();
    for (id, _) in &user_pairs {
        if !seen_ids.insert(*id) {
            return Err(format!("duplicate user id \"{}\"", id).into());
        }
    }

    // Infer office name
    let name = args.name.unwrap_or_else(|| {
        cwd.file_name()
            .and_then(|n| n.to_str())
            .map(infer_name)
            .unwrap_or_else(|| "Escritório".to_string())
    });

    // Create directory structure
    fs::create_dir_all(tramita_dir.join("cases"))?;

    // Write config.toml
    let toml_content = render_config_toml(&name, &user_pairs);
    fs::write(tramita_dir.join("config.toml"), toml_content)?;

    // Print summary
    println!("Initialized tramita office: {}", name);
    for (id, uname) in &user_pairs {
        println!("  user: {} ({})", uname, id);
    }

    Ok(())
}
