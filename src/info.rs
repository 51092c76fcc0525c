use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::{self, CONFIG_FILE};

/// Output the doclinks reference document and the project's current state.
pub fn run(json: bool) {
    let root = PathBuf::from(".");
    let state = gather_state(&root);

    if json {
        print_json(&state);
    } else {
        print_markdown(&state);
    }
}

// ── State gathering ───────────────────────────────────────────────────

struct CurrentState {
    config_error: Option<String>,
    config_found: bool,
    namespaces: Vec<NamespaceJson>,
}

fn gather_state(root: &Path) -> CurrentState {
    let config_found = root.join(CONFIG_FILE).exists();
    return match config::Config::load(root) {
        Err(e) => CurrentState {
            config_error: Some(e.to_string()),
            config_found,
            namespaces: Vec::new(),
        },
        Ok(config) => CurrentState {
            config_error: None,
            config_found,
            namespaces: config
                .namespaces
                .iter()
                .map(|ns| {
                    return NamespaceJson {
                        name: ns.name.clone(),
                        prefix: ns.prefix.clone(),
                        root: ns.root.display().to_string(),
                        root_exists: root.join(&ns.root).is_dir(),
                    };
                })
                .collect(),
        },
    };
}

// ── Markdown output ───────────────────────────────────────────────────

fn print_markdown(state: &CurrentState) {
    let version = env!("CARGO_PKG_VERSION");
    print_markdown_header(version);
    print_markdown_state(state);
    println!();
    print_markdown_exit_codes();
}

fn print_markdown_header(version: &str) {
    print!(
        "\
# doclinks {version}

Link and heading integrity checker for versioned markdown documentation.
Every internal link must reach an existing page and, when it names one, an
existing heading on that page.

## Link Forms

    [text](#heading)                   heading on the same page
    [text](/guide/setup)               route in the current namespace
    [text](/guide/setup#install)       route plus heading
    [text](/1.0/guide/setup)           route in namespace `1.0`
    [text](../guide/setup.md#install)  file path relative to this document
    [text](./diagram.png)              file next to this document

## Commands

    doclinks check                     Validate headings and links (default)
    doclinks check --format json       Machine-readable report
    doclinks check --stats             Print counters after the report
    doclinks check --external          Also probe http/https links
    doclinks routes [--namespace N]    Print the route table
    doclinks fragments <file>          Print a document's outline and slugs
    doclinks namespace list|add|remove Edit [namespaces] in {CONFIG_FILE}
    doclinks watch                     Re-check on every change

## Configuration ({CONFIG_FILE})

    index = \"index\"                    # directory index file stem
    extensions = [\"md\", \"mdx\"]         # document extensions
    exclude = [\"node_modules/\"]        # skipped path prefixes
    ignore_links = [\"/api/\"]           # link prefixes never resolved
    base_path = \"/docs\"                # stripped from rooted links
    min_heading_level = 2              # `##` is the outermost heading

    [namespaces]
    current = \"docs\"
    \"1.0\" = {{ path = \"versions/1.0\", prefix = \"/1.0\" }}

## Current State

"
    );
}

fn print_markdown_state(state: &CurrentState) {
    if state.config_found {
        println!("Config:     {CONFIG_FILE} (found)");
    } else {
        println!("Config:     {CONFIG_FILE} (not found, using defaults)");
    }
    if let Some(error) = &state.config_error {
        println!("Error:      {error}");
    }

    if state.namespaces.is_empty() {
        println!("Namespaces: (none)");
    } else {
        let ns_list = state
            .namespaces
            .iter()
            .map(|ns| {
                let missing = if ns.root_exists { "" } else { " [missing]" };
                return format!("{} -> {}{missing}", ns.name, ns.root);
            })
            .collect::<Vec<_>>()
            .join(", ");
        println!("Namespaces: {ns_list}");
    }
}

fn print_markdown_exit_codes() {
    print!(
        "\
## Exit Codes

| Code | Meaning |
|------|---------|
| 0    | No problems found |
| 1    | Problems found |
| 2    | Fatal error |
"
    );
}

// ── JSON output ───────────────────────────────────────────────────────

#[derive(Serialize)]
struct InfoJson {
    current_state: StateJson,
    exit_codes: Vec<ExitCodeInfo>,
    version: String,
}

#[derive(Serialize)]
struct ExitCodeInfo {
    code: u8,
    meaning: String,
}

#[derive(Serialize)]
struct StateJson {
    config_error: Option<String>,
    config_found: bool,
    namespaces: Vec<NamespaceJson>,
}

#[derive(Clone, Serialize)]
struct NamespaceJson {
    name: String,
    prefix: Option<String>,
    root: String,
    root_exists: bool,
}

fn print_json(state: &CurrentState) {
    let info = InfoJson {
        current_state: StateJson {
            config_error: state.config_error.clone(),
            config_found: state.config_found,
            namespaces: state.namespaces.clone(),
        },
        exit_codes: vec![
            ExitCodeInfo { code: 0, meaning: "No problems found".to_string() },
            ExitCodeInfo { code: 1, meaning: "Problems found".to_string() },
            ExitCodeInfo { code: 2, meaning: "Fatal error".to_string() },
        ],
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    // serde_json::to_string_pretty won't fail on this structure.
    let json = serde_json::to_string_pretty(&info).unwrap_or_default();
    println!("{json}");
}
