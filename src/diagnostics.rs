use crate::config::{CONFIG_FILE, CURRENT_NAMESPACE};
use crate::error::Error;

const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

/// Render an error as valid markdown with bold headings and print to stderr.
pub fn print_error(e: &Error) {
    let md = render_error(e);
    for line in md.lines() {
        if line.starts_with('#') {
            eprintln!("{BOLD}{line}{RESET}");
        } else {
            eprintln!("{line}");
        }
    }
}

/// Render a fatal error as a structured markdown block.
///
/// Each variant produces what happened and, where one exists, how to fix it.
pub fn render_error(e: &Error) -> String {
    return match e {
        Error::CurrentNamespaceRequired => render_current_required(),
        Error::NamespaceExists { name } => render_namespace_exists(name),
        Error::NamespaceRootMissing { namespace, path } => {
            render_namespace_root_missing(namespace, &path.display().to_string())
        },
        Error::UnknownNamespace { name } => render_unknown_namespace(name),
        _ => render_generic(e),
    };
}

fn render_current_required() -> String {
    return format!(
        "\
# Error: Namespace Required

The `{CURRENT_NAMESPACE}` namespace always exists and cannot be removed.

## Fix

Point it somewhere else instead:

    [namespaces]
    {CURRENT_NAMESPACE} = \"path/to/docs\"
"
    );
}

fn render_generic(e: &Error) -> String {
    return match e {
        Error::DocumentNotFound { path } => format!(
            "\
# Error: Document Not Found

`{}` is not a document of any configured namespace.

## Fix

List the namespaces and their roots:

    doclinks namespace list
",
            path.display()
        ),

        Error::Io(e) => format!(
            "\
# Error: I/O

{e}
"
        ),

        Error::Json(e) => format!(
            "\
# Error: JSON Output

{e}
"
        ),

        Error::ParseFailed { file, reason } => format!(
            "\
# Error: Parse Failed

Could not parse `{}`: {reason}
",
            file.display()
        ),

        Error::ProbeSetup { reason } => format!(
            "\
# Error: External Probe Unavailable

{reason}

## Fix

Run without `--external` to check internal links only.
"
        ),

        Error::TomlDe(e) => format!(
            "\
# Error: Invalid TOML

`{CONFIG_FILE}` could not be read:

{e}
"
        ),

        Error::WatchFailed { reason } => format!(
            "\
# Error: Watch Failed

{reason}
"
        ),

        _ => format!(
            "\
# Error

{e}
"
        ),
    };
}

fn render_namespace_exists(name: &str) -> String {
    return format!(
        "\
# Error: Namespace Exists

Namespace `{name}` is already configured.

## Fix

Remove it first:

    doclinks namespace remove {name}
"
    );
}

fn render_namespace_root_missing(namespace: &str, path: &str) -> String {
    return format!(
        "\
# Error: Namespace Root Missing

Namespace `{namespace}` points at `{path}`, which is not a directory.

## Fix

Create the directory, or fix the path in `{CONFIG_FILE}`:

    [namespaces]
    \"{namespace}\" = \"path/to/docs\"
"
    );
}

fn render_unknown_namespace(name: &str) -> String {
    return format!(
        "\
# Error: Unknown Namespace

Namespace `{name}` is not configured.

## Fix

Add it to `{CONFIG_FILE}`:

    [namespaces]
    \"{name}\" = \"path/to/{name}\"

Or run:

    doclinks namespace add {name} path/to/{name}
"
    );
}
