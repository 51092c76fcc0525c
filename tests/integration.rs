use std::path::Path;
use std::process::{Command, Output};

fn doclinks_cmd(dir: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_doclinks"));
    cmd.current_dir(dir);
    cmd.env_remove("DOCLINKS_LOG");
    cmd
}

fn fixture(name: &str) -> Command {
    doclinks_cmd(&Path::new("tests/fixtures").join(name))
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn clean_corpus_passes() {
    let output = fixture("clean").output().unwrap();
    assert!(output.status.success(), "check failed: {}{}", stdout(&output), stderr(&output));
    assert_eq!(stdout(&output), "All 3 files clean\n");
}

#[test]
fn explicit_check_with_stats() {
    let output = fixture("clean").args(["check", "--stats"]).output().unwrap();
    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("files processed  3"), "{text}");
    assert!(text.contains("links processed  7"), "{text}");
    assert!(text.contains(&format!("{:<17}7", "valid")), "{text}");
}

#[test]
fn broken_corpus_reports_and_exits_one() {
    let output = fixture("broken").arg("check").output().unwrap();
    assert_eq!(output.status.code(), Some(1));

    let text = stdout(&output);
    assert!(text.contains("docs/guide.md\n  3: [heading-order]"), "{text}");
    assert!(text.contains("[broken-route] broken link `/nowhere`"), "{text}");
    assert!(text.contains("(did you mean `guide.md#install`?)"), "{text}");
    assert!(text.ends_with("3 problems in 2 files\n"), "{text}");
}

#[test]
fn json_report() {
    let output = fixture("broken").args(["check", "--format", "json"]).output().unwrap();
    assert_eq!(output.status.code(), Some(1));

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["problems"], 3);
    let kinds: Vec<&str> = json["diagnostics"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["kind"].as_str().unwrap())
        .collect();
    assert_eq!(kinds, vec!["non-consecutive-heading", "broken-fragment", "broken-route"]);
}

#[test]
fn links_only_skips_heading_problems() {
    let output = fixture("broken").args(["check", "--links-only"]).output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(!stdout(&output).contains("heading-order"));

    let output = fixture("broken").args(["check", "--headings-only"]).output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(stdout(&output).ends_with("1 problems in 1 files\n"));
}

#[test]
fn versioned_namespaces_resolve() {
    let output = fixture("versioned").output().unwrap();
    assert!(output.status.success(), "check failed: {}{}", stdout(&output), stderr(&output));

    let output = fixture("versioned").arg("routes").output().unwrap();
    assert!(output.status.success());
    assert_eq!(
        stdout(&output),
        "[1.0]\n  /install  versions/1.0/setup.md\n  /intro  versions/1.0/intro.md\n  /setup  versions/1.0/setup.md\n[current]\n  /intro  docs/intro.md\n"
    );
}

#[test]
fn fragments_lists_outline() {
    let output = fixture("clean").args(["fragments", "docs/guides/01-installation.md"]).output().unwrap();
    assert!(output.status.success(), "{}", stderr(&output));
    assert_eq!(
        stdout(&output),
        "routes: /guides/installation\n\nRequirements  #requirements  (line 1)\n  Optional tools  #optional-tools  (line 5)\nInstall  #install-steps  (line 7)\n"
    );

    let output = fixture("clean").args(["fragments", "docs/nope.md"]).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("Document Not Found"));
}

#[test]
fn missing_namespace_root_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(".doclinks.toml"), "[namespaces]\ncurrent = \"nowhere\"\n").unwrap();

    let output = doclinks_cmd(dir.path()).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("Namespace Root Missing"));
}

#[test]
fn namespace_add_list_remove() {
    let dir = tempfile::tempdir().unwrap();

    let add = doclinks_cmd(dir.path())
        .args(["namespace", "add", "2.0", "versions/2.0", "--prefix", "/v2"])
        .output()
        .unwrap();
    assert!(add.status.success(), "{}", stderr(&add));

    let list = doclinks_cmd(dir.path()).args(["namespace", "list"]).output().unwrap();
    assert_eq!(stdout(&list), "current -> docs\n2.0 -> versions/2.0 (/v2)\n");

    let again = doclinks_cmd(dir.path()).args(["namespace", "add", "2.0", "elsewhere"]).output().unwrap();
    assert_eq!(again.status.code(), Some(2));

    let current = doclinks_cmd(dir.path()).args(["namespace", "remove", "current"]).output().unwrap();
    assert_eq!(current.status.code(), Some(2));

    let remove = doclinks_cmd(dir.path()).args(["namespace", "remove", "2.0"]).output().unwrap();
    assert!(remove.status.success());
    let list = doclinks_cmd(dir.path()).args(["namespace", "list"]).output().unwrap();
    assert_eq!(stdout(&list), "current -> docs\n");
}

#[test]
fn info_json_describes_exit_codes() {
    let output = fixture("versioned").args(["info", "--json"]).output().unwrap();
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["exit_codes"].as_array().unwrap().len(), 3);
    assert_eq!(json["current_state"]["config_found"], true);
    assert_eq!(json["current_state"]["namespaces"][1]["name"], "1.0");
    assert_eq!(json["current_state"]["namespaces"][1]["root_exists"], true);
}
