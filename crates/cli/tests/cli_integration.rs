//! CLI integration tests for the `quill` subcommands.
//!
//! Uses `assert_cmd` to spawn the `quill` binary and verify
//! exit codes, stdout content, and stderr content.

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Locate the workspace root by walking up from CARGO_MANIFEST_DIR.
fn workspace_root() -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    // crates/cli -> workspace root is two levels up
    manifest_dir
        .parent()
        .and_then(|p| p.parent())
        .expect("workspace root")
        .to_path_buf()
}

/// Helper: create a Command for the `quill` binary, rooted at workspace.
fn quill() -> Command {
    let mut cmd = cargo_bin_cmd!("quill");
    cmd.current_dir(workspace_root());
    cmd
}

/// Write `content` to `name` inside `dir` and return the path.
fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

// ──────────────────────────────────────────────
// 1. Help and version
// ──────────────────────────────────────────────

#[test]
fn help_exits_0_with_description() {
    quill()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Python expression evaluator"));
}

#[test]
fn version_exits_0() {
    quill()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("quill"));
}

// ──────────────────────────────────────────────
// 2. eval
// ──────────────────────────────────────────────

#[test]
fn eval_prints_native_result() {
    quill()
        .args(["eval", "1 + 2 * 3"])
        .assert()
        .success()
        .stdout("7\n");
}

#[test]
fn eval_converts_containers() {
    quill()
        .args(["eval", "[1, 'a', None, (True,)]"])
        .assert()
        .success()
        .stdout("[1,\"a\",null,[true]]\n");
}

#[test]
fn eval_reads_context_file() {
    let tmp = TempDir::new().unwrap();
    let context = write(&tmp, "ctx.json", r#"{"x": 4, "names": ["a", "b"]}"#);
    quill()
        .args(["eval", "x * 2 if 'b' in names else 0", "--context"])
        .arg(&context)
        .assert()
        .success()
        .stdout("8\n");
}

#[test]
fn eval_has_date_helpers() {
    quill()
        .args(["eval", "datetime.date(2024, 1, 31) + relativedelta(months=1)"])
        .assert()
        .success()
        .stdout("\"2024-02-29\"\n");
}

#[test]
fn eval_json_output_wraps_result() {
    quill()
        .args(["--output", "json", "eval", "'abc'.upper()"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"result\": \"ABC\""));
}

#[test]
fn eval_syntax_error_exits_1() {
    quill()
        .args(["eval", "1 +"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("SyntaxError"));
}

#[test]
fn eval_unknown_name_exits_1() {
    quill()
        .args(["eval", "undefined_thing"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains(
            "NameError: name 'undefined_thing' is not defined",
        ));
}

#[test]
fn error_in_json_mode_is_an_object() {
    let output = quill()
        .args(["--output", "json", "eval", "1 / 0"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8(output.stderr).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(stderr.trim()).unwrap();
    assert!(parsed["error"]
        .as_str()
        .unwrap()
        .starts_with("ZeroDivisionError"));
}

#[test]
fn quiet_suppresses_error_message() {
    quill()
        .args(["--quiet", "eval", "1 +"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::is_empty());
}

#[test]
fn missing_context_file_exits_1() {
    quill()
        .args(["eval", "1", "--context", "/nonexistent/ctx.json"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("could not read"));
}

#[test]
fn context_file_must_hold_an_object() {
    let tmp = TempDir::new().unwrap();
    let context = write(&tmp, "ctx.json", "[1, 2]");
    quill()
        .args(["eval", "1", "--context"])
        .arg(&context)
        .assert()
        .failure()
        .stderr(predicate::str::contains("must contain a JSON object"));
}

// ──────────────────────────────────────────────
// 3. Configuration
// ──────────────────────────────────────────────

#[test]
fn config_context_is_visible_to_eval() {
    let tmp = TempDir::new().unwrap();
    let config = write(&tmp, "quill.toml", "[context]\nuid = 5\n");
    quill()
        .arg("--config")
        .arg(&config)
        .args(["eval", "uid + 1"])
        .assert()
        .success()
        .stdout("6\n");
}

#[test]
fn context_file_overrides_config() {
    let tmp = TempDir::new().unwrap();
    let config = write(&tmp, "quill.toml", "[context]\nuid = 5\n");
    let context = write(&tmp, "ctx.json", r#"{"uid": 9}"#);
    quill()
        .arg("--config")
        .arg(&config)
        .args(["eval", "uid", "--context"])
        .arg(&context)
        .assert()
        .success()
        .stdout("9\n");
}

#[test]
fn config_output_format_applies_unless_overridden() {
    let tmp = TempDir::new().unwrap();
    let config = write(&tmp, "quill.toml", "output = \"json\"\n");
    quill()
        .arg("--config")
        .arg(&config)
        .args(["eval", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"result\": 1"));
    quill()
        .arg("--config")
        .arg(&config)
        .args(["--output", "text", "eval", "1"])
        .assert()
        .success()
        .stdout("1\n");
}

#[test]
fn invalid_config_exits_1() {
    let tmp = TempDir::new().unwrap();
    let config = write(&tmp, "quill.toml", "output = [");
    quill()
        .arg("--config")
        .arg(&config)
        .args(["eval", "1"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("could not parse"));
}

// ──────────────────────────────────────────────
// 4. compose and batch
// ──────────────────────────────────────────────

#[test]
fn compose_domain_concatenates_fragments() {
    let tmp = TempDir::new().unwrap();
    let fragments = write(
        &tmp,
        "domains.json",
        r#"[[["a", "=", 1]], "", "[('b', '=', x)]"]"#,
    );
    let context = write(&tmp, "ctx.json", r#"{"x": 2}"#);
    quill()
        .arg("compose")
        .arg("domain")
        .arg(&fragments)
        .arg("--context")
        .arg(&context)
        .assert()
        .success()
        .stdout("[[\"a\",\"=\",1],[\"b\",\"=\",2]]\n");
}

#[test]
fn compose_context_sees_earlier_fragments() {
    let tmp = TempDir::new().unwrap();
    let fragments = write(&tmp, "contexts.json", r#"[{"a": 1}, "{'b': a + 1}"]"#);
    quill()
        .arg("compose")
        .arg("context")
        .arg(&fragments)
        .assert()
        .success()
        .stdout("{\"a\":1,\"b\":2}\n");
}

#[test]
fn compose_groupby_flattens_names() {
    let tmp = TempDir::new().unwrap();
    let fragments = write(
        &tmp,
        "groupbys.json",
        r#"[{"group_by": "x"}, "{'group_by': ['y', 'z']}"]"#,
    );
    quill()
        .arg("compose")
        .arg("groupby")
        .arg(&fragments)
        .assert()
        .success()
        .stdout("[\"x\",\"y\",\"z\"]\n");
}

#[test]
fn compose_rejects_unknown_kind() {
    let tmp = TempDir::new().unwrap();
    let fragments = write(&tmp, "f.json", "[]");
    quill()
        .arg("compose")
        .arg("bogus")
        .arg(&fragments)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown evaluation type"));
}

#[test]
fn compose_requires_an_array() {
    let tmp = TempDir::new().unwrap();
    let fragments = write(&tmp, "f.json", r#"{"a": 1}"#);
    quill()
        .arg("compose")
        .arg("context")
        .arg(&fragments)
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("must contain a JSON array"));
}

#[test]
fn batch_composes_all_three_lists() {
    let tmp = TempDir::new().unwrap();
    let source = write(
        &tmp,
        "source.json",
        r#"{
            "contexts": ["{'lang': lang}"],
            "domains": ["[('uid', '=', uid)]"],
            "group_by_seq": [{"group_by": "stage"}],
            "eval_context": {"uid": 3, "lang": "fr"}
        }"#,
    );
    let output = quill().arg("batch").arg(&source).output().unwrap();
    assert!(output.status.success());
    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(parsed["context"], serde_json::json!({"lang": "fr"}));
    assert_eq!(parsed["domain"], serde_json::json!([["uid", "=", 3]]));
    assert_eq!(parsed["group_by"], serde_json::json!(["stage"]));
}

// ──────────────────────────────────────────────
// 5. tokens and parse
// ──────────────────────────────────────────────

#[test]
fn tokens_prints_one_per_line() {
    quill()
        .args(["tokens", "1 + x"])
        .assert()
        .success()
        .stdout("(number 1)\n+\n(name x)\n(end)\n");
}

#[test]
fn parse_prints_tree_with_precedence() {
    quill()
        .args(["parse", "1 + 2 * 3"])
        .assert()
        .success()
        .stdout("(+ (number 1) (* (number 2) (number 3)))\n");
}

#[test]
fn parse_json_output() {
    quill()
        .args(["--output", "json", "parse", "a.b"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"tree\""));
}

#[test]
fn tokens_reports_bad_input() {
    quill()
        .args(["tokens", "1 $ 2"])
        .assert()
        .failure()
        .code(1);
}
