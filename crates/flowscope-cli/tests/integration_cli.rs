//! End-to-end runs of the `flowscope` binary against log files on disk.

use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

const LOG: &str = "\
2025-03-14 09:00:00,000 - INFO - Starting workflow round 1
2025-03-14 09:00:01,000 - INFO - Sentiment score: 0.42
2025-03-14 09:00:02,000 - INFO - HTTP Request: POST https://api.example.com/v1/chat \"HTTP/1.1 200 OK\"
2025-03-14 09:00:03,000 - INFO - Leader is drafting comments
2025-03-14 09:00:04,000 - INFO - Leader comment 1 on post p-1: first reply
";

fn write_log(dir: &TempDir) -> std::path::PathBuf {
    let path = dir.path().join("workflow.log");
    std::fs::write(&path, LOG).expect("write log");
    path
}

fn flowscope(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_flowscope"))
        .args(args)
        .args(["--color", "never"])
        .current_dir(dir)
        .output()
        .expect("run flowscope")
}

#[test]
fn summarize_json_reports_final_state() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let log = write_log(&dir);

    let output = flowscope(
        dir.path(),
        &["summarize", log.to_str().unwrap(), "--format", "json"],
    );
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let state: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(state["active_role"], "leader");
    assert_eq!(state["roles"]["analyst"]["status"], "done");
    assert_eq!(state["context"]["leader_comments"][0]["body"], "first reply");
    Ok(())
}

#[test]
fn summarize_text_prints_board() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let log = write_log(&dir);

    let output = flowscope(dir.path(), &["summarize", log.to_str().unwrap()]);
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout)?;
    assert!(stdout.contains("active: Leader"), "{stdout}");
    assert!(stdout.contains("Strategist [idle]"), "{stdout}");
    Ok(())
}

#[test]
fn unpaced_replay_emits_json_lines() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let log = write_log(&dir);

    let output = flowscope(
        dir.path(),
        &["replay", log.to_str().unwrap(), "--pace", "off", "--format", "jsonl"],
    );
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let events: Vec<serde_json::Value> = String::from_utf8(output.stdout)?
        .lines()
        .map(serde_json::from_str)
        .collect::<Result<_, _>>()?;
    let names: Vec<&str> = events.iter().filter_map(|e| e["event"].as_str()).collect();
    assert!(names.contains(&"flow.role_switched"));
    assert!(names.contains(&"flow.comment_posted"));

    let last_switch = events
        .iter()
        .rev()
        .find(|e| e["event"] == "flow.role_switched")
        .expect("a role switch");
    assert_eq!(last_switch["data"]["to"], "leader");
    Ok(())
}

#[test]
fn invalid_config_is_rejected() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let log = write_log(&dir);
    std::fs::write(
        dir.path().join("flowscope.yml"),
        "transcript:\n  max_line_chars: 0\n",
    )?;

    let output = flowscope(dir.path(), &["summarize", log.to_str().unwrap()]);
    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr)?;
    assert!(stderr.contains("max_line_chars"), "{stderr}");
    Ok(())
}

#[test]
fn missing_log_file_fails_with_context() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let output = flowscope(dir.path(), &["summarize", "nope.log"]);
    assert!(!output.status.success());
    assert!(String::from_utf8(output.stderr)?.contains("Failed to read log file"));
    Ok(())
}
