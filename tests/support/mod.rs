#![allow(dead_code)]

use anyhow::{Context, Result, bail};
use serde_json::{Value, json};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use tempfile::TempDir;

/// Throwaway apps root with helpers for laying out topics and units.
pub struct AppsTree {
    dir: TempDir,
}

impl AppsTree {
    pub fn new() -> Result<Self> {
        let dir = TempDir::new().context("failed to allocate apps root")?;
        Ok(Self { dir })
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn topic(&self, name: &str) -> Result<PathBuf> {
        let path = self.root().join(name);
        fs::create_dir_all(&path).with_context(|| format!("creating topic {}", path.display()))?;
        Ok(path)
    }

    pub fn file(&self, topic: &str, name: &str, contents: &str) -> Result<PathBuf> {
        let path = self.topic(topic)?.join(name);
        fs::write(&path, contents).with_context(|| format!("writing {}", path.display()))?;
        Ok(path)
    }

    pub fn unit(&self, topic: &str, name: &str, manifest: &Value) -> Result<PathBuf> {
        self.file(topic, name, &serde_json::to_string_pretty(manifest)?)
    }

    /// Write `rows` as NDJSON so discovery never mistakes it for a unit.
    pub fn dataset(&self, topic: &str, name: &str, rows: &[Value]) -> Result<PathBuf> {
        let mut body = String::new();
        for row in rows {
            body.push_str(&serde_json::to_string(row)?);
            body.push('\n');
        }
        self.file(topic, name, &body)
    }
}

/// Topics `A` and `B`; `A` holds `x.json` (runs), `y.json` (its dataset
/// lacks a column a later section needs) and `_hidden.json`.
pub fn scenario_tree() -> Result<AppsTree> {
    let tree = AppsTree::new()?;
    tree.topic("B")?;
    tree.dataset("A", "students.ndjson", &student_rows())?;
    tree.dataset("A", "gpa.ndjson", &gpa_rows())?;
    let truncated: Vec<Value> = student_rows()
        .into_iter()
        .map(|mut row| {
            if let Some(object) = row.as_object_mut() {
                object.remove("Total Completed Hours");
            }
            row
        })
        .collect();
    tree.dataset("A", "truncated.ndjson", &truncated)?;
    tree.unit(
        "A",
        "x.json",
        &json!({
            "title": "Exchange",
            "app": {
                "program": "exchange-report",
                "args": {"dataset": "students.ndjson", "gpa_dataset": "gpa.ndjson"}
            }
        }),
    )?;
    tree.unit(
        "A",
        "y.json",
        &json!({"main": {"program": "basic-stats", "args": {"dataset": "truncated.ndjson"}}}),
    )?;
    tree.unit("A", "_hidden.json", &json!({"title": "draft"}))?;
    Ok(tree)
}

pub fn student_rows() -> Vec<Value> {
    let universities = [
        "Georgia Institute of Technology",
        "Purdue University",
        "Arizona State University",
        "University of Arizona",
    ];
    let majors = ["Mechanical Engineering", "Computer Science", "Finance"];
    let sponsors = [
        "Fully Sponsored by KFUPM",
        "KFUPM-Partial Sponsor",
        "Fully Sponsored by KFUPM",
    ];
    (0..18)
        .map(|idx| {
            let score = if idx % 3 == 0 {
                json!(6.5 + (idx % 4) as f64 * 0.5)
            } else {
                json!(80 + idx)
            };
            json!({
                "Name of Host University": universities[idx % universities.len()],
                "Major": majors[idx % majors.len()],
                "GPA": 2.6 + (idx as f64) * 0.07,
                "Sponsor Name": sponsors[idx % sponsors.len()],
                "Total Completed Hours": 70 + (idx * 3) % 45,
                "IELTS/TOEFL Score": score,
            })
        })
        .collect()
}

pub fn gpa_rows() -> Vec<Value> {
    (0..12)
        .map(|idx| {
            let home = 2.8 + (idx as f64) * 0.08;
            let host = home - 0.2 + ((idx % 5) as f64) * 0.1;
            json!({"GPA": home, "Host GPA": host})
        })
        .collect()
}

/// `hub` with the environment cleared of anything that would override flags.
pub fn hub(root: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_hub"));
    cmd.arg("--root")
        .arg(root)
        .env_remove("HUB_ROOT")
        .env_remove("HUB_FORMAT")
        .env_remove("HUB_LOG")
        .env_remove("HUB_LOG_JSON");
    cmd
}

pub fn hub_render() -> Command {
    Command::new(env!("CARGO_BIN_EXE_hub-render"))
}

/// Run `cmd` and insist on a zero exit status.
pub fn run_command(mut cmd: Command) -> Result<Output> {
    let output = cmd
        .output()
        .with_context(|| format!("failed to run command: {:?}", cmd))?;
    if output.status.success() {
        Ok(output)
    } else {
        bail!(
            "command {:?} failed: status {:?}\nstdout: {}\nstderr: {}",
            cmd,
            output.status.code(),
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        )
    }
}

/// Run `cmd` with `input` on stdin, whatever the exit status.
pub fn run_with_stdin(mut cmd: Command, input: &[u8]) -> Result<Output> {
    let mut child = cmd
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .with_context(|| format!("failed to spawn command: {:?}", cmd))?;
    child
        .stdin
        .take()
        .context("child stdin unavailable")?
        .write_all(input)?;
    Ok(child.wait_with_output()?)
}

pub fn stdout_of(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}
