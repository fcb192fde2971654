//! Per-run artifact directories.
//!
//! Every run owns one directory under the configured output base, named by
//! a unique run id. Screenshots and the HTML report land inside it, so two
//! concurrent runs never collide. Screenshot paths within a run are made
//! unique by a monotonic step counter.

use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::config;

/// Artifact directory for a single run.
#[derive(Debug, Clone)]
pub struct RunDir {
    /// Unique run id
    pub id: String,
    /// Root directory for this run's artifacts
    pub dir: PathBuf,
    /// Whether to keep files after the run ends
    pub keep: bool,
}

impl RunDir {
    /// Create a run directory with a unique id under the configured base.
    pub fn new() -> Self {
        let id = generate_run_id();
        let dir = PathBuf::from(config::output_base_dir()).join(&id);

        Self {
            id,
            dir,
            keep: true,
        }
    }

    /// Create a run directory with a name prefix (e.g. the scenario name).
    pub fn with_name(name: &str) -> Self {
        let timestamp = generate_timestamp_suffix();
        let id = format!("{}_{}", sanitize_name(name), timestamp);
        let dir = PathBuf::from(config::output_base_dir()).join(&id);

        Self {
            id,
            dir,
            keep: true,
        }
    }

    /// Use a specific directory as the run root.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let id = dir
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(generate_run_id);

        Self {
            id,
            dir,
            keep: true,
        }
    }

    /// Set whether to keep files after the run ends.
    pub fn keep(mut self, keep: bool) -> Self {
        self.keep = keep;
        self
    }

    /// Initialize the run directory and write run metadata.
    pub fn init(&self) -> std::io::Result<()> {
        fs::create_dir_all(&self.dir)?;

        let metadata = serde_json::json!({
            "id": self.id,
            "created": chrono::Utc::now().to_rfc3339(),
        });

        let metadata_path = self.dir.join(".run.json");
        fs::write(metadata_path, serde_json::to_string_pretty(&metadata)?)?;

        Ok(())
    }

    /// Path for a step screenshot. The step counter keeps paths unique even
    /// when several screenshot actions share the same requested name.
    pub fn screenshot_path(&self, step: usize, name: Option<&str>) -> PathBuf {
        let filename = match name {
            Some(n) => format!("step_{}_{}.png", step, sanitize_name(n)),
            None => format!("step_{}.png", step),
        };
        self.dir.join(filename)
    }

    /// Path for the HTML report of this run.
    pub fn report_path(&self) -> PathBuf {
        self.dir.join("report.html")
    }

    /// List all PNG files in the run directory.
    pub fn list_screenshots(&self) -> std::io::Result<Vec<PathBuf>> {
        let mut shots = Vec::new();
        if self.dir.exists() {
            for entry in fs::read_dir(&self.dir)? {
                let entry = entry?;
                let path = entry.path();
                if path.extension().map(|e| e == "png").unwrap_or(false) {
                    shots.push(path);
                }
            }
        }
        shots.sort();
        Ok(shots)
    }

    /// Remove the run directory unless it is marked for keeping.
    pub fn cleanup(&self) -> std::io::Result<()> {
        if self.dir.exists() && !self.keep {
            fs::remove_dir_all(&self.dir)?;
        }
        Ok(())
    }
}

impl Default for RunDir {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for RunDir {
    fn drop(&mut self) {
        if !self.keep {
            let _ = fs::remove_dir_all(&self.dir);
        }
    }
}

/// Generate a unique run id.
fn generate_run_id() -> String {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    let pid = std::process::id();
    format!("run_{}_{}", timestamp, pid)
}

/// Generate a timestamp suffix.
fn generate_timestamp_suffix() -> String {
    chrono::Utc::now().format("%Y%m%d_%H%M%S").to_string()
}

/// Sanitize a name for use in filenames.
fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' => c,
            _ => '_',
        })
        .collect()
}

/// Remove run directories older than the specified duration.
pub fn cleanup_old_runs(max_age: std::time::Duration) -> std::io::Result<usize> {
    let base = PathBuf::from(config::output_base_dir());
    if !base.exists() {
        return Ok(0);
    }

    let now = SystemTime::now();
    let mut cleaned = 0;

    for entry in fs::read_dir(&base)? {
        let entry = entry?;
        let path = entry.path();

        if path.is_dir() {
            if let Ok(metadata) = entry.metadata() {
                if let Ok(modified) = metadata.modified() {
                    if let Ok(age) = now.duration_since(modified) {
                        if age > max_age && fs::remove_dir_all(&path).is_ok() {
                            cleaned += 1;
                        }
                    }
                }
            }
        }
    }

    Ok(cleaned)
}

/// List all run directories under the configured output base.
pub fn list_runs() -> std::io::Result<Vec<PathBuf>> {
    list_runs_in(config::output_base_dir())
}

/// List all run directories under a specific base directory.
pub fn list_runs_in(base: impl Into<PathBuf>) -> std::io::Result<Vec<PathBuf>> {
    let base = base.into();
    if !base.exists() {
        return Ok(Vec::new());
    }

    let mut runs = Vec::new();
    for entry in fs::read_dir(&base)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            runs.push(path);
        }
    }
    runs.sort();
    Ok(runs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_dir_new() {
        let run_dir = RunDir::new();
        assert!(run_dir.id.starts_with("run_"));
        assert!(run_dir.keep);
    }

    #[test]
    fn test_run_dir_with_name() {
        let run_dir = RunDir::with_name("login flow");
        assert!(run_dir.id.starts_with("login_flow_"));
    }

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("hello world"), "hello_world");
        assert_eq!(sanitize_name("a/b\\c"), "a_b_c");
        assert_eq!(sanitize_name("final-state_2"), "final-state_2");
    }

    #[test]
    fn test_screenshot_paths_unique_per_step() {
        let run_dir = RunDir::new();
        let a = run_dir.screenshot_path(1, Some("home"));
        let b = run_dir.screenshot_path(2, Some("home"));
        assert_ne!(a, b);
        assert!(a.ends_with("step_1_home.png"));
        assert!(b.ends_with("step_2_home.png"));
        assert!(run_dir.screenshot_path(3, None).ends_with("step_3.png"));
    }

    #[test]
    fn test_cleanup_removes_unkept_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let run_dir = RunDir::in_dir(tmp.path().join("run_x")).keep(false);
        run_dir.init().unwrap();
        assert!(run_dir.dir.exists());
        run_dir.cleanup().unwrap();
        assert!(!run_dir.dir.exists());
    }

    #[test]
    fn test_list_screenshots_sorted_pngs_only() {
        let tmp = tempfile::tempdir().unwrap();
        let run_dir = RunDir::in_dir(tmp.path().join("run_s"));
        run_dir.init().unwrap();
        std::fs::write(run_dir.screenshot_path(2, None), b"png").unwrap();
        std::fs::write(run_dir.screenshot_path(1, None), b"png").unwrap();
        std::fs::write(run_dir.report_path(), b"<html>").unwrap();

        let shots = run_dir.list_screenshots().unwrap();
        assert_eq!(shots.len(), 2);
        assert!(shots[0].ends_with("step_1.png"));
        assert!(shots[1].ends_with("step_2.png"));
    }

    #[test]
    fn test_list_runs_in_base() {
        let tmp = tempfile::tempdir().unwrap();
        RunDir::in_dir(tmp.path().join("run_b")).init().unwrap();
        RunDir::in_dir(tmp.path().join("run_a")).init().unwrap();
        std::fs::write(tmp.path().join("stray.txt"), b"x").unwrap();

        let runs = list_runs_in(tmp.path()).unwrap();
        assert_eq!(runs.len(), 2, "only directories count as runs");
        assert!(runs[0].ends_with("run_a"));
        assert!(runs[1].ends_with("run_b"));

        assert!(list_runs_in(tmp.path().join("missing")).unwrap().is_empty());
    }

    #[test]
    fn test_init_writes_metadata() {
        let tmp = tempfile::tempdir().unwrap();
        let run_dir = RunDir::in_dir(tmp.path().join("run_meta"));
        run_dir.init().unwrap();
        let meta = std::fs::read_to_string(run_dir.dir.join(".run.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&meta).unwrap();
        assert_eq!(value["id"], "run_meta");
    }
}
