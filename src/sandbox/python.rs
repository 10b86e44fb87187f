// Out-of-process Python runtime for generated chart code
use async_trait::async_trait;
use serde::Serialize;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::timeout;

use super::{ChartRuntime, ChartStyle, ExtractOutcome, RenderOutcome};
use crate::config::ExecutionConfig;
use crate::error::{DataStoryError, Result};

const HARNESS: &str = include_str!("harness.py");
const RESULT_MARKER: &str = "__DATASTORY_RESULT__";

#[derive(Debug, Serialize)]
struct HarnessRequest<'a> {
    mode: &'static str,
    code: &'a str,
    dataset_path: &'a Path,
    preload: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    template: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    height: Option<u32>,
}

/// Runs each snippet in a fresh interpreter process, so no state survives
/// between executions. The child is killed when the run times out or the
/// owning task is aborted.
#[derive(Debug, Clone)]
pub struct PythonRuntime {
    interpreter: String,
    timeout: Duration,
    preload: Vec<String>,
    python_path: Vec<PathBuf>,
}

impl PythonRuntime {
    pub fn new(config: &ExecutionConfig) -> Self {
        Self {
            interpreter: config.interpreter.clone(),
            timeout: config.timeout(),
            preload: config.preload.clone(),
            python_path: config.python_path.clone(),
        }
    }

    /// Whether the configured interpreter can be found
    pub fn is_available(&self) -> bool {
        which::which(&self.interpreter).is_ok()
    }

    /// PYTHONPATH for the child: configured entries first, then the inherited value
    fn python_path_env(&self) -> Result<Option<OsString>> {
        if self.python_path.is_empty() {
            return Ok(None);
        }

        let mut entries = self.python_path.clone();
        if let Some(inherited) = std::env::var_os("PYTHONPATH") {
            entries.extend(std::env::split_paths(&inherited));
        }

        std::env::join_paths(entries)
            .map(Some)
            .map_err(|e| DataStoryError::Execution(format!("invalid python_path: {}", e)))
    }

    async fn run<T: serde::de::DeserializeOwned>(&self, request: &HarnessRequest<'_>) -> Result<T> {
        let interpreter = which::which(&self.interpreter).map_err(|e| {
            DataStoryError::Execution(format!("interpreter '{}' not found: {}", self.interpreter, e))
        })?;

        let payload = serde_json::to_vec(request).map_err(|e| DataStoryError::Json {
            source: e,
            context: "Failed to encode harness request".to_string(),
        })?;

        let mut command = Command::new(interpreter);
        if let Some(path) = self.python_path_env()? {
            command.env("PYTHONPATH", path);
        }

        let mut child = command
            .arg("-c")
            .arg(HARNESS)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| DataStoryError::Io {
                source: e,
                context: format!("Failed to spawn {}", self.interpreter),
            })?;

        {
            let mut stdin = child.stdin.take().ok_or_else(|| {
                DataStoryError::Execution("failed to open interpreter stdin".to_string())
            })?;
            stdin
                .write_all(&payload)
                .await
                .map_err(|e| DataStoryError::Io {
                    source: e,
                    context: "Failed to write harness request".to_string(),
                })?;
        }

        let output = timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| {
                DataStoryError::Execution(format!("timed out after {:?}", self.timeout))
            })?
            .map_err(|e| DataStoryError::Io {
                source: e,
                context: "Failed to wait for interpreter".to_string(),
            })?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            tracing::debug!("Interpreter stderr: {}", stderr.trim());
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let line = stdout
            .lines()
            .rev()
            .find_map(|line| line.strip_prefix(RESULT_MARKER))
            .ok_or_else(|| {
                DataStoryError::Execution(format!(
                    "interpreter exited with {} without a result: {}",
                    output.status,
                    stderr.lines().last().unwrap_or_default()
                ))
            })?;

        serde_json::from_str(line).map_err(|e| DataStoryError::Json {
            source: e,
            context: "Malformed harness result".to_string(),
        })
    }
}

#[async_trait]
impl ChartRuntime for PythonRuntime {
    async fn extract(&self, code: &str, dataset_path: &Path) -> Result<ExtractOutcome> {
        self.run(&HarnessRequest {
            mode: "extract",
            code,
            dataset_path,
            preload: &self.preload,
            template: None,
            width: None,
            height: None,
        })
        .await
    }

    async fn render(
        &self,
        code: &str,
        dataset_path: &Path,
        style: &ChartStyle,
    ) -> Result<RenderOutcome> {
        self.run(&HarnessRequest {
            mode: "render",
            code,
            dataset_path,
            preload: &self.preload,
            template: Some(&style.template),
            width: Some(style.width),
            height: Some(style.height),
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn test_request_encoding() {
        let preload = vec!["pandas as pd".to_string()];
        let request = HarnessRequest {
            mode: "extract",
            code: "fig = None",
            dataset_path: Path::new("data.csv"),
            preload: &preload,
            template: None,
            width: None,
            height: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["mode"], "extract");
        assert_eq!(json["dataset_path"], "data.csv");
        assert!(json.get("template").is_none());
    }

    #[tokio::test]
    async fn test_missing_interpreter_is_an_error() {
        let mut config = Config::default().execution;
        config.interpreter = "definitely-not-a-python-binary".to_string();
        let runtime = PythonRuntime::new(&config);

        assert!(!runtime.is_available());
        let result = runtime.extract("fig = 1", Path::new("x.csv")).await;
        assert!(matches!(result, Err(DataStoryError::Execution(_))));
    }

    const PANDAS_STUB: &str = r#"
import csv


class DataFrame:
    def __init__(self, rows):
        self.rows = rows

    def __len__(self):
        return len(self.rows)


def read_csv(path):
    with open(path, newline="") as handle:
        return DataFrame(list(csv.DictReader(handle)))
"#;

    const BASEDATATYPES_STUB: &str = r#"
import json


class _Title:
    def __init__(self, text):
        self.text = text


class _Layout:
    def __init__(self, values):
        self.title = _Title(values.get("title"))


class BaseFigure:
    def __init__(self, kind, title=None):
        self.data = [{"type": kind}]
        self.values = {}
        if title:
            self.values["title"] = title

    @property
    def layout(self):
        return _Layout(self.values)

    def update_layout(self, **kwargs):
        self.values.update(kwargs)

    def show(self, *args, **kwargs):
        raise RuntimeError("show must be disabled")

    def to_image(self, format="png"):
        if self.values.get("title") == "unexportable":
            raise ValueError("no image engine")
        return b"PNG" + json.dumps(self.data).encode()

    def to_json(self):
        return json.dumps({"data": self.data, "layout": self.values})
"#;

    const GRAPH_OBJECTS_STUB: &str = r#"
from plotly.basedatatypes import BaseFigure


class Figure(BaseFigure):
    pass
"#;

    const EXPRESS_STUB: &str = r#"
from plotly.graph_objects import Figure


def bar(data, title=None):
    return Figure("bar", title)
"#;

    /// Minimal pandas and plotly packages plus a two-row dataset
    struct StubEnv {
        dir: tempfile::TempDir,
    }

    impl StubEnv {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let root = dir.path();
            std::fs::create_dir_all(root.join("pandas")).unwrap();
            std::fs::create_dir_all(root.join("plotly")).unwrap();
            std::fs::write(root.join("pandas/__init__.py"), PANDAS_STUB).unwrap();
            std::fs::write(root.join("plotly/__init__.py"), "").unwrap();
            std::fs::write(root.join("plotly/basedatatypes.py"), BASEDATATYPES_STUB).unwrap();
            std::fs::write(root.join("plotly/graph_objects.py"), GRAPH_OBJECTS_STUB).unwrap();
            std::fs::write(root.join("plotly/express.py"), EXPRESS_STUB).unwrap();
            std::fs::write(root.join("data.csv"), "city,sales\nParis,3\nLyon,5\n").unwrap();
            Self { dir }
        }

        fn dataset(&self) -> PathBuf {
            self.dir.path().join("data.csv")
        }

        /// Runtime using the stubs, or None when python3 is not installed
        fn runtime(&self) -> Option<PythonRuntime> {
            let mut config = Config::default().execution;
            config.python_path = vec![self.dir.path().to_path_buf()];
            let runtime = PythonRuntime::new(&config);
            if !runtime.is_available() {
                eprintln!("python3 not found, skipping");
                return None;
            }
            Some(runtime)
        }
    }

    fn style() -> ChartStyle {
        ChartStyle {
            template: "plotly_dark".to_string(),
            width: 600,
            height: 400,
        }
    }

    #[tokio::test]
    async fn test_extract_finds_figure_by_type() {
        let env = StubEnv::new();
        let Some(runtime) = env.runtime() else { return };

        let code = "chart = px.bar(data, title='Sales')\nchart.show()\nprint('noise')";
        let outcome = runtime.extract(code, &env.dataset()).await.unwrap();

        match outcome {
            ExtractOutcome::Image { png_base64 } => {
                use base64::{engine::general_purpose::STANDARD, Engine as _};
                let png = STANDARD.decode(png_base64).unwrap();
                assert!(png.starts_with(b"PNG"));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_extract_reports_raised_error() {
        let env = StubEnv::new();
        let Some(runtime) = env.runtime() else { return };

        let outcome = runtime
            .extract("raise ValueError('boom')", &env.dataset())
            .await
            .unwrap();
        assert_eq!(
            outcome,
            ExtractOutcome::ExecutionFailed {
                error: "boom".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_extract_without_figure() {
        let env = StubEnv::new();
        let Some(runtime) = env.runtime() else { return };

        let outcome = runtime
            .extract("rows = len(data)\nprint(rows)", &env.dataset())
            .await
            .unwrap();
        assert_eq!(outcome, ExtractOutcome::NoFigure);
    }

    #[tokio::test]
    async fn test_extract_survives_sys_exit() {
        let env = StubEnv::new();
        let Some(runtime) = env.runtime() else { return };

        let outcome = runtime
            .extract("import sys\nsys.exit(3)", &env.dataset())
            .await
            .unwrap();
        assert!(matches!(outcome, ExtractOutcome::ExecutionFailed { .. }));
    }

    #[tokio::test]
    async fn test_extract_missing_dataset_fails_execution() {
        let env = StubEnv::new();
        let Some(runtime) = env.runtime() else { return };

        let missing = env.dir.path().join("absent.csv");
        let outcome = runtime.extract("fig = px.bar(data)", &missing).await.unwrap();
        assert!(matches!(outcome, ExtractOutcome::ExecutionFailed { .. }));
    }

    #[tokio::test]
    async fn test_extract_export_failure() {
        let env = StubEnv::new();
        let Some(runtime) = env.runtime() else { return };

        let outcome = runtime
            .extract("fig = px.bar(data, title='unexportable')", &env.dataset())
            .await
            .unwrap();
        assert_eq!(
            outcome,
            ExtractOutcome::ExportFailed {
                error: "no image engine".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_render_applies_style() {
        let env = StubEnv::new();
        let Some(runtime) = env.runtime() else { return };

        let outcome = runtime
            .render("fig = px.bar(data, title='Units')", &env.dataset(), &style())
            .await
            .unwrap();

        match outcome {
            RenderOutcome::Figure { figure, title } => {
                assert_eq!(title.as_deref(), Some("Units"));
                assert_eq!(figure["layout"]["template"], "plotly_dark");
                assert_eq!(figure["layout"]["width"], 600);
                assert_eq!(figure["layout"]["height"], 400);
                assert_eq!(figure["data"][0]["type"], "bar");
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_render_requires_fig_binding() {
        let env = StubEnv::new();
        let Some(runtime) = env.runtime() else { return };

        for code in ["fig = None", "chart = px.bar(data)", "raise KeyError('x')"] {
            let outcome = runtime.render(code, &env.dataset(), &style()).await.unwrap();
            assert!(
                matches!(outcome, RenderOutcome::Missing { .. }),
                "{}: {:?}",
                code,
                outcome
            );
        }
    }
}
