//! Render collaborator backed by a child process.
//!
//! Each render spawns the configured command in the lambda root, writes one
//! JSON document to its stdin and reads one JSON document from its stdout:
//!
//! ```text
//! in:  {"method": "GET", "url": "https://host/path", "headers": [["name", "value"]],
//!       "body": "<base64>", "settings": {...}}
//! out: {"status": 200, "headers": [["name", "value"]], "body": "...",
//!       "bodyEncoding": "text" | "base64"}
//! ```

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use anyhow::{bail, Context as _};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use http::{Request, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::event::BodyEncoding;
use crate::handler::Render;
use crate::layout::{RENDER_COMMAND_ENV, SERVER_FILE};

/// Runtime used for the bundled server when no command is configured.
const DEFAULT_RUNTIME: &str = "node";

#[derive(Serialize)]
struct RenderInput<'a> {
    method: &'a str,
    url: String,
    headers: Vec<(&'a str, &'a str)>,
    body: String,
    settings: &'a Value,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RenderOutput {
    status: u16,
    #[serde(default)]
    headers: Vec<(String, String)>,
    #[serde(default)]
    body: String,
    #[serde(default = "default_output_encoding")]
    body_encoding: BodyEncoding,
}

fn default_output_encoding() -> BodyEncoding {
    BodyEncoding::Text
}

/// Renders by running the bundled server as a child process.
#[derive(Debug, Clone)]
pub struct CommandRender {
    program: String,
    args: Vec<String>,
    working_dir: PathBuf,
    settings: Option<Value>,
}

impl CommandRender {
    pub fn new(program: impl Into<String>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: working_dir.into(),
            settings: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Production settings handed to every render.
    pub fn with_settings(mut self, settings: Value) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Build from a whitespace-separated command line such as `node server.js`.
    pub fn from_command_line(line: &str, working_dir: impl Into<PathBuf>) -> Option<Self> {
        let mut words = line.split_whitespace();
        let program = words.next()?;
        Some(words.fold(Self::new(program, working_dir), |render, word| render.arg(word)))
    }

    /// The command from `EDGE_RENDER_COMMAND`, or `node server.js` in `root`.
    pub fn from_env(root: &Path) -> Self {
        std::env::var(RENDER_COMMAND_ENV)
            .ok()
            .and_then(|line| Self::from_command_line(&line, root))
            .unwrap_or_else(|| Self::new(DEFAULT_RUNTIME, root).arg(SERVER_FILE))
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

#[async_trait]
impl Render for CommandRender {
    async fn render(
        &self,
        request: Request<Vec<u8>>,
        settings: &Value,
    ) -> anyhow::Result<Response<Vec<u8>>> {
        let (parts, body) = request.into_parts();
        let headers = parts
            .headers
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str(), v)))
            .collect();
        let input = serde_json::to_vec(&RenderInput {
            method: parts.method.as_str(),
            url: parts.uri.to_string(),
            headers,
            body: STANDARD.encode(&body),
            settings,
        })?;

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .current_dir(&self.working_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to start render command '{}'", self.program))?;

        if let Some(mut stdin) = child.stdin.take() {
            // A command that answers without reading its input closes the pipe early.
            match stdin.write_all(&input).await {
                Err(e) if e.kind() != ErrorKind::BrokenPipe => {
                    return Err(e).context("failed to write render input");
                }
                _ => {}
            }
        }

        let output = child
            .wait_with_output()
            .await
            .context("failed to wait for render command")?;
        if !output.status.success() {
            bail!(
                "render command exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        let rendered: RenderOutput = serde_json::from_slice(&output.stdout)
            .context("render command produced invalid output")?;
        let body = match rendered.body_encoding {
            BodyEncoding::Text => rendered.body.into_bytes(),
            BodyEncoding::Base64 => STANDARD
                .decode(rendered.body.as_bytes())
                .context("render output body is not valid base64")?,
        };

        let mut builder = Response::builder().status(rendered.status);
        for (name, value) in &rendered.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        Ok(builder.body(body)?)
    }

    fn prod_settings(&self) -> Option<Value> {
        self.settings.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_command_line() {
        let render =
            CommandRender::from_command_line("  node  server.js --prod ", "/var/task").unwrap();
        assert_eq!(render.program(), "node");
        assert_eq!(render.args(), ["server.js", "--prod"]);
        assert!(CommandRender::from_command_line("   ", "/var/task").is_none());
    }

    #[test]
    fn test_prod_settings_passthrough() {
        let render = CommandRender::new("node", "/var/task");
        assert!(render.prod_settings().is_none());

        let render = render.with_settings(serde_json::json!({ "API_URL": "https://api" }));
        assert_eq!(render.prod_settings().unwrap()["API_URL"], "https://api");
    }

    #[cfg(unix)]
    mod unix {
        use super::*;

        fn shell(script: &str, dir: &Path) -> CommandRender {
            CommandRender::new("sh", dir).arg("-c").arg(script)
        }

        fn request() -> Request<Vec<u8>> {
            Request::builder()
                .method("POST")
                .uri("https://example.com/api?q=1")
                .header("accept", "text/html")
                .body(b"ping".to_vec())
                .unwrap()
        }

        #[tokio::test]
        async fn test_render_round_trip() {
            let dir = tempfile::tempdir().unwrap();
            let render = shell(
                r#"cat > input.json; printf '%s' '{"status":201,"headers":[["content-type","text/plain"],["set-cookie","a=1"],["set-cookie","b=2"]],"body":"created"}'"#,
                dir.path(),
            );

            let settings = serde_json::json!({ "API_URL": "https://api" });
            let response = render.render(request(), &settings).await.unwrap();

            assert_eq!(response.status(), 201);
            assert_eq!(response.body(), b"created");
            let cookies: Vec<_> = response.headers().get_all("set-cookie").iter().collect();
            assert_eq!(cookies, ["a=1", "b=2"]);

            let input: Value =
                serde_json::from_slice(&std::fs::read(dir.path().join("input.json")).unwrap())
                    .unwrap();
            assert_eq!(input["method"], "POST");
            assert_eq!(input["url"], "https://example.com/api?q=1");
            assert_eq!(input["headers"], serde_json::json!([["accept", "text/html"]]));
            assert_eq!(input["body"], "cGluZw==");
            assert_eq!(input["settings"]["API_URL"], "https://api");
        }

        #[tokio::test]
        async fn test_render_base64_output() {
            let dir = tempfile::tempdir().unwrap();
            let render = shell(
                r#"cat > /dev/null; printf '%s' '{"status":200,"body":"iVBORw==","bodyEncoding":"base64"}'"#,
                dir.path(),
            );

            let response = render.render(request(), &Value::Null).await.unwrap();
            assert_eq!(response.body(), &[0x89u8, 0x50, 0x4e, 0x47]);
        }

        #[tokio::test]
        async fn test_render_command_failure() {
            let dir = tempfile::tempdir().unwrap();
            let render = shell("cat > /dev/null; echo boom >&2; exit 3", dir.path());

            let err = render.render(request(), &Value::Null).await.unwrap_err();
            assert!(format!("{:#}", err).contains("boom"));
        }

        #[tokio::test]
        async fn test_render_invalid_output() {
            let dir = tempfile::tempdir().unwrap();
            let render = shell("cat > /dev/null; echo not-json", dir.path());
            assert!(render.render(request(), &Value::Null).await.is_err());
        }

        #[tokio::test]
        async fn test_render_missing_program() {
            let dir = tempfile::tempdir().unwrap();
            let render = CommandRender::new("definitely-not-a-runtime", dir.path());
            assert!(render.render(request(), &Value::Null).await.is_err());
        }
    }
}
