//! End-to-end packaging runs against a local registry.

use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use edge_adapter::{AssetSettings, EnvSettings, SettingsMap};
use edge_packager::{PackageError, Packager, PackagerConfig, Step};
use flate2::write::GzEncoder;
use flate2::Compression;
use serde_json::json;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

// === Fixtures ===

fn bundle(files: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, content) in files {
        writer.start_file(*name, SimpleFileOptions::default()).unwrap();
        writer.write_all(content.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

fn polyfill() -> Vec<u8> {
    let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
    for (path, content) in [
        ("package/package.json", r#"{"name":"node-fetch","version":"2.3.0"}"#),
        ("package/lib/index.js", "module.exports = fetch"),
    ] {
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        header.set_mtime(0);
        builder.append_data(&mut header, path, content.as_bytes()).unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap()
}

/// Minimal registry answering every request with `status` and `body`.
async fn registry(status: &'static str, body: Vec<u8>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let body = body.clone();
            tokio::spawn(async move {
                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => request.extend_from_slice(&buf[..n]),
                    }
                }
                let head = format!(
                    "HTTP/1.1 {}\r\ncontent-length: {}\r\nconnection: close\r\n\r\n",
                    status,
                    body.len()
                );
                let _ = socket.write_all(head.as_bytes()).await;
                let _ = socket.write_all(&body).await;
                let _ = socket.shutdown().await;
            });
        }
    });
    format!("http://{}", addr)
}

struct Fixture {
    dir: TempDir,
    bundle: PathBuf,
    output: PathBuf,
    config: PackagerConfig,
}

impl Fixture {
    async fn new(files: &[(&str, &str)]) -> Self {
        Self::with_registry(files, registry("200 OK", polyfill()).await).await
    }

    async fn with_registry(files: &[(&str, &str)], registry: String) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let bundle_path = dir.path().join("app.fab");
        std::fs::write(&bundle_path, bundle(files)).unwrap();

        let adapter = dir.path().join("adapter-bin");
        std::fs::write(&adapter, b"\x7fELF adapter").unwrap();

        let mut config = PackagerConfig::default();
        config.dependency.registry = registry;
        config.dependency.timeout_secs = 5;
        config.shim.adapter = Some(adapter);

        Self {
            bundle: bundle_path,
            output: dir.path().join("dist"),
            dir,
            config,
        }
    }

    fn packager(&self) -> Packager {
        Packager::new(self.config.clone()).unwrap()
    }
}

fn settings(value: serde_json::Value) -> SettingsMap {
    value.as_object().cloned().unwrap_or_default()
}

fn output_entries(dir: &Path) -> Vec<String> {
    let mut names: Vec<_> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

fn read_entry(archive: &Path, name: &str) -> Vec<u8> {
    let mut zip = ZipArchive::new(std::fs::File::open(archive).unwrap()).unwrap();
    let mut entry = zip.by_name(name).unwrap();
    let mut content = Vec::new();
    entry.read_to_end(&mut content).unwrap();
    content
}

fn entry_names(archive: &Path) -> Vec<String> {
    edge_packager::list_entries(archive)
        .unwrap()
        .into_iter()
        .map(|(name, _)| name)
        .collect()
}

const APP: &[(&str, &str)] = &[
    ("server.js", "module.exports.render = () => 'hi'"),
    ("_assets/app.css", "body{}"),
    ("_assets/img/logo.svg", "<svg/>"),
];

// === Successful runs ===

#[tokio::test]
async fn test_package_produces_two_artifacts() {
    let fx = Fixture::new(APP).await;

    let report = fx
        .packager()
        .package(&fx.bundle, &fx.output, &SettingsMap::new(), &SettingsMap::new())
        .await
        .unwrap();

    assert_eq!(report.artifacts.len(), 2);
    assert_eq!(report.artifacts[0].name, "lambda.zip");
    assert_eq!(report.artifacts[1].name, "assets.zip");
    assert_eq!(report.workspace_id.len(), 32);

    // Workspace gone, only the two artifacts remain.
    assert_eq!(output_entries(&fx.output), vec!["assets.zip", "lambda.zip"]);

    let lambda = fx.output.join("lambda.zip");
    assert_eq!(
        entry_names(&lambda),
        vec![
            "asset_settings.json",
            "bootstrap",
            "env_settings.json",
            "node_modules/node-fetch/lib/index.js",
            "node_modules/node-fetch/package.json",
            "server.js",
        ]
    );
    assert_eq!(read_entry(&lambda, "bootstrap"), b"\x7fELF adapter");

    assert_eq!(
        entry_names(&fx.output.join("assets.zip")),
        vec!["_assets/app.css", "_assets/img/logo.svg"]
    );
}

#[tokio::test]
async fn test_package_is_deterministic() {
    let fx = Fixture::new(APP).await;
    let packager = fx.packager();
    let env = settings(json!({ "API_URL": "https://api.example.com" }));
    let assets = settings(json!({ "path": "/static" }));

    let first = fx.dir.path().join("first");
    let second = fx.dir.path().join("second");
    let a = packager.package(&fx.bundle, &first, &env, &assets).await.unwrap();
    let b = packager.package(&fx.bundle, &second, &env, &assets).await.unwrap();

    assert_ne!(a.workspace_id, b.workspace_id);
    assert_eq!(a.artifacts[0].sha256, b.artifacts[0].sha256);
    assert_eq!(
        std::fs::read(first.join("lambda.zip")).unwrap(),
        std::fs::read(second.join("lambda.zip")).unwrap()
    );
    assert_eq!(
        std::fs::read(first.join("assets.zip")).unwrap(),
        std::fs::read(second.join("assets.zip")).unwrap()
    );
}

#[tokio::test]
async fn test_package_merges_settings() {
    let fx = Fixture::new(APP).await;
    let env = settings(json!({ "API_URL": "https://api.example.com", "RETRIES": 3 }));
    let assets = settings(json!({ "domainName": "cdn.example.com", "port": 8443 }));

    fx.packager()
        .package(&fx.bundle, &fx.output, &env, &assets)
        .await
        .unwrap();

    let lambda = fx.output.join("lambda.zip");
    let asset_doc = String::from_utf8(read_entry(&lambda, "asset_settings.json")).unwrap();
    let loaded = AssetSettings::from_json(&asset_doc).unwrap();
    assert_eq!(loaded.domain_name, "cdn.example.com");
    assert_eq!(loaded.port, 8443);
    assert_eq!(loaded.protocol, "https");
    assert_eq!(loaded.read_timeout, 30);

    let env_doc: SettingsMap =
        serde_json::from_slice(&read_entry(&lambda, "env_settings.json")).unwrap();
    let env_settings = EnvSettings(env_doc);
    assert_eq!(env_settings.get_str("API_URL"), Some("https://api.example.com"));
    assert_eq!(env_settings.get("RETRIES"), Some(&json!(3)));
}

#[tokio::test]
async fn test_package_normalizes_nested_server() {
    let fx = Fixture::new(&[("server/bundle.js", "nested server"), ("_assets/a.txt", "a")]).await;

    fx.packager()
        .package(&fx.bundle, &fx.output, &SettingsMap::new(), &SettingsMap::new())
        .await
        .unwrap();

    let lambda = fx.output.join("lambda.zip");
    assert_eq!(read_entry(&lambda, "server.js"), b"nested server");
    assert!(!entry_names(&lambda).iter().any(|n| n.starts_with("server/")));
}

#[tokio::test]
async fn test_package_without_assets() {
    let fx = Fixture::new(&[("server.js", "x")]).await;

    let report = fx
        .packager()
        .package(&fx.bundle, &fx.output, &SettingsMap::new(), &SettingsMap::new())
        .await
        .unwrap();

    assert_eq!(report.artifacts[1].entries, 0);
    assert!(entry_names(&fx.output.join("assets.zip")).is_empty());
}

#[tokio::test]
async fn test_package_reports_progress() {
    let fx = Fixture::new(APP).await;
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);

    fx.packager()
        .on_progress(move |step| sink.lock().unwrap().push(step))
        .package(&fx.bundle, &fx.output, &SettingsMap::new(), &SettingsMap::new())
        .await
        .unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), Step::TOTAL);
    assert_eq!(seen.first(), Some(&Step::Extract));
    assert_eq!(seen.last(), Some(&Step::Cleanup));
}

#[tokio::test]
async fn test_concurrent_runs_share_output_dir() {
    let fx = Fixture::new(APP).await;
    let packager = fx.packager();
    let none = SettingsMap::new();

    let (a, b) = tokio::join!(
        packager.package(&fx.bundle, &fx.output, &none, &none),
        packager.package(&fx.bundle, &fx.output, &none, &none),
    );
    let (a, b) = (a.unwrap(), b.unwrap());

    assert_ne!(a.workspace_id, b.workspace_id);
    assert_eq!(a.artifacts[0].sha256, b.artifacts[0].sha256);
    assert_eq!(output_entries(&fx.output), vec!["assets.zip", "lambda.zip"]);
}

#[cfg(unix)]
#[tokio::test]
async fn test_cleanup_failure_is_not_fatal() {
    let fx = Fixture::new(APP).await;
    let output = fx.output.clone();
    let blocked = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&blocked);

    // Swap the workspace for a plain file of the same name so it cannot be removed.
    let report = fx
        .packager()
        .on_progress(move |step| {
            if step != Step::Cleanup {
                return;
            }
            let workspace = std::fs::read_dir(&output)
                .unwrap()
                .map(|e| e.unwrap().path())
                .find(|p| p.is_dir())
                .unwrap();
            std::fs::remove_dir_all(&workspace).unwrap();
            std::fs::write(&workspace, b"in use").unwrap();
            *sink.lock().unwrap() = Some(workspace);
        })
        .package(&fx.bundle, &fx.output, &SettingsMap::new(), &SettingsMap::new())
        .await
        .unwrap();

    let blocked = blocked.lock().unwrap().clone().unwrap();
    assert!(blocked.is_file());
    assert_eq!(report.workspace_id, blocked.file_name().unwrap().to_string_lossy());
    assert_eq!(report.artifacts.len(), 2);
    assert!(fx.output.join("lambda.zip").is_file());
    assert!(fx.output.join("assets.zip").is_file());
}

// === Failed runs ===

#[tokio::test]
async fn test_missing_server_fails_and_cleans_up() {
    let fx = Fixture::new(&[("_assets/app.css", "body{}")]).await;

    let result = fx
        .packager()
        .package(&fx.bundle, &fx.output, &SettingsMap::new(), &SettingsMap::new())
        .await;

    match result {
        Err(PackageError::Packaging { artifact, reason }) => {
            assert_eq!(artifact, "lambda.zip");
            assert!(reason.contains("server.js"));
        }
        other => panic!("expected packaging error, got {:?}", other),
    }
    assert!(output_entries(&fx.output).is_empty());
}

#[tokio::test]
async fn test_registry_failure_cleans_up() {
    let registry = registry("404 Not Found", b"missing".to_vec()).await;
    let fx = Fixture::with_registry(APP, registry).await;

    let result = fx
        .packager()
        .package(&fx.bundle, &fx.output, &SettingsMap::new(), &SettingsMap::new())
        .await;

    assert!(matches!(result, Err(PackageError::Network { .. })));
    assert!(output_entries(&fx.output).is_empty());
}

#[tokio::test]
async fn test_corrupt_bundle_cleans_up() {
    let fx = Fixture::new(APP).await;
    std::fs::write(&fx.bundle, b"not a zip").unwrap();

    let result = fx
        .packager()
        .package(&fx.bundle, &fx.output, &SettingsMap::new(), &SettingsMap::new())
        .await;

    assert!(matches!(result, Err(PackageError::Extraction { .. })));
    assert!(output_entries(&fx.output).is_empty());
}

#[tokio::test]
async fn test_mistyped_asset_setting_fails_before_workspace() {
    let fx = Fixture::new(APP).await;
    let packager = fx.packager();

    for overrides in [json!({ "port": "8443" }), json!({ "keepaliveTimeout": 5.5 })] {
        let result = packager
            .package(&fx.bundle, &fx.output, &SettingsMap::new(), &settings(overrides))
            .await;
        assert!(matches!(result, Err(PackageError::Settings(_))), "{:?}", result);
    }
    assert!(!fx.output.exists());
}

#[tokio::test]
async fn test_missing_adapter_fails() {
    let mut fx = Fixture::new(APP).await;
    fx.config.shim.adapter = Some(fx.dir.path().join("no-such-adapter"));

    let result = fx
        .packager()
        .package(&fx.bundle, &fx.output, &SettingsMap::new(), &SettingsMap::new())
        .await;

    assert!(matches!(result, Err(PackageError::Io { .. })));
    assert!(output_entries(&fx.output).is_empty());
}
