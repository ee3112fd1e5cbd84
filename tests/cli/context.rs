use crate::{FakeRedash, Sandbox};
use predicates::{prelude::*, str::contains};
use serde_json::json;

const CONFIG: &str = "\
# shared with the team
contexts:
  dev:
    endpoint: http://localhost:5000
    api_key: devkey
    data_source_id: 1
";

#[test]
fn ls_without_config() {
    let sandbox = Sandbox::new();
    sandbox
        .redac()
        .args(["context", "ls"])
        .assert()
        .success()
        .stdout(contains("NAME"));
}

#[test]
fn add_creates_config() {
    let sandbox = Sandbox::new();
    sandbox
        .redac()
        .args([
            "context",
            "add",
            "prod",
            "--endpoint",
            "https://redash.example.com/",
            "--api-key",
            "secret",
            "--data-source-id",
            "3",
        ])
        .assert()
        .success();

    let config: serde_yaml::Value = serde_yaml::from_str(&sandbox.config()).unwrap();
    let prod = &config["contexts"]["prod"];
    assert_eq!(prod["endpoint"].as_str(), Some("https://redash.example.com"));
    assert_eq!(prod["api_key"].as_str(), Some("secret"));
    assert_eq!(prod["data_source_id"].as_i64(), Some(3));

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt as _;
        let mode = std::fs::metadata(sandbox.config_path())
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    sandbox
        .redac()
        .args(["context", "ls"])
        .assert()
        .success()
        .stdout(contains("prod").and(contains("https://redash.example.com")));
}

#[test]
fn add_preserves_existing() {
    let sandbox = Sandbox::with_config(CONFIG);
    sandbox
        .redac()
        .args([
            "context",
            "add",
            "prod",
            "--endpoint",
            "https://redash.example.com",
            "--api-key",
            "secret",
            "--data-source-id",
            "3",
        ])
        .assert()
        .success();

    let contents = sandbox.config();
    assert!(contents.starts_with("# shared with the team\n"));

    let config: serde_yaml::Value = serde_yaml::from_str(&contents).unwrap();
    assert_eq!(config["contexts"]["dev"]["api_key"].as_str(), Some("devkey"));
    assert_eq!(config["contexts"]["prod"]["data_source_id"].as_i64(), Some(3));
}

#[test]
fn add_duplicate() {
    let sandbox = Sandbox::with_config(CONFIG);
    sandbox
        .redac()
        .args([
            "context",
            "add",
            "dev",
            "--endpoint",
            "http://localhost:5001",
            "--api-key",
            "other",
            "--data-source-id",
            "2",
        ])
        .assert()
        .failure()
        .stderr(contains("already exists"));

    assert_eq!(sandbox.config(), CONFIG);
}

#[test]
fn add_invalid_endpoint() {
    let sandbox = Sandbox::new();
    sandbox
        .redac()
        .args([
            "context",
            "add",
            "prod",
            "--endpoint",
            "not a url",
            "--api-key",
            "secret",
        ])
        .assert()
        .failure()
        .stderr(contains("--endpoint"));

    assert!(!sandbox.config_path().exists());
}

#[test]
fn add_without_data_source_lists_them() {
    let server = FakeRedash::new()
        .route(
            "GET",
            "/api/data_sources",
            json!([
                {"id": 5, "name": "warehouse", "type": "bigquery"},
                {"id": 2, "name": "app db", "type": "pg"}
            ]),
        )
        .start();
    let sandbox = Sandbox::new();

    let assert = sandbox
        .redac()
        .args([
            "context",
            "add",
            "prod",
            "--endpoint",
            server.endpoint.as_str(),
            "--api-key",
            "secret",
        ])
        .assert()
        .failure()
        .stderr(contains("choose a data source"));

    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let lines: Vec<Vec<&str>> = stdout
        .lines()
        .map(|l| l.split_whitespace().collect())
        .collect();
    assert_eq!(
        lines,
        [
            vec!["ID", "NAME", "TYPE"],
            vec!["2", "app", "db", "pg"],
            vec!["5", "warehouse", "bigquery"],
        ]
    );

    let received = server.received();
    assert_eq!(server.calls(), ["GET /api/data_sources"]);
    assert_eq!(received[0].authorization.as_deref(), Some("Key secret"));
    assert!(!sandbox.config_path().exists());
}

#[test]
fn add_unreachable_server() {
    let sandbox = Sandbox::new();
    sandbox
        .redac()
        .args([
            "context",
            "add",
            "prod",
            "--endpoint",
            "http://127.0.0.1:9",
            "--api-key",
            "secret",
        ])
        .assert()
        .failure()
        .stderr(contains("failed to list data sources"));

    assert!(!sandbox.config_path().exists());
}

#[test]
fn data_sources_command() {
    let server = FakeRedash::new()
        .route(
            "GET",
            "/api/data_sources",
            json!([{"id": 2, "name": "app", "type": "pg"}]),
        )
        .start();
    let sandbox = Sandbox::with_config(&server.config());

    sandbox
        .redac()
        .args(["data-sources", "local"])
        .assert()
        .success()
        .stdout(contains("ID").and(contains("app")).and(contains("pg")));

    assert_eq!(
        server.received()[0].authorization.as_deref(),
        Some("Key sekrit")
    );
}

#[test]
fn rm() {
    let sandbox = Sandbox::with_config(CONFIG);
    sandbox
        .redac()
        .args(["context", "rm", "dev"])
        .assert()
        .success()
        .stderr(contains("Removed context \"dev\""));

    let config: serde_yaml::Value = serde_yaml::from_str(&sandbox.config()).unwrap();
    assert!(config["contexts"].get("dev").is_none());
}

#[test]
fn rm_unknown() {
    let sandbox = Sandbox::with_config(CONFIG);
    sandbox
        .redac()
        .args(["context", "rm", "dev", "staging"])
        .assert()
        .failure()
        .stderr(contains("Context 'staging' not found"));

    assert_eq!(sandbox.config(), CONFIG);
}
