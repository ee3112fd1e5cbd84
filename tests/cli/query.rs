use crate::{FakeRedash, Sandbox};
use predicates::{prelude::*, str::contains};
use serde_json::json;

const CONFIG: &str = "\
contexts:
  local:
    endpoint: http://127.0.0.1:9
    api_key: key
    data_source_id: 1
";

#[test]
fn unclosed_parameter() {
    let sandbox = Sandbox::with_config(CONFIG);
    sandbox
        .redac()
        .args(["query", "-e", "select {{a", "local"])
        .assert()
        .failure()
        .stderr(contains("syntax error at idx 7"));
}

#[test]
fn wrong_number_of_arguments() {
    let sandbox = Sandbox::with_config(CONFIG);
    sandbox
        .redac()
        .args(["query", "-e", "select {{a}}, {{ b }}", "local", "1"])
        .assert()
        .failure()
        .stderr(contains("argument error").and(contains("<a> <b>")));
}

#[test]
fn unknown_context() {
    let sandbox = Sandbox::with_config(CONFIG);
    sandbox
        .redac()
        .args(["query", "-e", "select 1", "remote"])
        .assert()
        .failure()
        .stderr(contains("Context 'remote' not found"));
}

#[test]
fn missing_context() {
    let sandbox = Sandbox::with_config(CONFIG);
    sandbox
        .redac()
        .args(["query", "-e", "select 1"])
        .assert()
        .failure();
}

#[test]
fn missing_query_file() {
    let sandbox = Sandbox::with_config(CONFIG);
    let path = sandbox.path().join("missing.sql");
    sandbox
        .redac()
        .arg("query")
        .arg(&path)
        .arg("local")
        .assert()
        .failure()
        .stderr(contains("failed to read file"));
}

#[test]
fn unreachable_server() {
    let sandbox = Sandbox::with_config(CONFIG);
    let path = sandbox.path().join("users.sql");
    std::fs::write(&path, "#!/usr/bin/env redac\nselect * from users where id = {{id}}\n").unwrap();

    sandbox
        .redac()
        .arg("query")
        .arg(&path)
        .args(["local", "42"])
        .assert()
        .failure()
        .stderr(contains("failed to submit query"));
}

#[test]
fn endpoint_override() {
    let sandbox = Sandbox::with_config(
        "contexts:\n  local:\n    endpoint: http://redash.invalid\n    api_key: key\n",
    );

    sandbox
        .redac()
        .env("REDAC_ENDPOINT", "http://127.0.0.1:9")
        .args(["query", "-e", "select 1", "local"])
        .assert()
        .failure()
        .stderr(contains("failed to submit query"));
}

#[test]
fn invalid_format() {
    let sandbox = Sandbox::with_config(CONFIG);
    sandbox
        .redac()
        .args(["query", "--format", "xml", "-e", "select 1", "local"])
        .assert()
        .failure()
        .stderr(contains("invalid value 'xml'"));
}

#[test]
fn invalid_timeout() {
    let sandbox = Sandbox::with_config(CONFIG);
    sandbox
        .redac()
        .args(["query", "-t", "soon", "-e", "select 1", "local"])
        .assert()
        .failure()
        .stderr(contains("--timeout"));
}

fn users_result() -> serde_json::Value {
    json!({
        "query_result": {
            "id": 7,
            "query": "select id, name from users",
            "runtime": 0.02,
            "data": {
                "columns": [
                    {"name": "id", "friendly_name": "id", "type": "integer"},
                    {"name": "name", "friendly_name": "name", "type": "string"}
                ],
                "rows": [
                    {"id": 1.0, "name": "alice"},
                    {"id": 2.0, "name": "bob"}
                ]
            }
        }
    })
}

#[test]
fn csv_result_after_polling() {
    let server = FakeRedash::new()
        .route("POST", "/api/query_results", json!({"job": {"id": "j1", "status": 1}}))
        .route(
            "GET",
            "/api/jobs/j1",
            json!({"job": {"id": "j1", "status": 3, "query_result_id": 7}}),
        )
        .route("GET", "/api/query_results/7", users_result())
        .start();
    let sandbox = Sandbox::with_config(&server.config());

    sandbox
        .redac()
        .args([
            "query",
            "--format",
            "csv",
            "-e",
            "select id, name from users where team = '{{team}}'",
            "local",
            "core",
        ])
        .assert()
        .success()
        .stdout("id,name\n1,alice\n2,bob\n");

    assert_eq!(
        server.calls(),
        [
            "POST /api/query_results",
            "GET /api/jobs/j1",
            "GET /api/query_results/7"
        ]
    );

    let submit = &server.received()[0];
    assert_eq!(submit.authorization.as_deref(), Some("Key sekrit"));
    let body: serde_json::Value = serde_json::from_str(&submit.body).unwrap();
    assert_eq!(
        body,
        json!({
            "apply_auto_limit": true,
            "data_source_id": 2,
            "max_age": 0,
            "parameters": {"team": "core"},
            "query": "select id, name from users where team = '{{team}}'"
        })
    );
}

#[test]
fn immediate_success_skips_polling() {
    let server = FakeRedash::new()
        .route(
            "POST",
            "/api/query_results",
            json!({"job": {"id": "j1", "status": 3, "query_result_id": 7}}),
        )
        .route("GET", "/api/query_results/7", users_result())
        .start();
    let sandbox = Sandbox::with_config(&server.config());

    sandbox
        .redac()
        .args([
            "query",
            "--format",
            "json",
            "--no-header",
            "--no-limit",
            "-e",
            "select id, name from users",
            "local",
        ])
        .assert()
        .success()
        .stdout("[[\"1\",\"alice\"],[\"2\",\"bob\"]]\n");

    assert_eq!(
        server.calls(),
        ["POST /api/query_results", "GET /api/query_results/7"]
    );

    let body: serde_json::Value = serde_json::from_str(&server.received()[0].body).unwrap();
    assert_eq!(body["apply_auto_limit"], json!(false));
}

#[test]
fn failed_job() {
    let server = FakeRedash::new()
        .route(
            "POST",
            "/api/query_results",
            json!({"job": {"id": "j1", "status": 4, "error": "division by zero"}}),
        )
        .start();
    let sandbox = Sandbox::with_config(&server.config());

    sandbox
        .redac()
        .args(["query", "-e", "select 1/0", "local"])
        .assert()
        .failure()
        .stdout("")
        .stderr(contains("query failed: division by zero"));

    assert_eq!(server.calls(), ["POST /api/query_results"]);
}

#[test]
fn server_error_is_reported() {
    let server = FakeRedash::new().start();
    let sandbox = Sandbox::with_config(&server.config());

    sandbox
        .redac()
        .args(["query", "-e", "select 1", "local"])
        .assert()
        .failure()
        .stderr(contains("failed to submit query").and(contains("404")));
}

#[test]
fn timeout_deletes_job() {
    let server = FakeRedash::new()
        .route("POST", "/api/query_results", json!({"job": {"id": "j1", "status": 1}}))
        .route("GET", "/api/jobs/j1", json!({"job": {"id": "j1", "status": 2}}))
        .route("DELETE", "/api/jobs/j1", json!({}))
        .start();
    let sandbox = Sandbox::with_config(&server.config());

    sandbox
        .redac()
        .args(["query", "-t", "1500ms", "-e", "select pg_sleep(60)", "local"])
        .assert()
        .failure()
        .stderr(contains("query cancelled"));

    let calls = server.calls();
    assert_eq!(calls.first().map(String::as_str), Some("POST /api/query_results"));
    assert_eq!(calls.last().map(String::as_str), Some("DELETE /api/jobs/j1"));
    assert_eq!(calls.iter().filter(|c| c.starts_with("DELETE")).count(), 1);
}
