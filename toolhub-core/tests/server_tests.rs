//! End-to-end tests: discovered scripts served through the MCP server
//!
//! These tests drive the full path from a JSON-RPC request through catalog
//! lookup, validation, policy and subprocess execution.

use serde_json::{Value, json};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use toolhub_core::prelude::*;

/// Resolves nothing, so only scripts and manifests are registered
#[derive(Debug)]
struct NoExecutables;

impl ExecutableProbe for NoExecutables {
    fn resolve(&self, _command: &str) -> Option<PathBuf> {
        None
    }
}

fn write_script(root: &Path, name: &str, body: &str) {
    use std::os::unix::fs::PermissionsExt;
    let path = root.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, body).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
}

fn setup(max_output: usize) -> (TempDir, McpServer) {
    let root = TempDir::new().unwrap();
    let scripts = root.path().join("scripts");
    write_script(
        &scripts,
        "text/shout.sh",
        "#!/usr/bin/env bash\n#==MCP==\n# {\"description\": \"Upper-case the arguments.\"}\n#==/MCP==\necho \"$@\" | tr a-z A-Z\n",
    );
    write_script(&scripts, "util/nap.sh", "#!/usr/bin/env bash\nsleep 1\necho rested\n");
    write_script(&scripts, "util/fail.sh", "#!/usr/bin/env bash\necho oops\nexit 4\n");
    write_script(&scripts, "util/notes.txt", "not a script\n");

    let mut config = ToolhubConfig::default();
    config.scripts_root = scripts;
    config.tools_dir = root.path().join("mcp_tools");
    config.security.max_output_length = max_output;

    let limiter = Arc::new(RateLimiter::new(50, Duration::from_secs(10)));
    let registry = build_catalog_with(&config, Arc::new(NoExecutables), limiter);
    let server = McpServer::builder(Arc::new(registry))
        .name("toolhub-test")
        .version("0.0.1")
        .build();
    (root, server)
}

fn call(id: i64, name: &str, arguments: Value) -> JsonRpcRequest {
    JsonRpcRequest::new(id, "tools/call").with_params(json!({"name": name, "arguments": arguments}))
}

fn result_for(responses: &[JsonRpcResponse], id: i64) -> Value {
    responses
        .iter()
        .find(|r| r.id == RequestId::Number(id))
        .and_then(|r| r.result.clone())
        .unwrap_or_else(|| panic!("no result for request {}", id))
}

#[tokio::test]
async fn test_session_over_memory_transport() {
    let (_root, server) = setup(20_000);
    let mut transport = MemoryTransport::new();
    transport.push_request(JsonRpcRequest::new(1i64, "initialize").with_params(json!({})));
    transport.push_request(JsonRpcRequest::notification("notifications/initialized"));
    transport.push_request(JsonRpcRequest::new(2i64, "tools/list"));
    transport.push_request(call(3, "sh_shout", json!({"args": ["hello", "there"]})));
    transport.push_request(call(4, "sh_fail", json!({})));
    transport.push_request(call(5, "run_script", json!({"name": "sh_shout", "args": ["meta"]})));
    transport.push_request(call(6, "sh_missing", json!({})));

    server.run(&mut transport).await.unwrap();
    let responses = transport.responses();
    assert_eq!(responses.len(), 6);

    let init = result_for(responses, 1);
    assert_eq!(init["serverInfo"]["name"], "toolhub-test");

    let listed = result_for(responses, 2);
    let names: Vec<&str> = listed["tools"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["sh_shout", "sh_fail", "sh_nap", "run_script"]);
    assert_eq!(listed["tools"][0]["description"], "Upper-case the arguments.");

    let shout = result_for(responses, 3);
    assert_eq!(shout["content"][0]["text"], "HELLO THERE\n");
    assert_eq!(shout["isError"], false);

    let fail = result_for(responses, 4);
    assert_eq!(fail["isError"], true);
    assert_eq!(fail["content"][0]["text"], "Command exited with code 4.\noops");

    let meta = result_for(responses, 5);
    assert_eq!(meta["content"][0]["text"], "META\n");

    let missing = result_for(responses, 6);
    assert_eq!(missing["isError"], true);
}

#[tokio::test]
async fn test_truncation_metadata() {
    let (_root, server) = setup(4);
    let response = server
        .handle_request(call(1, "sh_shout", json!({"args": ["abcdefgh"]})))
        .await
        .unwrap();
    let result = response.result.unwrap();
    assert_eq!(
        result["content"][0]["text"],
        format!("ABCD{}", TRUNCATION_MARKER)
    );
    assert_eq!(result["metadata"]["truncated"], true);
}

#[tokio::test]
async fn test_policy_violation_reported_as_error_result() {
    let (_root, server) = setup(20_000);
    let response = server
        .handle_request(call(1, "sh_shout", json!({"args": ["/etc/hosts"]})))
        .await
        .unwrap();
    let result = response.result.unwrap();
    assert_eq!(result["isError"], true);
    assert!(
        result["content"][0]["text"]
            .as_str()
            .unwrap()
            .starts_with("path_not_allowed:")
    );
}

#[tokio::test]
async fn test_tool_calls_run_concurrently() {
    let (_root, server) = setup(20_000);
    let mut transport = MemoryTransport::new();
    transport.push_request(call(1, "sh_nap", json!({})));
    transport.push_request(call(2, "sh_nap", json!({})));
    transport.push_request(call(3, "sh_nap", json!({})));

    let started = Instant::now();
    server.run(&mut transport).await.unwrap();
    let elapsed = started.elapsed();

    assert_eq!(transport.responses().len(), 3);
    for id in 1..=3 {
        assert_eq!(result_for(transport.responses(), id)["content"][0]["text"], "rested\n");
    }
    assert!(elapsed < Duration::from_millis(2500), "took {:?}", elapsed);
}
