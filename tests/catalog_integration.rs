use assert_cmd::Command;
use predicates::prelude::*;

fn run(req: &serde_json::Value) -> anyhow::Result<String> {
    let mut cmd = Command::cargo_bin("github-connector")?;
    let input = serde_json::to_string(req)?;
    let assert = cmd
        .arg("--log-level")
        .arg("warn")
        .write_stdin(format!("{}\n", input))
        .assert();
    let output = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    Ok(output)
}

#[test]
fn initialize_reports_server_identity() -> anyhow::Result<()> {
    let req = serde_json::json!({"jsonrpc": "2.0", "method": "initialize", "id": 1});
    let out = run(&req)?;
    let v: serde_json::Value = serde_json::from_str(out.trim())?;
    assert_eq!(v["result"]["server"]["name"], "github-connector");
    assert!(v["result"]["server"]["protocol"].is_string());
    Ok(())
}

#[test]
fn actions_list_describes_update_issue() -> anyhow::Result<()> {
    let req = serde_json::json!({"jsonrpc": "2.0", "method": "actions/list", "id": 2});
    let out = run(&req)?;
    let v: serde_json::Value = serde_json::from_str(out.trim())?;
    let actions = v["result"]["actions"].as_array().unwrap();
    assert_eq!(actions.len(), 1);
    let action = &actions[0];
    assert_eq!(action["name"], "update_issue");
    assert_eq!(action["title"], "Update Issue");
    assert_eq!(action["output"]["ref"], "issue");

    let props = action["properties"].as_array().unwrap();
    assert_eq!(props.len(), 7);
    let by_name = |n: &str| {
        props
            .iter()
            .find(|p| p["name"] == n)
            .unwrap_or_else(|| panic!("missing property {}", n))
    };
    assert_eq!(by_name("repository")["required"], true);
    assert_eq!(by_name("repository")["optionsLookup"], "repositories");
    assert_eq!(by_name("issue")["optionsDependOn"], "repository");
    assert_eq!(by_name("milestone")["optionsLookup"], "milestones");
    assert_eq!(by_name("assignees")["optionsLookup"], "collaborators");
    assert_eq!(by_name("state")["options"][1]["value"], "closed");
    assert!(by_name("title").get("optionsLookup").is_none());

    let schema = &action["inputSchema"];
    assert_eq!(schema["required"], serde_json::json!(["repository", "issue"]));
    assert_eq!(
        schema["properties"]["state"]["enum"],
        serde_json::json!(["open", "closed"])
    );
    assert_eq!(schema["properties"]["assignees"]["type"], "array");
    Ok(())
}

#[test]
fn ping_round_trip() -> anyhow::Result<()> {
    let req = serde_json::json!({
        "jsonrpc": "2.0", "method": "ping", "id": 3,
        "params": {"message": "hello"}
    });
    let out = run(&req)?;
    assert!(out.contains("\"message\":\"hello\""));
    Ok(())
}

#[test]
fn unknown_method_and_action_are_reported() -> anyhow::Result<()> {
    let req = serde_json::json!({"jsonrpc": "2.0", "method": "workflows/run", "id": 4});
    let out = run(&req)?;
    assert!(out.contains("-32601"));

    let req = serde_json::json!({
        "jsonrpc": "2.0", "method": "actions/call", "id": 5,
        "params": {"name": "delete_issue", "arguments": {}}
    });
    let out = run(&req)?;
    assert!(out.contains("-32601"));
    assert!(out.contains("delete_issue"));
    Ok(())
}

#[test]
fn version_flag_prints_and_exits() -> anyhow::Result<()> {
    Command::cargo_bin("github-connector")?
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("github-connector"));
    Ok(())
}

#[test]
fn requests_are_processed_per_line() -> anyhow::Result<()> {
    let first = serde_json::json!({"jsonrpc": "2.0", "method": "ping", "id": 1});
    let second = serde_json::json!({"jsonrpc": "2.0", "method": "ping", "id": 2, "params": {"message": "two"}});
    let mut cmd = Command::cargo_bin("github-connector")?;
    let assert = cmd
        .arg("--log-level")
        .arg("warn")
        .write_stdin(format!(
            "{}\n{}\n",
            serde_json::to_string(&first)?,
            serde_json::to_string(&second)?
        ))
        .assert();
    let out = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let lines: Vec<&str> = out.lines().filter(|l| !l.trim().is_empty()).collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].contains("\"pong\""));
    assert!(lines[1].contains("\"two\""));
    Ok(())
}
