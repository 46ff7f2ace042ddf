mod common;

use common::{PETSTORE, spawn_server};
use serde_json::{Value, json};
use swagger_mcp_test_support::{tool_is_error, tool_json, tool_text};

struct Workspace {
    dir: tempfile::TempDir,
}

impl Workspace {
    fn new() -> anyhow::Result<Self> {
        let dir = tempfile::tempdir()?;
        std::fs::create_dir_all(dir.path().join("specs"))?;
        std::fs::write(dir.path().join("specs/petstore.yaml"), PETSTORE)?;
        std::fs::write(
            dir.path().join("swagger-targets.json"),
            r#"{"petstore": {"spec": "specs/petstore.yaml", "baseUrl": "http://localhost:4010"}}"#,
        )?;
        Ok(Self { dir })
    }

    fn config(&self) -> std::path::PathBuf {
        self.dir.path().join("swagger-targets.json")
    }
}

#[tokio::test]
async fn initialize_and_list_surface() -> anyhow::Result<()> {
    let ws = Workspace::new()?;
    let mut client = spawn_server(&ws.config(), ws.dir.path())?;

    let init = client.initialize().await?;
    assert_eq!(init["serverInfo"]["name"], "swagger-mcp");
    assert!(init["capabilities"]["tools"].is_object());
    assert!(init["capabilities"]["resources"].is_object());

    let tools = client.request("tools/list", json!({})).await?;
    let names: Vec<&str> = tools["tools"]
        .as_array()
        .map(|a| a.iter().filter_map(|t| t["name"].as_str()).collect())
        .unwrap_or_default();
    assert_eq!(names.len(), 12);
    assert!(names.contains(&"swagger_select_service"));
    assert!(names.contains(&"swagger_generate_code"));

    let resources = client.request("resources/list", json!({})).await?;
    assert_eq!(resources["resources"].as_array().map(Vec::len), Some(4));
    Ok(())
}

#[tokio::test]
async fn select_and_explore_over_stdio() -> anyhow::Result<()> {
    let ws = Workspace::new()?;
    let mut client = spawn_server(&ws.config(), ws.dir.path())?;
    client.initialize().await?;

    let result = client.call_tool("swagger_list_endpoints", json!({})).await?;
    assert!(tool_is_error(&result));
    assert_eq!(
        tool_text(&result),
        "Error: No service selected. Use swagger_select_service first."
    );

    let result = client
        .call_tool("swagger_select_service", json!({"name": "petstore"}))
        .await?;
    assert!(!tool_is_error(&result), "{}", tool_text(&result));
    let selected = tool_json(&result)?;
    assert_eq!(selected["isAlias"], true);
    assert_eq!(selected["baseUrl"], "http://localhost:4010");
    assert_eq!(selected["api"]["endpointCount"], 3);

    let listed = tool_json(&client.call_tool("swagger_list_endpoints", json!({"tag": "pets"})).await?)?;
    assert_eq!(listed["total"], 3);

    let detail = tool_json(
        &client
            .call_tool(
                "swagger_get_endpoint",
                json!({"method": "post", "path": "/pets"}),
            )
            .await?,
    )?;
    assert_eq!(
        detail["requestBody"]["content"]["application/json"]["schema"]["required"],
        json!(["id", "name"])
    );

    let curl = tool_json(
        &client
            .call_tool(
                "swagger_curl",
                json!({"method": "GET", "path": "/pets/{petId}", "pathParams": {"petId": "7"}}),
            )
            .await?,
    )?;
    assert_eq!(curl["curl"], "curl \\\n  'http://localhost:4010/pets/7'");

    let info = client
        .request("resources/read", json!({"uri": "swagger://current/info"}))
        .await?;
    let text = info["contents"][0]["text"].as_str().unwrap_or_default();
    let info: Value = serde_json::from_str(text)?;
    assert_eq!(info["title"], "Petstore");
    assert_eq!(info["baseUrl"], "http://localhost:4010");
    Ok(())
}

#[tokio::test]
async fn failed_selection_keeps_previous_and_unknown_tool_is_protocol_error() -> anyhow::Result<()> {
    let ws = Workspace::new()?;
    let mut client = spawn_server(&ws.config(), ws.dir.path())?;
    client.initialize().await?;

    client
        .call_tool("swagger_select_service", json!({"name": "petstore"}))
        .await?;
    let missing = ws.dir.path().join("specs/missing.json");
    let result = client
        .call_tool(
            "swagger_select_service",
            json!({"name": missing.display().to_string()}),
        )
        .await?;
    assert!(tool_is_error(&result));
    assert!(tool_text(&result).starts_with("Error: Failed to connect: "));

    let current = tool_json(&client.call_tool("swagger_get_current", json!({})).await?)?;
    assert_eq!(current["title"], "Petstore");

    let response = client
        .raw_request(
            "tools/call",
            json!({"name": "swagger_nope", "arguments": {}}),
        )
        .await?;
    assert!(response.get("error").is_some(), "{response}");
    Ok(())
}
