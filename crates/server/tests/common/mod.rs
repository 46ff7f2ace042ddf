use std::path::Path;
use swagger_mcp_test_support::StdioMcpClient;
use tokio::process::Command;

/// Spawn the server binary with `config` as its targets file and `cwd` as working directory.
///
/// `HOME` points at `cwd` too, so a developer's own `~/.swagger-mcp` never leaks into a test.
pub fn spawn_server(config: &Path, cwd: &Path) -> anyhow::Result<StdioMcpClient> {
    let bin = env!("CARGO_BIN_EXE_swagger-mcp");
    let mut command = Command::new(bin);
    command
        .arg("--config")
        .arg(config)
        .arg("--log-level")
        .arg("debug")
        .current_dir(cwd)
        .env("HOME", cwd)
        .env_remove("SWAGGER_MCP_CONFIG")
        .env_remove("RUST_LOG");
    StdioMcpClient::spawn(command)
}

pub const PETSTORE: &str = r#"
openapi: 3.0.3
info:
  title: Petstore
  version: 1.0.0
servers:
  - url: https://petstore.example.com/v1
tags:
  - name: pets
paths:
  /pets:
    get:
      operationId: listPets
      summary: List all pets
      tags: [pets]
      parameters:
        - name: limit
          in: query
          schema:
            type: integer
    post:
      operationId: createPet
      tags: [pets]
      requestBody:
        content:
          application/json:
            schema:
              $ref: '#/components/schemas/Pet'
  /pets/{petId}:
    get:
      operationId: showPetById
      summary: Info for a specific pet
      tags: [pets]
      parameters:
        - name: petId
          in: path
          required: true
          schema:
            type: string
components:
  schemas:
    Pet:
      type: object
      required: [id, name]
      properties:
        id:
          type: integer
        name:
          type: string
"#;
