//! Shared state behind every tool call and resource read.

use crate::config::{ConfigStore, ServiceTarget};
use crate::error::{Result, ServerError};
use crate::session::{ServiceSelection, SessionState, Superseded};
use std::sync::Arc;
use std::time::Duration;
use swagger_mcp_http_tools::runtime::{DEFAULT_TIMEOUT, HttpClientOptions, HttpTestClient};
use swagger_mcp_openapi_tools::dialect::{self, ApiSummary};
use swagger_mcp_openapi_tools::error::OpenApiToolsError;
use swagger_mcp_openapi_tools::resolver::{CircularRefs, Document, DocumentStore};
use tracing::info;

const CONNECT_CONTEXT: &str = "Failed to connect";

#[derive(Debug, Clone)]
pub struct ContextOptions {
    pub request_timeout: Duration,
    pub max_response_bytes: Option<usize>,
    pub circular_refs: CircularRefs,
}

impl Default for ContextOptions {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_TIMEOUT,
            max_response_bytes: None,
            circular_refs: CircularRefs::default(),
        }
    }
}

/// Outcome of a successful `select`.
#[derive(Debug, Clone)]
pub struct Selected {
    pub selection: ServiceSelection,
    pub summary: ApiSummary,
}

pub struct ServiceContext {
    store: DocumentStore,
    session: SessionState,
    config: ConfigStore,
    http: HttpTestClient,
}

impl ServiceContext {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built (TLS backend initialization).
    pub fn new(config: ConfigStore, options: ContextOptions) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("swagger-mcp/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let http = HttpTestClient::new(
            client.clone(),
            HttpClientOptions {
                timeout: options.request_timeout,
                max_response_bytes: options.max_response_bytes,
            },
        );
        Ok(Self {
            store: DocumentStore::new(client, options.circular_refs),
            session: SessionState::default(),
            config,
            http,
        })
    }

    #[must_use]
    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    #[must_use]
    pub fn session(&self) -> &SessionState {
        &self.session
    }

    #[must_use]
    pub fn config(&self) -> &ConfigStore {
        &self.config
    }

    #[must_use]
    pub fn http(&self) -> &HttpTestClient {
        &self.http
    }

    /// # Errors
    ///
    /// Returns [`ServerError::NoSelection`] when nothing is selected.
    pub fn require_selection(&self) -> Result<Arc<ServiceSelection>> {
        self.session.current().ok_or(ServerError::NoSelection)
    }

    /// The selected service and its (cached) document.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::NoSelection`], or the resolve failure prefixed with `context`.
    pub async fn current_document(
        &self,
        context: &'static str,
    ) -> Result<(Arc<ServiceSelection>, Arc<Document>)> {
        let selection = self.require_selection()?;
        let doc = self
            .store
            .resolve(&selection.source, true)
            .await
            .map_err(|e| ServerError::spec(context, e))?;
        Ok((selection, doc))
    }

    /// Resolve `name` (config alias or direct location), fetch it fresh and make it current.
    ///
    /// The previous selection stays in place unless the new target loads and summarizes cleanly.
    ///
    /// # Errors
    ///
    /// Returns the load/parse failure, or [`ServerError::Superseded`] if another selection landed
    /// first.
    pub async fn select(&self, name: &str) -> Result<Selected> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ServerError::InvalidParams(
                "Invalid params: name must not be empty".to_string(),
            ));
        }
        let config = self.config.current();
        let target: Option<&ServiceTarget> = config.get(name);
        let selection = match target {
            Some(t) => ServiceSelection {
                source: t.spec.clone(),
                base_url_override: t.base_url.clone(),
                alias: Some(t.alias.clone()),
            },
            None => ServiceSelection {
                source: name.to_string(),
                base_url_override: None,
                alias: None,
            },
        };

        let ticket = self.session.begin();
        let doc = self
            .store
            .fetch(&selection.source)
            .await
            .map_err(|e| ServerError::spec(CONNECT_CONTEXT, e))?;
        let summary = dialect::summarize(&doc).map_err(|e| ServerError::spec(CONNECT_CONTEXT, e))?;
        self.store.insert(doc);

        self.session
            .commit(ticket, selection.clone())
            .map_err(|Superseded| ServerError::Superseded {
                context: CONNECT_CONTEXT,
                source_name: name.to_string(),
            })?;
        info!(
            source = %selection.source,
            alias = selection.alias.as_deref().unwrap_or("-"),
            title = %summary.title,
            endpoints = summary.endpoint_count,
            "service selected"
        );
        Ok(Selected { selection, summary })
    }
}

/// Base URL for a test request: explicit argument, then the config override, then the document.
///
/// # Errors
///
/// Returns [`OpenApiToolsError::BaseUrl`] when none of the three yields one.
pub fn effective_base_url(
    explicit: Option<&str>,
    selection: &ServiceSelection,
    doc: &Document,
) -> std::result::Result<String, OpenApiToolsError> {
    if let Some(url) = explicit.map(str::trim).filter(|u| !u.is_empty()) {
        return Ok(url.to_string());
    }
    if let Some(url) = &selection.base_url_override {
        return Ok(url.clone());
    }
    dialect::extract_base_url(doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigLocator;
    use std::path::Path;

    const PETS: &str = r#"{
        "openapi": "3.0.3",
        "info": {"title": "Pets", "version": "1.0.0"},
        "servers": [{"url": "https://pets.example.com/v1"}],
        "paths": {"/pets": {"get": {"summary": "List pets"}}}
    }"#;

    fn context_with_config(config: Option<&Path>) -> ServiceContext {
        let store = ConfigStore::new(ConfigLocator::new(
            config.map(Path::to_path_buf),
            None,
            None,
            None,
        ));
        ServiceContext::new(store, ContextOptions::default()).expect("context")
    }

    #[tokio::test]
    async fn select_direct_path_and_alias() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("pets.json"), PETS).expect("write spec");
        let config = dir.path().join("swagger-targets.json");
        std::fs::write(
            &config,
            r#"{"pets": {"spec": "pets.json", "baseUrl": "http://localhost:9000"}}"#,
        )
        .expect("write config");
        let ctx = context_with_config(Some(&config));

        let selected = ctx.select("pets").await.expect("select alias");
        assert_eq!(selected.selection.alias.as_deref(), Some("pets"));
        assert_eq!(
            selected.selection.base_url_override.as_deref(),
            Some("http://localhost:9000")
        );
        assert_eq!(selected.summary.title, "Pets");
        assert_eq!(selected.summary.endpoint_count, 1);

        let direct = dir.path().join("pets.json").display().to_string();
        let selected = ctx.select(&direct).await.expect("select path");
        assert!(selected.selection.alias.is_none());
        assert_eq!(ctx.require_selection().expect("selected").source, direct);
    }

    #[tokio::test]
    async fn failed_selection_keeps_previous() {
        let dir = tempfile::tempdir().expect("tempdir");
        let good = dir.path().join("pets.json");
        std::fs::write(&good, PETS).expect("write spec");
        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, r#"{"info": {"title": "x"}}"#).expect("write spec");
        let ctx = context_with_config(None);

        ctx.select(&good.display().to_string()).await.expect("select");
        let err = ctx
            .select(&bad.display().to_string())
            .await
            .expect_err("unknown dialect");
        assert!(err.to_string().starts_with("Failed to connect: "), "{err}");
        assert_eq!(
            ctx.require_selection().expect("still selected").source,
            good.display().to_string()
        );

        let err = ctx
            .select(&dir.path().join("missing.json").display().to_string())
            .await
            .expect_err("missing file");
        assert!(err.to_string().starts_with("Failed to connect: "), "{err}");
    }

    #[tokio::test]
    async fn failed_reselection_keeps_cached_document() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("pets.json");
        std::fs::write(&path, PETS).expect("write spec");
        let source = path.display().to_string();
        let ctx = context_with_config(None);

        ctx.select(&source).await.expect("select");
        let before = ctx.store().cached(&source).expect("cached after select");

        std::fs::write(&path, r#"{"info": {"title": "x"}}"#).expect("rewrite spec");
        ctx.select(&source).await.expect_err("unknown dialect");

        let after = ctx.store().cached(&source).expect("still cached");
        assert!(Arc::ptr_eq(&before, &after));
        let (_, doc) = ctx.current_document("Failed to list endpoints").await.expect("doc");
        assert_eq!(doc.fingerprint, before.fingerprint);
    }

    #[tokio::test]
    async fn nothing_selected_is_reported() {
        let ctx = context_with_config(None);
        assert!(matches!(
            ctx.current_document("Failed to list endpoints").await,
            Err(ServerError::NoSelection)
        ));
        assert!(matches!(
            ctx.select("   ").await,
            Err(ServerError::InvalidParams(_))
        ));
    }

    #[tokio::test]
    async fn base_url_priority() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("pets.json");
        std::fs::write(&path, PETS).expect("write spec");
        let ctx = context_with_config(None);
        let doc = ctx
            .store()
            .resolve(&path.display().to_string(), true)
            .await
            .expect("resolve");

        let mut selection = ServiceSelection {
            source: path.display().to_string(),
            base_url_override: None,
            alias: None,
        };
        assert_eq!(
            effective_base_url(None, &selection, &doc).expect("doc"),
            "https://pets.example.com/v1"
        );
        selection.base_url_override = Some("http://override".to_string());
        assert_eq!(
            effective_base_url(Some(""), &selection, &doc).expect("override"),
            "http://override"
        );
        assert_eq!(
            effective_base_url(Some("http://explicit"), &selection, &doc).expect("explicit"),
            "http://explicit"
        );
    }
}
