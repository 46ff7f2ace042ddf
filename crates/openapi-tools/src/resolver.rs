//! Spec loading, `$ref` dereferencing and the resolved-document cache.
//!
//! A source (URL or file path) is loaded into a single, fully dereferenced tree:
//! - Local refs (`#/...`)
//! - File refs (`./common.yaml#/...`, `/abs/path/spec.yaml#/...`, `file:///...#/...`)
//! - URL refs (`https://example.com/common.yaml#/...`)
//!
//! Key detail: `$ref` resolution is **relative to the document that contains the `$ref`**.
//! External documents are fetched up front (once each), then the tree is rewritten synchronously
//! while tracking which document each node came from.
//!
//! Resolved documents are cached by their exact source string. Entries are immutable `Arc`s; a
//! re-fetch replaces the entry instead of mutating it.

use crate::error::{OpenApiToolsError, Result};
use crate::model::{ApiSpec, Dialect};
use parking_lot::RwLock;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Map, Value};
use sha2::Digest as _;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use swagger_mcp_http_tools::safety::sanitize_reqwest_error;
use tracing::{debug, info};
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DocId {
    Url(Url),
    File(PathBuf),
}

impl DocId {
    /// Parse a root spec location into a document identifier (URL or file path).
    ///
    /// # Errors
    ///
    /// Returns an error if the location is an invalid URL or invalid file URL.
    pub fn parse(spec_location: &str) -> Result<Self> {
        let invalid = |message: String| OpenApiToolsError::SpecFetch {
            url: spec_location.to_string(),
            message,
        };
        if spec_location.starts_with("http://") || spec_location.starts_with("https://") {
            let url = Url::parse(spec_location).map_err(|e| invalid(format!("invalid URL: {e}")))?;
            Ok(DocId::Url(strip_fragment(url)))
        } else if spec_location.starts_with("file://") {
            let url =
                Url::parse(spec_location).map_err(|e| invalid(format!("invalid file URL: {e}")))?;
            let path = url
                .to_file_path()
                .map_err(|()| invalid("file URL cannot be converted to a path".to_string()))?;
            Ok(DocId::File(canonicalize_best_effort(path)))
        } else {
            Ok(DocId::File(canonicalize_best_effort(PathBuf::from(
                spec_location,
            ))))
        }
    }
}

impl fmt::Display for DocId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocId::Url(u) => write!(f, "{u}"),
            DocId::File(p) => write!(f, "{}", p.display()),
        }
    }
}

fn strip_fragment(mut url: Url) -> Url {
    url.set_fragment(None);
    url
}

fn canonicalize_best_effort(path: PathBuf) -> PathBuf {
    std::fs::canonicalize(&path).unwrap_or(path)
}

/// What to do when a `$ref` chain leads back to a node that is still being expanded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CircularRefs {
    /// Keep the `$ref` node at the back-edge; everything else is expanded.
    #[default]
    Preserve,
    /// Fail the resolution.
    Reject,
}

impl FromStr for CircularRefs {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "preserve" => Ok(CircularRefs::Preserve),
            "reject" => Ok(CircularRefs::Reject),
            other => Err(format!(
                "invalid circular-ref policy '{other}' (expected 'preserve' or 'reject')"
            )),
        }
    }
}

/// A loaded, dereferenced and classified spec.
#[derive(Debug)]
pub struct Document {
    /// The exact source string this document was resolved from.
    pub source: String,
    /// SHA-256 (hex) of the root document text as fetched.
    pub fingerprint: String,
    pub spec: ApiSpec,
}

impl Document {
    #[must_use]
    pub fn dialect(&self) -> Dialect {
        self.spec.dialect()
    }
}

/// Cache of resolved documents keyed by source string.
#[derive(Clone)]
pub struct DocumentStore {
    client: Client,
    circular: CircularRefs,
    cache: Arc<RwLock<HashMap<String, Arc<Document>>>>,
}

impl DocumentStore {
    #[must_use]
    pub fn new(client: Client, circular: CircularRefs) -> Self {
        Self {
            client,
            circular,
            cache: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Resolve `source` into a dereferenced document.
    ///
    /// With `use_cache`, a cached entry is returned as-is (same `Arc`) and nothing is fetched.
    /// Without it, the source is always re-fetched and the new value replaces the cache entry.
    ///
    /// # Errors
    ///
    /// Returns a fetch/parse error if the source (or a referenced document) cannot be loaded, or
    /// [`OpenApiToolsError::SpecRef`] if a `$ref` cannot be resolved.
    pub async fn resolve(&self, source: &str, use_cache: bool) -> Result<Arc<Document>> {
        if use_cache && let Some(doc) = self.cached(source) {
            debug!(source, "spec cache hit");
            return Ok(doc);
        }

        let doc = self.fetch(source).await?;
        if use_cache {
            // Concurrent misses: first insert wins, every caller sees the stored value.
            let mut cache = self.cache.write();
            let stored = cache
                .entry(source.to_string())
                .or_insert_with(|| Arc::clone(&doc));
            Ok(Arc::clone(stored))
        } else {
            self.insert(Arc::clone(&doc));
            Ok(doc)
        }
    }

    /// Load `source` fresh without touching the cache. Pair with [`DocumentStore::insert`] once
    /// the caller has accepted the document.
    ///
    /// # Errors
    ///
    /// Same as [`DocumentStore::resolve`].
    pub async fn fetch(&self, source: &str) -> Result<Arc<Document>> {
        debug!(source, "loading spec");
        let doc = Arc::new(self.load(source).await?);
        info!(
            source,
            fingerprint = %doc.fingerprint,
            dialect = ?doc.dialect(),
            "spec resolved"
        );
        Ok(doc)
    }

    /// Store `doc` under its source, replacing any previous entry.
    pub fn insert(&self, doc: Arc<Document>) {
        self.cache.write().insert(doc.source.clone(), doc);
    }

    #[must_use]
    pub fn cached(&self, source: &str) -> Option<Arc<Document>> {
        self.cache.read().get(source).cloned()
    }

    /// Drop one entry, or every entry when `source` is `None`.
    pub fn invalidate(&self, source: Option<&str>) {
        let mut cache = self.cache.write();
        match source {
            Some(s) => {
                cache.remove(s);
            }
            None => cache.clear(),
        }
    }

    async fn load(&self, source: &str) -> Result<Document> {
        let root = DocId::parse(source)?;
        let text = fetch_text(&self.client, &root).await?;
        let fingerprint = hex::encode(sha2::Sha256::digest(text.as_bytes()));
        let root_value = parse_text(&root, &text)?;
        if !root_value.is_object() {
            return Err(OpenApiToolsError::SpecShape {
                location: source.to_string(),
                dialect: "OpenAPI/Swagger",
                message: "document root is not an object".to_string(),
            });
        }

        let docs = self.load_referenced_docs(root.clone(), root_value).await?;
        let Some(root_value) = docs.get(&root) else {
            return Err(OpenApiToolsError::SpecFetch {
                url: source.to_string(),
                message: "root document missing after load".to_string(),
            });
        };

        let deref = Dereferencer {
            docs: &docs,
            circular: self.circular,
        };
        let value = deref.resolve_value(root_value, &root, &mut Vec::new())?;
        let spec = ApiSpec::from_value(source, value)?;

        Ok(Document {
            source: source.to_string(),
            fingerprint,
            spec,
        })
    }

    /// Load every document reachable through external `$ref`s.
    async fn load_referenced_docs(
        &self,
        root: DocId,
        root_value: Value,
    ) -> Result<HashMap<DocId, Value>> {
        let mut docs: HashMap<DocId, Value> = HashMap::new();
        docs.insert(root.clone(), root_value);
        let mut pending = vec![root];

        while let Some(current) = pending.pop() {
            let mut refs: Vec<String> = Vec::new();
            if let Some(v) = docs.get(&current) {
                collect_refs(v, &mut refs);
            }

            for reference in refs {
                let (target, _) = parse_ref(&current, &reference)?;
                if docs.contains_key(&target) {
                    continue;
                }
                let ref_error = |message: String| OpenApiToolsError::SpecRef {
                    reference: reference.clone(),
                    location: current.to_string(),
                    message,
                };
                debug!(document = %target, "loading referenced document");
                let text = fetch_text(&self.client, &target)
                    .await
                    .map_err(|e| ref_error(e.to_string()))?;
                let value = parse_text(&target, &text).map_err(|e| ref_error(e.to_string()))?;
                docs.insert(target.clone(), value);
                pending.push(target);
            }
        }

        Ok(docs)
    }
}

async fn fetch_text(client: &Client, doc: &DocId) -> Result<String> {
    match doc {
        DocId::File(path) => tokio::fs::read_to_string(path).await.map_err(|source| {
            OpenApiToolsError::SpecReadFile {
                path: path.display().to_string(),
                source,
            }
        }),
        DocId::Url(url) => {
            let fetch_error = |message: String| OpenApiToolsError::SpecFetch {
                url: url.to_string(),
                message,
            };
            let response = client
                .get(url.clone())
                .send()
                .await
                .map_err(|e| fetch_error(sanitize_reqwest_error(&e)))?;
            let status = response.status();
            if !status.is_success() {
                return Err(fetch_error(format!("HTTP {status}")));
            }
            response
                .text()
                .await
                .map_err(|e| fetch_error(sanitize_reqwest_error(&e)))
        }
    }
}

fn parse_text(doc: &DocId, text: &str) -> Result<Value> {
    serde_json::from_str(text)
        .or_else(|_| serde_yaml::from_str(text))
        .map_err(|source| OpenApiToolsError::SpecParse {
            location: doc.to_string(),
            source,
        })
}

fn collect_refs(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            for (k, v) in map {
                match v {
                    Value::String(s) if k == "$ref" => out.push(s.clone()),
                    _ => collect_refs(v, out),
                }
            }
        }
        Value::Array(items) => items.iter().for_each(|v| collect_refs(v, out)),
        _ => {}
    }
}

fn ref_err(reference: &str, current_doc: &DocId, message: impl Into<String>) -> OpenApiToolsError {
    OpenApiToolsError::SpecRef {
        reference: reference.to_string(),
        location: current_doc.to_string(),
        message: message.into(),
    }
}

fn parse_ref(current_doc: &DocId, reference: &str) -> Result<(DocId, Option<String>)> {
    let (doc_part, frag_part) = match reference.split_once('#') {
        Some((d, f)) => (d, Some(f)),
        None => (reference, None),
    };

    let target_doc = resolve_doc(current_doc, doc_part, reference)?;

    let ptr = match frag_part {
        Some("") | None => None,
        Some(frag) if frag.starts_with('/') => Some(frag.to_string()),
        Some(_) => {
            return Err(ref_err(
                reference,
                current_doc,
                "unsupported fragment (expected JSON pointer starting with '/')",
            ));
        }
    };

    Ok((target_doc, ptr))
}

fn resolve_doc(current_doc: &DocId, doc_part: &str, reference: &str) -> Result<DocId> {
    if doc_part.is_empty() {
        return Ok(current_doc.clone());
    }

    // Absolute URL refs.
    if doc_part.starts_with("http://") || doc_part.starts_with("https://") {
        let url = Url::parse(doc_part)
            .map_err(|e| ref_err(reference, current_doc, format!("bad URL: {e}")))?;
        return Ok(DocId::Url(strip_fragment(url)));
    }

    // file:// URL refs.
    if doc_part.starts_with("file://") {
        let url = Url::parse(doc_part)
            .map_err(|e| ref_err(reference, current_doc, format!("bad file URL: {e}")))?;
        let path = url
            .to_file_path()
            .map_err(|()| ref_err(reference, current_doc, "file URL is not a path"))?;
        return Ok(DocId::File(canonicalize_best_effort(path)));
    }

    match current_doc {
        DocId::Url(base) => {
            let joined = base.join(doc_part).map_err(|e| {
                ref_err(
                    reference,
                    current_doc,
                    format!("cannot resolve against base {base}: {e}"),
                )
            })?;
            Ok(DocId::Url(strip_fragment(joined)))
        }
        DocId::File(base) => {
            // Absolute paths should remain absolute.
            let resolved = if Path::new(doc_part).is_absolute() {
                PathBuf::from(doc_part)
            } else {
                base.parent()
                    .unwrap_or_else(|| Path::new("."))
                    .join(doc_part)
            };
            Ok(DocId::File(canonicalize_best_effort(resolved)))
        }
    }
}

fn canonical_ref_key(target_doc: &DocId, pointer: Option<&str>) -> String {
    let mut key = match target_doc {
        DocId::Url(u) => format!("url:{u}"),
        DocId::File(p) => format!("file:{}", p.display()),
    };
    if let Some(ptr) = pointer {
        key.push('#');
        key.push_str(ptr);
    }
    key
}

/// JSON pointer lookup with `%XX` decoding applied before `~1`/`~0` unescaping.
fn lookup_pointer<'v>(root: &'v Value, pointer: &str) -> Option<&'v Value> {
    match urlencoding::decode(pointer) {
        Ok(decoded) => root.pointer(&decoded),
        Err(_) => root.pointer(pointer),
    }
}

struct Dereferencer<'a> {
    docs: &'a HashMap<DocId, Value>,
    circular: CircularRefs,
}

impl Dereferencer<'_> {
    fn resolve_value(&self, value: &Value, doc: &DocId, stack: &mut Vec<String>) -> Result<Value> {
        match value {
            Value::Object(map) => {
                if let Some(Value::String(reference)) = map.get("$ref") {
                    return self.resolve_ref(map, reference, doc, stack);
                }
                let mut out = Map::with_capacity(map.len());
                for (k, v) in map {
                    out.insert(k.clone(), self.resolve_value(v, doc, stack)?);
                }
                Ok(Value::Object(out))
            }
            Value::Array(items) => items
                .iter()
                .map(|v| self.resolve_value(v, doc, stack))
                .collect::<Result<Vec<_>>>()
                .map(Value::Array),
            other => Ok(other.clone()),
        }
    }

    fn resolve_ref(
        &self,
        node: &Map<String, Value>,
        reference: &str,
        doc: &DocId,
        stack: &mut Vec<String>,
    ) -> Result<Value> {
        let (target_doc, pointer) = parse_ref(doc, reference)?;
        let key = canonical_ref_key(&target_doc, pointer.as_deref());

        if stack.contains(&key) {
            return match self.circular {
                CircularRefs::Preserve => Ok(Value::Object(node.clone())),
                CircularRefs::Reject => Err(ref_err(reference, doc, "circular reference")),
            };
        }

        let target_root = self
            .docs
            .get(&target_doc)
            .ok_or_else(|| ref_err(reference, doc, format!("document {target_doc} not loaded")))?;
        let target = match pointer.as_deref() {
            Some(ptr) => lookup_pointer(target_root, ptr).ok_or_else(|| {
                ref_err(
                    reference,
                    doc,
                    format!("pointer '{ptr}' not found in {target_doc}"),
                )
            })?,
            None => target_root,
        };

        stack.push(key);
        let resolved = self.resolve_value(target, &target_doc, stack);
        stack.pop();
        let mut resolved = resolved?;

        // Sibling keys next to `$ref` are layered over the referenced object.
        if let Value::Object(obj) = &mut resolved {
            for (k, v) in node {
                if k != "$ref" {
                    obj.insert(k.clone(), self.resolve_value(v, doc, stack)?);
                }
            }
        }

        Ok(resolved)
    }
}
