//! Request construction shared by execution and cURL rendering.
//!
//! [`RequestSpec::raw_url`] is the single place a request URL is assembled. [`generate_curl`]
//! prints it verbatim and the executor sends its parsed form.

use crate::runtime::{HttpToolsError, Result};
use crate::semantics::HttpMethod;
use indexmap::IndexMap;
use serde_json::Value;
use url::Url;

pub const CONTENT_TYPE_JSON: &str = "application/json";

/// A fully specified test request, before URL assembly.
#[derive(Debug, Clone)]
pub struct RequestSpec {
    pub base_url: String,
    pub method: HttpMethod,
    /// Path template, e.g. `/users/{id}`.
    pub path: String,
    pub path_params: IndexMap<String, String>,
    pub query_params: IndexMap<String, String>,
    pub headers: IndexMap<String, String>,
    /// `None` and `Some(Value::Null)` both mean "no body".
    pub body: Option<Value>,
}

impl RequestSpec {
    #[must_use]
    pub fn new(base_url: impl Into<String>, method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            method,
            path: path.into(),
            path_params: IndexMap::new(),
            query_params: IndexMap::new(),
            headers: IndexMap::new(),
            body: None,
        }
    }

    /// The body, unless absent, `null`, or the method never carries one (GET, HEAD).
    #[must_use]
    pub fn payload(&self) -> Option<&Value> {
        if !self.method.sends_body() {
            return None;
        }
        self.body.as_ref().filter(|b| !b.is_null())
    }

    /// True when a body is present and no content-type header was supplied.
    #[must_use]
    pub fn needs_json_content_type(&self) -> bool {
        self.payload().is_some()
            && !self
                .headers
                .keys()
                .any(|k| k.eq_ignore_ascii_case("content-type"))
    }

    /// Raw URL text: base (trailing `/` trimmed) + substituted path + `?query` when non-empty.
    #[must_use]
    pub fn raw_url(&self) -> String {
        let mut url = format!(
            "{}{}",
            self.base_url.trim_end_matches('/'),
            substitute_path(&self.path, &self.path_params)
        );
        let query = build_query_string(&self.query_params);
        if !query.is_empty() {
            url.push('?');
            url.push_str(&query);
        }
        url
    }

    /// Parsed request URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the assembled URL is not a valid absolute URL.
    pub fn build_url(&self) -> Result<Url> {
        let raw = self.raw_url();
        Url::parse(&raw).map_err(|e| HttpToolsError::Runtime(format!("Invalid URL '{raw}': {e}")))
    }


    /// Body bytes as transmitted: strings verbatim, everything else as compact JSON.
    #[must_use]
    pub fn wire_body(&self) -> Option<String> {
        self.payload().map(|b| match b {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }
}

/// Replace `{name}` and `:name` placeholders with percent-encoded values.
///
/// Placeholders with no matching entry are left untouched.
#[must_use]
pub fn substitute_path(path: &str, params: &IndexMap<String, String>) -> String {
    let mut result = path.to_string();
    for (key, value) in params {
        let encoded = encode_component(value);
        result = result.replace(&format!("{{{key}}}"), &encoded);
        result = replace_colon_placeholder(&result, key, &encoded);
    }
    result
}

/// `:name` only matches when not followed by another identifier character, so `:id` does not eat
/// the prefix of `:idx`.
fn replace_colon_placeholder(path: &str, key: &str, encoded: &str) -> String {
    let needle = format!(":{key}");
    let mut out = String::with_capacity(path.len());
    let mut rest = path;
    while let Some(pos) = rest.find(&needle) {
        let after = &rest[pos + needle.len()..];
        let boundary = after
            .chars()
            .next()
            .is_none_or(|c| !(c.is_ascii_alphanumeric() || c == '_'));
        out.push_str(&rest[..pos]);
        if boundary {
            out.push_str(encoded);
        } else {
            out.push_str(&needle);
        }
        rest = after;
    }
    out.push_str(rest);
    out
}

/// `k=v` pairs, each side percent-encoded, joined with `&`. Empty input yields an empty string.
#[must_use]
pub fn build_query_string(params: &IndexMap<String, String>) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", encode_component(k), encode_component(v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Percent-encode everything outside the RFC 3986 unreserved set.
#[must_use]
pub fn encode_component(s: &str) -> String {
    urlencoding::encode(s).into_owned()
}

/// Render the request as a multi-line shell command.
#[must_use]
pub fn generate_curl(spec: &RequestSpec) -> String {
    let mut parts: Vec<String> = vec!["curl".to_string()];

    if spec.method != HttpMethod::Get {
        parts.push(format!("-X {}", spec.method.as_upper()));
    }

    for (key, value) in &spec.headers {
        parts.push(format!("-H {}", shell_quote(&format!("{key}: {value}"))));
    }

    if spec.needs_json_content_type() {
        parts.push(format!("-H 'Content-Type: {CONTENT_TYPE_JSON}'"));
    }

    if let Some(body) = spec.payload() {
        let text = match body {
            Value::String(s) => s.clone(),
            other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
        };
        parts.push(format!("-d {}", shell_quote(&text)));
    }

    parts.push(shell_quote(&spec.raw_url()));
    parts.join(" \\\n  ")
}

fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "'\\''"))
}
