//! Client stub generation (TypeScript / JavaScript, axios / fetch).
//!
//! [`schema_to_type`] is total: any schema shape it does not recognize becomes `unknown`
//! (TypeScript) or `any` (JavaScript). Generated code is plain text; nothing here can fail once an
//! [`EndpointDetail`] exists.

use crate::extract::{EndpointDetail, Parameter};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([^}]+)\}").expect("placeholder regex is valid"));
static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*$").expect("identifier regex is valid"));

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    TypeScript,
    JavaScript,
}

impl Language {
    fn fallback(self) -> &'static str {
        match self {
            Language::TypeScript => "unknown",
            Language::JavaScript => "any",
        }
    }

    fn is_typescript(self) -> bool {
        self == Language::TypeScript
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Language::TypeScript => "typescript",
            Language::JavaScript => "javascript",
        })
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "typescript" => Ok(Language::TypeScript),
            "javascript" => Ok(Language::JavaScript),
            other => Err(format!("unsupported language '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpClientStyle {
    #[default]
    Axios,
    Fetch,
}

impl fmt::Display for HttpClientStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HttpClientStyle::Axios => "axios",
            HttpClientStyle::Fetch => "fetch",
        })
    }
}

impl FromStr for HttpClientStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "axios" => Ok(HttpClientStyle::Axios),
            "fetch" => Ok(HttpClientStyle::Fetch),
            other => Err(format!("unsupported http client '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedCode {
    pub code: String,
    /// `"GET /users/{id}"`.
    pub endpoint: String,
    pub language: Language,
    pub http_client: HttpClientStyle,
}

/// Translate a JSON-Schema fragment into a type expression.
#[must_use]
pub fn schema_to_type(schema: &Value, lang: Language) -> String {
    type_at_depth(schema, lang, 0)
}

fn type_at_depth(schema: &Value, lang: Language, depth: usize) -> String {
    let Some(s) = schema.as_object() else {
        return lang.fallback().to_string();
    };

    if let Some(reference) = s.get("$ref").and_then(Value::as_str) {
        return reference
            .rsplit('/')
            .next()
            .filter(|name| !name.is_empty())
            .map_or_else(|| lang.fallback().to_string(), str::to_string);
    }

    if let Some(literals) = s.get("enum").and_then(Value::as_array).and_then(|v| enum_union(v)) {
        return literals;
    }

    for (key, sep) in [("oneOf", " | "), ("anyOf", " | "), ("allOf", " & ")] {
        if let Some(members) = s.get(key).and_then(Value::as_array)
            && !members.is_empty()
        {
            let parts: Vec<String> = members
                .iter()
                .map(|m| wrap_compound(type_at_depth(m, lang, depth)))
                .collect();
            return parts.join(sep);
        }
    }

    let ty = match s.get("type") {
        Some(Value::String(t)) => Some(t.as_str()),
        Some(Value::Array(types)) => types
            .iter()
            .filter_map(Value::as_str)
            .find(|t| *t != "null"),
        _ => None,
    };

    match ty {
        Some("string") => "string".to_string(),
        Some("integer" | "number") => "number".to_string(),
        Some("boolean") => "boolean".to_string(),
        Some("array") => {
            let item = s
                .get("items")
                .map_or_else(|| lang.fallback().to_string(), |i| type_at_depth(i, lang, depth));
            format!("{}[]", wrap_compound(item))
        }
        _ if ty == Some("object") || s.contains_key("properties") => {
            object_type(s, lang, depth)
        }
        _ => lang.fallback().to_string(),
    }
}

fn object_type(s: &serde_json::Map<String, Value>, lang: Language, depth: usize) -> String {
    let props = s
        .get("properties")
        .and_then(Value::as_object)
        .filter(|p| !p.is_empty());

    let Some(props) = props else {
        return match s.get("additionalProperties") {
            Some(ap @ Value::Object(_)) => {
                format!("Record<string, {}>", type_at_depth(ap, lang, depth))
            }
            _ if lang.is_typescript() => format!("Record<string, {}>", lang.fallback()),
            _ => "object".to_string(),
        };
    };

    let required: Vec<&str> = s
        .get("required")
        .and_then(Value::as_array)
        .map(|r| r.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    let indent = "  ".repeat(depth + 1);
    let mut out = String::from("{\n");
    for (name, prop) in props {
        let optional = if required.contains(&name.as_str()) { "" } else { "?" };
        out.push_str(&format!(
            "{indent}{}{optional}: {};\n",
            property_key(name),
            type_at_depth(prop, lang, depth + 1)
        ));
    }
    out.push_str(&"  ".repeat(depth));
    out.push('}');
    out
}

/// String enums become literal unions; numeric enums become numeric literal unions.
fn enum_union(values: &[Value]) -> Option<String> {
    if values.is_empty() {
        return None;
    }
    if values.iter().all(Value::is_string) {
        return Some(
            values
                .iter()
                .filter_map(Value::as_str)
                .map(|v| format!("'{}'", v.replace('\\', "\\\\").replace('\'', "\\'")))
                .collect::<Vec<_>>()
                .join(" | "),
        );
    }
    if values.iter().all(Value::is_number) {
        return Some(
            values
                .iter()
                .map(Value::to_string)
                .collect::<Vec<_>>()
                .join(" | "),
        );
    }
    None
}

fn wrap_compound(ty: String) -> String {
    if !ty.starts_with('{') && (ty.contains(" | ") || ty.contains(" & ")) {
        format!("({ty})")
    } else {
        ty
    }
}

fn property_key(name: &str) -> String {
    if IDENTIFIER.is_match(name) {
        name.to_string()
    } else {
        format!("'{}'", name.replace('\'', "\\'"))
    }
}

/// `get` + `/users/{userId}/orders` -> `getUsersByUserIdOrders`.
#[must_use]
pub fn function_name(method: &str, path: &str) -> String {
    let spaced = PLACEHOLDER.replace_all(path, " By $1 ");
    let words: String = spaced
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(capitalize)
        .collect();
    let words = if words.is_empty() { "Root".to_string() } else { words };
    format!("{}{words}", method.to_lowercase())
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

fn param_type(p: &Parameter) -> &'static str {
    match p.type_name.as_deref() {
        None | Some("string") => "string",
        Some("integer" | "number") => "number",
        Some("boolean") => "boolean",
        Some("array") => "unknown[]",
        Some(_) => "unknown",
    }
}

/// First occurrence per name; the extractor keeps duplicates across scopes.
fn params_in<'a>(detail: &'a EndpointDetail, location: &str) -> Vec<&'a Parameter> {
    let mut out: Vec<&Parameter> = Vec::new();
    for p in detail.parameters.iter().filter(|p| p.location == location) {
        if !out.iter().any(|seen| seen.name == p.name) {
            out.push(p);
        }
    }
    out
}

fn push_interface(lines: &mut Vec<String>, name: &str, ty: &str) {
    if ty.starts_with('{') {
        lines.push(format!("interface {name} {ty}"));
    } else {
        lines.push(format!("type {name} = {ty};"));
    }
    lines.push(String::new());
}

/// Render a client function for one endpoint.
#[must_use]
pub fn generate(detail: &EndpointDetail, lang: Language, client: HttpClientStyle) -> GeneratedCode {
    let method = detail.summary.method;
    let path = detail.summary.path.as_str();
    let ts = lang.is_typescript();

    let func_name = function_name(method.as_lower(), path);
    let type_prefix = capitalize(&func_name);
    let path_params = params_in(detail, "path");
    let query_params = params_in(detail, "query");
    let has_body = method.takes_payload();

    let mut lines: Vec<String> = Vec::new();
    if client == HttpClientStyle::Axios {
        lines.push(if ts {
            "import axios, { AxiosResponse } from 'axios';".to_string()
        } else {
            "import axios from 'axios';".to_string()
        });
        lines.push(String::new());
    }

    let mut request_type: Option<String> = None;
    let mut response_type: Option<String> = None;
    if ts {
        if !path_params.is_empty() {
            lines.push(format!("interface {type_prefix}PathParams {{"));
            for p in &path_params {
                lines.push(format!("  {}: {};", property_key(&p.name), param_type(p)));
            }
            lines.push("}".to_string());
            lines.push(String::new());
        }

        if !query_params.is_empty() {
            lines.push(format!("interface {type_prefix}QueryParams {{"));
            for p in &query_params {
                let optional = if p.required == Some(true) { "" } else { "?" };
                lines.push(format!(
                    "  {}{optional}: {};",
                    property_key(&p.name),
                    param_type(p)
                ));
            }
            lines.push("}".to_string());
            lines.push(String::new());
        }

        if let Some(schema) = detail.request_body.as_ref().and_then(|rb| rb.json_schema()) {
            let name = format!("{type_prefix}Request");
            push_interface(&mut lines, &name, &schema_to_type(schema, lang));
            request_type = Some(name);
        }

        let success = ["200", "201", "default"]
            .iter()
            .find_map(|code| detail.responses.get(*code));
        if let Some(schema) = success.and_then(|r| r.json_schema()) {
            let name = format!("{type_prefix}Response");
            push_interface(&mut lines, &name, &schema_to_type(schema, lang));
            response_type = Some(name);
        }
    }

    let annotate = |ty: String| if ts { format!(": {ty}") } else { String::new() };
    let mut params: Vec<String> = Vec::new();
    if !path_params.is_empty() {
        params.push(format!("pathParams{}", annotate(format!("{type_prefix}PathParams"))));
    }
    if !query_params.is_empty() {
        params.push(format!("queryParams{}", annotate(format!("{type_prefix}QueryParams"))));
    }
    if has_body {
        let ty = request_type.clone().unwrap_or_else(|| lang.fallback().to_string());
        params.push(format!("data{}", annotate(ty)));
    }

    let return_type = match (ts, client) {
        (false, _) => String::new(),
        (true, HttpClientStyle::Axios) => match &response_type {
            Some(r) => format!(": Promise<AxiosResponse<{r}>>"),
            None => ": Promise<AxiosResponse>".to_string(),
        },
        (true, HttpClientStyle::Fetch) => ": Promise<Response>".to_string(),
    };

    lines.push("/**".to_string());
    let headline = detail
        .summary
        .summary
        .clone()
        .unwrap_or_else(|| format!("{} {path}", method.as_upper()));
    for text in std::iter::once(headline.as_str()).chain(detail.summary.description.as_deref()) {
        for line in text.lines() {
            lines.push(format!(" * {line}").trim_end().to_string());
        }
    }
    lines.push(" */".to_string());
    lines.push(format!(
        "export async function {func_name}({}){return_type} {{",
        params.join(", ")
    ));

    let url_path = if path_params.is_empty() {
        path.to_string()
    } else {
        PLACEHOLDER
            .replace_all(path, |caps: &regex::Captures<'_>| {
                let name = &caps[1];
                if IDENTIFIER.is_match(name) {
                    format!("${{pathParams.{name}}}")
                } else {
                    format!("${{pathParams['{name}']}}")
                }
            })
            .into_owned()
    };
    lines.push(format!("  const url = `${{BASE_URL}}{url_path}`;"));

    match client {
        HttpClientStyle::Axios => {
            let verb = method.as_lower();
            let config = if query_params.is_empty() {
                String::new()
            } else {
                ", { params: queryParams }".to_string()
            };
            if has_body {
                lines.push(format!("  return axios.{verb}(url, data{config});"));
            } else {
                lines.push(format!("  return axios.{verb}(url{config});"));
            }
        }
        HttpClientStyle::Fetch => {
            let mut options = vec![format!("method: '{}'", method.as_upper())];
            if has_body {
                options.push("headers: { 'Content-Type': 'application/json' }".to_string());
                options.push("body: JSON.stringify(data)".to_string());
            }
            if query_params.is_empty() {
                lines.push("  return fetch(url, {".to_string());
            } else {
                let cast = if ts { " as Record<string, string>" } else { "" };
                lines.push(format!("  const params = new URLSearchParams(queryParams{cast});"));
                lines.push("  return fetch(`${url}?${params}`, {".to_string());
            }
            lines.push(format!("    {}", options.join(",\n    ")));
            lines.push("  });".to_string());
        }
    }
    lines.push("}".to_string());

    lines.push(String::new());
    lines.push("// Note: Define BASE_URL constant or import from config".to_string());
    lines.push("// const BASE_URL = 'http://localhost:8080';".to_string());

    GeneratedCode {
        code: lines.join("\n"),
        endpoint: format!("{} {path}", method.as_upper()),
        language: lang,
        http_client: client,
    }
}
