//! HTTP method semantics.
//!
//! Both spec dialects recognize the same seven operation verbs. They are enumerated here once, in
//! the canonical iteration order used when walking a path item.

use reqwest::Method;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Options,
    Head,
}

impl HttpMethod {
    /// All recognized verbs, in path-item iteration order.
    pub const ALL: [HttpMethod; 7] = [
        HttpMethod::Get,
        HttpMethod::Post,
        HttpMethod::Put,
        HttpMethod::Delete,
        HttpMethod::Patch,
        HttpMethod::Options,
        HttpMethod::Head,
    ];

    /// Lower-case form, as used for path-item keys.
    #[must_use]
    pub fn as_lower(self) -> &'static str {
        match self {
            HttpMethod::Get => "get",
            HttpMethod::Post => "post",
            HttpMethod::Put => "put",
            HttpMethod::Delete => "delete",
            HttpMethod::Patch => "patch",
            HttpMethod::Options => "options",
            HttpMethod::Head => "head",
        }
    }

    /// Upper-case form, as sent on the wire.
    #[must_use]
    pub fn as_upper(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Head => "HEAD",
        }
    }

    /// Whether a request body may be transmitted with this method.
    #[must_use]
    pub fn sends_body(self) -> bool {
        !matches!(self, HttpMethod::Get | HttpMethod::Head)
    }

    /// Whether generated client code should accept a request payload.
    #[must_use]
    pub fn takes_payload(self) -> bool {
        matches!(self, HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_upper())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownMethod(pub String);

impl fmt::Display for UnknownMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unsupported HTTP method '{}'", self.0)
    }
}

impl std::error::Error for UnknownMethod {}

impl FromStr for HttpMethod {
    type Err = UnknownMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HttpMethod::ALL
            .into_iter()
            .find(|m| m.as_lower().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownMethod(s.to_string()))
    }
}

impl From<HttpMethod> for Method {
    fn from(value: HttpMethod) -> Self {
        match value {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Delete => Method::DELETE,
            HttpMethod::Patch => Method::PATCH,
            HttpMethod::Options => Method::OPTIONS,
            HttpMethod::Head => Method::HEAD,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::HttpMethod;
    use reqwest::Method;

    #[test]
    fn parse_is_case_insensitive() {
        for m in HttpMethod::ALL {
            assert_eq!(m.as_lower().parse::<HttpMethod>().expect("lower"), m);
            assert_eq!(m.as_upper().parse::<HttpMethod>().expect("upper"), m);
        }
        assert!("PROPFIND".parse::<HttpMethod>().is_err());
    }

    #[test]
    fn iteration_order_is_fixed() {
        let order: Vec<&str> = HttpMethod::ALL.iter().map(|m| m.as_lower()).collect();
        assert_eq!(
            order,
            ["get", "post", "put", "delete", "patch", "options", "head"]
        );
    }

    #[test]
    fn body_rules() {
        assert!(!HttpMethod::Get.sends_body());
        assert!(!HttpMethod::Head.sends_body());
        assert!(HttpMethod::Delete.sends_body());
        assert!(HttpMethod::Patch.takes_payload());
        assert!(!HttpMethod::Delete.takes_payload());
    }

    #[test]
    fn converts_to_reqwest_method() {
        assert_eq!(Method::from(HttpMethod::Options), Method::OPTIONS);
        assert_eq!(Method::from(HttpMethod::Patch), Method::PATCH);
    }
}
