//! Header translation between the edge wire format and `http::HeaderMap`.

use http::header::{HeaderMap, HeaderName, HeaderValue};

use crate::error::AdapterError;
use crate::event::{EdgeHeader, EventHeaders, ResponseHeaders};

/// Headers the platform manages itself and that must never be echoed back.
pub mod excluded {
    /// Hop-by-hop, cache-control and proxy headers, matched exactly.
    pub const NAMES: &[&str] = &[
        "cache-control",
        "connection",
        "expect",
        "keep-alive",
        "proxy-authenticate",
        "proxy-authorization",
        "proxy-connection",
        "trailer",
        "transfer-encoding",
        "upgrade",
        "via",
        "x-accel-buffering",
        "x-accel-charset",
        "x-accel-limit-rate",
        "x-accel-redirect",
        "x-cache",
        "x-forwarded-proto",
        "x-real-ip",
    ];

    /// Platform-internal header families, matched as case-insensitive prefixes.
    pub const PREFIXES: &[&str] = &["x-amz-", "x-amzn-", "x-edge-"];
}

/// Decides which response headers are dropped on egress.
#[derive(Debug, Clone)]
pub struct ExclusionPolicy {
    names: Vec<String>,
    prefixes: Vec<String>,
}

impl Default for ExclusionPolicy {
    fn default() -> Self {
        Self {
            names: excluded::NAMES.iter().map(|s| s.to_string()).collect(),
            prefixes: excluded::PREFIXES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl ExclusionPolicy {
    /// The fixed platform policy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `name` must be dropped. Comparison is case-insensitive.
    pub fn excludes(&self, name: &str) -> bool {
        let name = name.to_ascii_lowercase();
        self.names.iter().any(|n| *n == name)
            || self.prefixes.iter().any(|p| name.starts_with(p.as_str()))
    }
}

/// Build the application-facing header collection from wire headers.
///
/// Every value is appended in order, so multi-valued headers survive intact.
pub fn to_header_map(headers: &EventHeaders) -> Result<HeaderMap, AdapterError> {
    let mut map = HeaderMap::new();
    for (name, values) in headers {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| AdapterError::InvalidRequest(format!("header name '{}': {}", name, e)))?;
        for record in values {
            let value = HeaderValue::from_str(&record.value).map_err(|e| {
                AdapterError::InvalidRequest(format!("header '{}' value: {}", name, e))
            })?;
            map.append(header_name.clone(), value);
        }
    }
    Ok(map)
}

/// Convert response headers back to the wire map, dropping excluded names.
pub fn to_edge_headers(headers: &HeaderMap, policy: &ExclusionPolicy) -> ResponseHeaders {
    let mut out = ResponseHeaders::new();
    for name in headers.keys() {
        let lower = name.as_str().to_ascii_lowercase();
        if policy.excludes(&lower) {
            continue;
        }
        let records: Vec<EdgeHeader> = headers
            .get_all(name)
            .iter()
            .map(|value| EdgeHeader {
                header: lower.clone(),
                value: String::from_utf8_lossy(value.as_bytes()).into_owned(),
            })
            .collect();
        out.insert(lower, records);
    }
    out
}
