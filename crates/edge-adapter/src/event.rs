//! Edge invocation event and response wire types.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::AdapterError;

/// Multi-valued header map as carried on the wire.
pub type EventHeaders = BTreeMap<String, Vec<EventHeaderValue>>;

/// Response header map as returned to the platform.
pub type ResponseHeaders = BTreeMap<String, Vec<EdgeHeader>>;

/// Invocation record handed to the function by the edge platform.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EdgeEvent {
    #[serde(rename = "Records", default)]
    pub records: Vec<EdgeRecord>,
}

impl EdgeEvent {
    /// Decode an event from its JSON payload.
    pub fn from_json(payload: &str) -> Result<Self, AdapterError> {
        Ok(serde_json::from_str(payload)?)
    }

    /// Decode an event from an already-parsed JSON value.
    pub fn from_value(payload: serde_json::Value) -> Result<Self, AdapterError> {
        Ok(serde_json::from_value(payload)?)
    }

    /// Wrap a single request descriptor in an event envelope.
    pub fn from_request(request: EdgeRequest) -> Self {
        Self {
            records: vec![EdgeRecord {
                cf: EdgePayload { request },
            }],
        }
    }

    /// The sole proxy request descriptor.
    pub fn request(&self) -> Result<&EdgeRequest, AdapterError> {
        self.records
            .first()
            .map(|record| &record.cf.request)
            .ok_or(AdapterError::MissingRequest)
    }

    /// Take ownership of the sole proxy request descriptor.
    pub fn into_request(self) -> Result<EdgeRequest, AdapterError> {
        self.records
            .into_iter()
            .next()
            .map(|record| record.cf.request)
            .ok_or(AdapterError::MissingRequest)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub cf: EdgePayload,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgePayload {
    pub request: EdgeRequest,
}

/// Proxy request descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeRequest {
    /// HTTP method.
    pub method: String,
    /// Request path, without scheme or host.
    pub uri: String,
    /// Lowercase header name to ordered value records.
    #[serde(default)]
    pub headers: EventHeaders,
    /// Request body, present only when the distribution forwards it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<EdgeRequestBody>,
}

impl EdgeRequest {
    /// First value of the Host header.
    pub fn host(&self) -> Option<&str> {
        self.headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case("host"))
            .and_then(|(_, values)| values.first())
            .map(|v| v.value.as_str())
    }
}

/// One value record of a wire header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventHeaderValue {
    /// Original-case header name, if the platform supplied it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    pub value: String,
}

impl EventHeaderValue {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            key: None,
            value: value.into(),
        }
    }
}

/// Forwarded request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeRequestBody {
    #[serde(default)]
    pub data: String,
    #[serde(default = "default_request_body_encoding")]
    pub encoding: BodyEncoding,
    #[serde(default)]
    pub input_truncated: bool,
}

fn default_request_body_encoding() -> BodyEncoding {
    BodyEncoding::Base64
}

/// Encoding tag carried alongside a wire body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyEncoding {
    Text,
    Base64,
}

impl std::fmt::Display for BodyEncoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Base64 => write!(f, "base64"),
        }
    }
}

/// A single response header record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeHeader {
    pub header: String,
    pub value: String,
}

/// Invocation result returned to the edge platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeResponse {
    /// Numeric status code, stringified.
    pub status: String,
    pub status_description: String,
    pub body: String,
    pub body_encoding: BodyEncoding,
    pub headers: ResponseHeaders,
}

impl EdgeResponse {
    /// Serialize to the JSON shape the platform expects.
    pub fn to_json(&self) -> Result<String, AdapterError> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_EVENT: &str = r#"{
        "Records": [{
            "cf": {
                "config": { "distributionId": "EDFDVBD6EXAMPLE" },
                "request": {
                    "clientIp": "203.0.113.178",
                    "method": "GET",
                    "uri": "/path",
                    "querystring": "",
                    "headers": {
                        "host": [{ "key": "Host", "value": "example.com" }],
                        "accept": [
                            { "key": "Accept", "value": "text/html" },
                            { "key": "Accept", "value": "*/*" }
                        ]
                    }
                }
            }
        }]
    }"#;

    #[test]
    fn test_parse_sample_event() {
        let event = EdgeEvent::from_json(SAMPLE_EVENT).unwrap();
        let request = event.request().unwrap();
        assert_eq!(request.method, "GET");
        assert_eq!(request.uri, "/path");
        assert_eq!(request.host(), Some("example.com"));
        assert_eq!(request.headers["accept"].len(), 2);
        assert_eq!(request.headers["accept"][1].value, "*/*");
        assert!(request.body.is_none());
    }

    #[test]
    fn test_empty_records_is_missing_request() {
        let event = EdgeEvent::from_json(r#"{"Records": []}"#).unwrap();
        assert!(matches!(event.request(), Err(AdapterError::MissingRequest)));

        let event = EdgeEvent::from_json("{}").unwrap();
        assert!(matches!(event.into_request(), Err(AdapterError::MissingRequest)));
    }

    #[test]
    fn test_malformed_event() {
        let result = EdgeEvent::from_json(r#"{"Records": [{"cf": {}}]}"#);
        assert!(matches!(result, Err(AdapterError::MalformedEvent(_))));
    }

    #[test]
    fn test_host_lookup_first_value() {
        let mut headers = EventHeaders::new();
        headers.insert(
            "host".to_string(),
            vec![EventHeaderValue::new("a.example"), EventHeaderValue::new("b.example")],
        );
        let request = EdgeRequest {
            method: "GET".to_string(),
            uri: "/".to_string(),
            headers,
            body: None,
        };
        assert_eq!(request.host(), Some("a.example"));
    }

    #[test]
    fn test_host_missing() {
        let request = EdgeRequest {
            method: "GET".to_string(),
            uri: "/".to_string(),
            headers: EventHeaders::new(),
            body: None,
        };
        assert_eq!(request.host(), None);
    }

    #[test]
    fn test_response_wire_shape() {
        let mut headers = ResponseHeaders::new();
        headers.insert(
            "content-type".to_string(),
            vec![EdgeHeader {
                header: "content-type".to_string(),
                value: "text/html".to_string(),
            }],
        );
        let response = EdgeResponse {
            status: "200".to_string(),
            status_description: "OK".to_string(),
            body: "<h1>hi</h1>".to_string(),
            body_encoding: BodyEncoding::Text,
            headers,
        };

        let value: serde_json::Value = serde_json::from_str(&response.to_json().unwrap()).unwrap();
        assert_eq!(value["status"], "200");
        assert_eq!(value["statusDescription"], "OK");
        assert_eq!(value["bodyEncoding"], "text");
        assert_eq!(value["headers"]["content-type"][0]["header"], "content-type");
        assert_eq!(value["headers"]["content-type"][0]["value"], "text/html");
    }

    #[test]
    fn test_request_body_defaults_to_base64() {
        let json = r#"{"method":"POST","uri":"/","headers":{},"body":{"data":"aGk="}}"#;
        let request: EdgeRequest = serde_json::from_str(json).unwrap();
        let body = request.body.unwrap();
        assert_eq!(body.encoding, BodyEncoding::Base64);
        assert!(!body.input_truncated);
    }
}
