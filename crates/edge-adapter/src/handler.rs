//! Per-invocation translation between edge events and the render collaborator.

use async_trait::async_trait;
use http::{header, Request, Response, StatusCode};
use once_cell::sync::OnceCell;
use serde_json::{Map, Value};

use crate::body::{decode_request_body, encode_body};
use crate::error::AdapterError;
use crate::event::{BodyEncoding, EdgeEvent, EdgeHeader, EdgeRequest, EdgeResponse, ResponseHeaders};
use crate::headers::{to_edge_headers, to_header_map, ExclusionPolicy};

/// The bundled application's entrypoint.
#[async_trait]
pub trait Render: Send + Sync {
    /// Render a response for `request` using the production settings.
    async fn render(
        &self,
        request: Request<Vec<u8>>,
        settings: &Value,
    ) -> anyhow::Result<Response<Vec<u8>>>;

    /// Optional production settings provider, consulted once per process.
    fn prod_settings(&self) -> Option<Value> {
        None
    }
}

/// Process-wide adapter context.
///
/// Built once when the function starts and shared by every invocation. The
/// production settings are resolved lazily on first use and never recomputed.
pub struct EdgeHandler<R> {
    renderer: R,
    policy: ExclusionPolicy,
    prod_settings: OnceCell<Value>,
}

impl<R: Render> EdgeHandler<R> {
    /// Create a handler around the render collaborator.
    pub fn new(renderer: R) -> Self {
        Self {
            renderer,
            policy: ExclusionPolicy::default(),
            prod_settings: OnceCell::new(),
        }
    }

    /// The memoized production settings; an empty object when no provider exists.
    pub fn prod_settings(&self) -> &Value {
        self.prod_settings.get_or_init(|| {
            self.renderer
                .prod_settings()
                .unwrap_or_else(|| Value::Object(Map::new()))
        })
    }

    /// Translate one invocation. Errors propagate to the caller untouched.
    pub async fn handle(&self, event: EdgeEvent) -> Result<EdgeResponse, AdapterError> {
        let edge_request = event.into_request()?;
        let request = build_request(&edge_request)?;

        tracing::debug!(
            method = %request.method(),
            url = %request.uri(),
            headers = request.headers().len(),
            "edge request"
        );

        let response = self
            .renderer
            .render(request, self.prod_settings())
            .await
            .map_err(AdapterError::Render)?;

        let edge_response = self.build_response(response);
        tracing::debug!(
            status = %edge_response.status,
            encoding = %edge_response.body_encoding,
            headers = edge_response.headers.len(),
            "edge response"
        );

        Ok(edge_response)
    }

    /// Translate one invocation, mapping any failure to a `502` response.
    pub async fn handle_or_error_response(&self, event: EdgeEvent) -> EdgeResponse {
        match self.handle(event).await {
            Ok(response) => response,
            Err(err) => {
                tracing::error!(error = %err, "edge invocation failed");
                error_response(StatusCode::BAD_GATEWAY)
            }
        }
    }

    /// Decode a raw JSON payload, translate it, and encode the result.
    pub async fn handle_json(&self, payload: &str) -> Result<String, AdapterError> {
        let event = EdgeEvent::from_json(payload)?;
        self.handle(event).await?.to_json()
    }

    fn build_response(&self, response: Response<Vec<u8>>) -> EdgeResponse {
        let (parts, body) = response.into_parts();
        let content_type = parts
            .headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok());
        let encoded = encode_body(content_type, body);

        EdgeResponse {
            status: parts.status.as_u16().to_string(),
            status_description: parts.status.canonical_reason().unwrap_or("").to_string(),
            body: encoded.body,
            body_encoding: encoded.encoding,
            headers: to_edge_headers(&parts.headers, &self.policy),
        }
    }
}

/// Build the application request from an edge request descriptor.
///
/// The URL is always `https://{host}{uri}`; TLS is terminated upstream.
pub fn build_request(edge_request: &EdgeRequest) -> Result<Request<Vec<u8>>, AdapterError> {
    let host = edge_request.host().ok_or(AdapterError::MissingHost)?;
    let url = format!("https://{}{}", host, edge_request.uri);

    let method = http::Method::from_bytes(edge_request.method.as_bytes())
        .map_err(|e| AdapterError::InvalidRequest(format!("method '{}': {}", edge_request.method, e)))?;

    let body = match &edge_request.body {
        Some(body) => decode_request_body(body)?,
        None => Vec::new(),
    };

    let mut request = Request::builder().method(method).uri(url).body(body)?;
    *request.headers_mut() = to_header_map(&edge_request.headers)?;
    Ok(request)
}

/// Plain-text response for a status, used by the error boundary.
pub fn error_response(status: StatusCode) -> EdgeResponse {
    let reason = status.canonical_reason().unwrap_or("Error").to_string();
    let mut headers = ResponseHeaders::new();
    headers.insert(
        "content-type".to_string(),
        vec![EdgeHeader {
            header: "content-type".to_string(),
            value: "text/plain".to_string(),
        }],
    );

    EdgeResponse {
        status: status.as_u16().to_string(),
        status_description: reason.clone(),
        body: reason,
        body_encoding: BodyEncoding::Text,
        headers,
    }
}
