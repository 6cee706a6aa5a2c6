//! Body classification for the outbound wire format.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::error::AdapterError;
use crate::event::{BodyEncoding, EdgeRequestBody};

/// A response body ready for the wire, with its encoding tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedBody {
    pub body: String,
    pub encoding: BodyEncoding,
}

/// Whether a content-type is carried as plain text.
pub fn is_text_content_type(content_type: &str) -> bool {
    content_type
        .trim_start()
        .get(..5)
        .map_or(false, |prefix| prefix.eq_ignore_ascii_case("text/"))
}

/// Encode a response body according to its declared content-type.
///
/// `text/*` bodies that are valid UTF-8 go out as text; everything else,
/// including a missing content-type, is base64.
pub fn encode_body(content_type: Option<&str>, body: Vec<u8>) -> EncodedBody {
    if content_type.map_or(false, is_text_content_type) {
        match String::from_utf8(body) {
            Ok(text) => {
                return EncodedBody {
                    body: text,
                    encoding: BodyEncoding::Text,
                }
            }
            Err(err) => {
                tracing::debug!("text body is not valid UTF-8, falling back to base64");
                return EncodedBody {
                    body: STANDARD.encode(err.into_bytes()),
                    encoding: BodyEncoding::Base64,
                };
            }
        }
    }

    EncodedBody {
        body: STANDARD.encode(body),
        encoding: BodyEncoding::Base64,
    }
}

/// Decode a forwarded request body into raw bytes.
pub fn decode_request_body(body: &EdgeRequestBody) -> Result<Vec<u8>, AdapterError> {
    match body.encoding {
        BodyEncoding::Text => Ok(body.data.clone().into_bytes()),
        BodyEncoding::Base64 => STANDARD
            .decode(body.data.as_bytes())
            .map_err(|e| AdapterError::InvalidRequest(format!("request body: {}", e))),
    }
}
