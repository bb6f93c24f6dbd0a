//! Interpretation of node RPC responses

use serde::Deserialize;

use ns_core::TransportError;

/// Longest body excerpt kept in an HTTP error
const MAX_ERROR_BODY: usize = 512;

/// Error body the node sends with a failed command
#[derive(Debug, Deserialize)]
struct NodeErrorBody {
    #[serde(rename = "Message")]
    message: String,
    #[serde(rename = "Code", default)]
    code: i64,
}

/// Turn a non-success response into a `TransportError`.
///
/// Bodies of the form `{"Message": "...", "Code": n}` are structured node
/// errors; anything else is reported with its HTTP status.
pub fn error_from_response(status: u16, body: &[u8]) -> TransportError {
    if let Ok(parsed) = serde_json::from_slice::<NodeErrorBody>(body) {
        return TransportError::Node {
            code: parsed.code,
            message: parsed.message,
        };
    }

    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    let body = match text.char_indices().nth(MAX_ERROR_BODY) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    };
    TransportError::Http { status, body }
}
