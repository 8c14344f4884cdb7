//! Response decoding

use super::transport::ApiResponse;
use crate::error::{BeaconError, BeaconResult};
use serde_json::Value;

/// Message for a failed call: the body's `error`, then `message`, then a
/// generic text naming the status
pub fn error_message(response: &ApiResponse) -> String {
    serde_json::from_str::<Value>(&response.body)
        .ok()
        .and_then(|body| {
            ["error", "message"].iter().find_map(|field| {
                body.get(*field)
                    .and_then(Value::as_str)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
            })
        })
        .unwrap_or_else(|| format!("Request failed with status {}", response.status))
}

/// Decode a response into JSON or the matching error
///
/// An empty success body decodes to `null`.
pub fn decode(response: ApiResponse) -> BeaconResult<Value> {
    if !response.is_success() {
        return Err(BeaconError::api(response.status, error_message(&response)));
    }
    if response.body.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&response.body).map_err(|e| {
        BeaconError::json_with_context(e.to_string(), "Decoding response body")
    })
}
