//! Chat payload cleanup
//!
//! Chat models frequently wrap JSON answers in Markdown code fences even
//! when told not to. This module unwraps that envelope before parsing and
//! treats a half-open fence as a malformed response rather than guessing.

use serde::de::DeserializeOwned;

use crate::{RelayError, Result};

/// Strip a surrounding Markdown code fence from model output.
///
/// Accepts a bare ``` fence or a ```json tagged one. Input without fences
/// passes through trimmed. A fence that opens without closing, or closes
/// without opening, is rejected.
pub fn unwrap_code_fence(raw: &str) -> Result<&str> {
    let trimmed = raw.trim();

    if let Some(rest) = trimmed.strip_prefix("```") {
        let rest = rest.strip_prefix("json").unwrap_or(rest);
        let rest = rest.strip_prefix('\n').unwrap_or(rest);
        let inner = rest
            .strip_suffix("```")
            .ok_or_else(|| RelayError::MalformedResponse("unterminated code fence".to_string()))?;
        Ok(inner.trim())
    } else if trimmed.ends_with("```") {
        Err(RelayError::MalformedResponse(
            "unopened code fence".to_string(),
        ))
    } else {
        Ok(trimmed)
    }
}

/// Unwrap any code fence and deserialize the remaining JSON payload.
pub fn parse_json_payload<T: DeserializeOwned>(content: &str) -> Result<T> {
    let body = unwrap_code_fence(content)?;
    serde_json::from_str(body)
        .map_err(|e| RelayError::MalformedResponse(format!("invalid JSON payload: {}", e)))
}
