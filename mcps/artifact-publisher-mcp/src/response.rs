//! Tool result helpers
//!
//! Domain failures are reported in-band as error results so the calling
//! model can read and act on them; only malformed parameters become
//! protocol errors.

use rmcp::model::{CallToolResult, Content};
use rmcp::ErrorData as McpError;
use serde::Serialize;

use crate::error::PublishError;

/// Guidance returned whenever a tool needs a repository and none is selected
pub const NO_ACTIVE_REPOSITORY: &str = "No active repository. Run initialize_repository to create one or switch_repository to select an existing one.";

/// Pretty-printed JSON success result
pub fn json_success<T: Serialize>(data: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(data)
        .map_err(|e| McpError::internal_error(e.to_string(), None))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

/// `Operation failed: <cause>` error result
pub fn operation_failed(cause: impl std::fmt::Display) -> CallToolResult {
    CallToolResult::error(vec![Content::text(format!("Operation failed: {cause}"))])
}

/// Map a domain failure to its in-band result
pub fn failure(err: PublishError) -> CallToolResult {
    match err {
        PublishError::NoActiveRepository => {
            CallToolResult::error(vec![Content::text(NO_ACTIVE_REPOSITORY)])
        }
        other => operation_failed(other),
    }
}

pub fn invalid_params(message: impl Into<String>) -> McpError {
    McpError::invalid_params(message.into(), None)
}
