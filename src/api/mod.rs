//! HTTP API endpoints for the reputation ledger
//!
//! Provides REST APIs for:
//! - Actor registration and lookup
//! - Activity proof submission and verification
//! - Reputation score reads, breakdowns, and score proofs
//! - Verification request workflow
//! - Task protocol integration (single and batch completions)

pub mod activity;
pub mod actors;
pub mod reputation;
pub mod tasks;
pub mod verification;

use axum::http::{HeaderMap, StatusCode};

use crate::error::CoreError;

pub use activity::{create_router as create_activity_router, ActivityApiState};
pub use actors::{create_router as create_actor_router, ActorApiState};
pub use reputation::{create_router as create_reputation_router, ReputationApiState};
pub use tasks::{create_router as create_task_router, TaskApiState};
pub use verification::{create_router as create_verification_router, VerificationApiState};

/// Header the trusted upstream proxy sets to the caller's wallet address.
pub const WALLET_HEADER: &str = "x-wallet-address";

/// Resolve the caller's wallet address from the request headers.
pub fn caller_wallet(headers: &HeaderMap) -> Result<String, (StatusCode, String)> {
    let unauthorized = || {
        (
            StatusCode::UNAUTHORIZED,
            format!("{WALLET_HEADER} header is required"),
        )
    };
    let value = headers.get(WALLET_HEADER).ok_or_else(unauthorized)?;
    let wallet = value.to_str().map_err(|_| unauthorized())?.trim();
    if wallet.is_empty() {
        return Err(unauthorized());
    }
    Ok(wallet.to_string())
}

/// Map a core error onto the HTTP status it should surface as.
pub fn error_response(err: CoreError) -> (StatusCode, String) {
    let status = match &err {
        CoreError::NotFound(_) => StatusCode::NOT_FOUND,
        CoreError::Conflict(_) => StatusCode::CONFLICT,
        CoreError::InvalidState(_) | CoreError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
        CoreError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
    };
    (status, err.to_string())
}
