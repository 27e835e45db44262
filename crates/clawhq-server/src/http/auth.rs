//! Bearer authentication for the agent-self API.

use axum::extract::{Request, State};
use axum::http::{HeaderMap, header};
use axum::middleware::Next;
use axum::response::Response;
use tracing::debug;

use super::AppState;
use super::error::ApiError;

/// Identity bound to requests that passed [`require_agent`].
#[derive(Debug, Clone)]
pub struct AuthenticatedAgent {
    pub id: i64,
    pub name: String,
}

/// Extract the token from `Authorization: Bearer <token>`.
///
/// The scheme is case-insensitive. Returns `None` when the header is absent,
/// not `Bearer`, or carries an empty token.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let scheme = value.get(..7)?;
    if !scheme.eq_ignore_ascii_case("bearer ") {
        return None;
    }
    let token = value[7..].trim();
    (!token.is_empty()).then_some(token)
}

/// Reject the request unless it carries a valid agent token.
pub async fn require_agent(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(req.headers())
        .ok_or(ApiError::MissingToken)?
        .to_string();

    let Some(agent) = state.tokens.authenticate(&token).await? else {
        debug!(path = %req.uri().path(), "Rejected agent token");
        return Err(ApiError::InvalidToken);
    };

    req.extensions_mut().insert(AuthenticatedAgent {
        id: agent.id,
        name: agent.name,
    });
    Ok(next.run(req).await)
}
