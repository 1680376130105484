// [[KERNEL]]/apps/agent-kernel/src/security.rs
// Purpose: Caller identity taken from the X-Client-Id header.
// Architecture: API Layer

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
};

pub const CLIENT_ID_HEADER: &str = "X-Client-Id";

/// `None` when the header is absent; the session is then anonymous.
pub struct ClientId(pub Option<String>);

#[async_trait]
impl<S> FromRequestParts<S> for ClientId
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(raw) = parts.headers.get(CLIENT_ID_HEADER) else {
            return Ok(ClientId(None));
        };

        let client_id = raw.to_str().map_err(|_| StatusCode::BAD_REQUEST)?;

        // Ends up inside session ids and therefore file names.
        let valid = !client_id.is_empty()
            && client_id.len() <= 64
            && client_id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

        if !valid {
            tracing::warn!("Invalid client id rejected: {}", client_id);
            return Err(StatusCode::BAD_REQUEST);
        }

        Ok(ClientId(Some(client_id.to_string())))
    }
}
