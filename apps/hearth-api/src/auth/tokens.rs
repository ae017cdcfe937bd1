//! Access-token verification.
//!
//! Tokens are minted by the auth collaborator with a shared HS256 secret;
//! this side only verifies them. A token arrives as the `token` query
//! parameter of the websocket handshake.

use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Claims carried by an access token.
#[derive(Debug, Serialize, Deserialize)]
pub struct AccessClaims {
    pub user_id: i64,
    pub exp: i64,
}

/// Verify signature and expiry, returning the claims.
pub fn decode_access_token(secret: &str, token: &str) -> Result<AccessClaims, ApiError> {
    let key = DecodingKey::from_secret(secret.as_bytes());
    // HS256 with exp validation; nothing else is claimed.
    let validation = Validation::new(Algorithm::HS256);

    let data = jsonwebtoken::decode::<AccessClaims>(token, &key, &validation).map_err(|e| {
        tracing::debug!(?e, "access token rejected");
        ApiError::unauthorized("Invalid or expired token")
    })?;

    Ok(data.claims)
}
