pub mod tokens;

use serde::{Deserialize, Serialize};

use crate::db::directory::Directory;
use crate::error::ApiError;

pub use tokens::AccessClaims;

/// Authenticated user, resolved once per connection and immutable for the
/// connection's lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    pub id: i64,
    pub username: String,
}

/// Resolve a bearer credential into an [`Identity`].
///
/// Fails with `UNAUTHORIZED` for a missing/invalid/expired token and for
/// tokens whose user no longer exists.
pub async fn resolve_identity(
    directory: &dyn Directory,
    secret: &str,
    token: Option<&str>,
) -> Result<Identity, ApiError> {
    let token = token.ok_or_else(|| ApiError::unauthorized("Missing token"))?;
    let claims = tokens::decode_access_token(secret, token)?;

    let user = directory
        .find_user(claims.user_id)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Unknown user"))?;

    Ok(Identity {
        id: user.id,
        username: user.username,
    })
}
