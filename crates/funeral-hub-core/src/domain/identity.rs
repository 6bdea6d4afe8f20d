use async_trait::async_trait;

use super::actor::{Actor, UserId};
use crate::CoreError;

/// Resolves opaque caller tokens to actors.
///
/// A token that cannot be resolved yields [`CoreError::Unauthenticated`],
/// never a guard failure.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn resolve(&self, token: &str) -> Result<Actor, CoreError>;
}

/// Revokes platform access for a user
#[async_trait]
pub trait AccessRevoker: Send + Sync {
    /// Returns `false` when the user was already revoked or does not exist
    async fn revoke_access(&self, user_id: UserId) -> Result<bool, CoreError>;
}

/// Parse the token format shared by the bundled providers: the numeric user id
pub fn parse_user_token(token: &str) -> Result<UserId, CoreError> {
    token
        .trim()
        .parse::<i64>()
        .map(UserId)
        .map_err(|_| CoreError::Unauthenticated("Malformed actor token".to_string()))
}
