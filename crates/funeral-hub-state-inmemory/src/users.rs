use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

use funeral_hub_core::{
    domain::identity::parse_user_token, AccessRevoker, Actor, CoreError, IdentityProvider, UserId,
};

#[derive(Debug, Clone)]
struct UserRecord {
    actor: Actor,
    revoked: bool,
}

/// In-memory user registry; tokens are the numeric user id
#[derive(Clone, Default)]
pub struct InMemoryUserDirectory {
    users: Arc<RwLock<HashMap<UserId, UserRecord>>>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a user
    pub async fn add_user(&self, actor: Actor) {
        self.users.write().await.insert(
            actor.id,
            UserRecord {
                actor,
                revoked: false,
            },
        );
    }

    pub async fn is_revoked(&self, user_id: UserId) -> bool {
        self.users
            .read()
            .await
            .get(&user_id)
            .map_or(false, |record| record.revoked)
    }
}

#[async_trait]
impl IdentityProvider for InMemoryUserDirectory {
    async fn resolve(&self, token: &str) -> Result<Actor, CoreError> {
        let user_id = parse_user_token(token)?;
        match self.users.read().await.get(&user_id) {
            Some(record) if !record.revoked => Ok(record.actor),
            Some(_) => Err(CoreError::Unauthenticated(format!(
                "Access of user {} has been revoked",
                user_id
            ))),
            None => Err(CoreError::Unauthenticated(format!(
                "Unknown user {}",
                user_id
            ))),
        }
    }
}

#[async_trait]
impl AccessRevoker for InMemoryUserDirectory {
    async fn revoke_access(&self, user_id: UserId) -> Result<bool, CoreError> {
        let mut users = self.users.write().await;
        match users.get_mut(&user_id) {
            Some(record) if !record.revoked => {
                record.revoked = true;
                info!(user_id = %user_id, "User access revoked");
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
