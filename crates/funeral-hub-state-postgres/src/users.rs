use async_trait::async_trait;
use sqlx::Row;
use tracing::info;

use funeral_hub_core::{
    domain::identity::parse_user_token, AccessRevoker, Actor, CoreError, GroupId,
    IdentityProvider, Role, UserId,
};

use crate::error::map_sqlx_error;
use crate::PostgresConnection;

/// User directory backed by the `users` table; tokens are the numeric user id
#[derive(Clone)]
pub struct PostgresUserDirectory {
    conn: PostgresConnection,
}

impl PostgresUserDirectory {
    pub fn new(conn: PostgresConnection) -> Self {
        Self { conn }
    }

    /// Insert or replace a user, restoring access if it was revoked
    pub async fn upsert_user(&self, actor: &Actor) -> Result<(), CoreError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, role, group_id, access_revoked, revoked_at)
            VALUES ($1, $2, $3, FALSE, NULL)
            ON CONFLICT (id) DO UPDATE SET
                role = EXCLUDED.role,
                group_id = EXCLUDED.group_id,
                access_revoked = FALSE,
                revoked_at = NULL
            "#,
        )
        .bind(actor.id.0)
        .bind(actor.role.as_str())
        .bind(actor.group_id.map(|group| group.0))
        .execute(self.conn.pool())
        .await
        .map_err(|e| map_sqlx_error(e, "Failed to upsert user"))?;
        Ok(())
    }
}

#[async_trait]
impl IdentityProvider for PostgresUserDirectory {
    async fn resolve(&self, token: &str) -> Result<Actor, CoreError> {
        let user_id = parse_user_token(token)?;
        let row = sqlx::query("SELECT role, group_id, access_revoked FROM users WHERE id = $1")
            .bind(user_id.0)
            .fetch_optional(self.conn.pool())
            .await
            .map_err(|e| map_sqlx_error(e, "Failed to resolve user"))?
            .ok_or_else(|| CoreError::Unauthenticated(format!("Unknown user {}", user_id)))?;

        let revoked: bool = row
            .try_get("access_revoked")
            .map_err(|e| map_sqlx_error(e, "Failed to read user"))?;
        if revoked {
            return Err(CoreError::Unauthenticated(format!(
                "Access of user {} has been revoked",
                user_id
            )));
        }

        let role: Role = row
            .try_get::<String, _>("role")
            .map_err(|e| map_sqlx_error(e, "Failed to read user"))?
            .parse()?;
        let group_id: Option<i64> = row
            .try_get("group_id")
            .map_err(|e| map_sqlx_error(e, "Failed to read user"))?;

        let actor = Actor::new(user_id, role);
        Ok(match group_id {
            Some(group) => actor.in_group(GroupId(group)),
            None => actor,
        })
    }
}

#[async_trait]
impl AccessRevoker for PostgresUserDirectory {
    async fn revoke_access(&self, user_id: UserId) -> Result<bool, CoreError> {
        let result = sqlx::query(
            "UPDATE users SET access_revoked = TRUE, revoked_at = NOW()
             WHERE id = $1 AND NOT access_revoked",
        )
        .bind(user_id.0)
        .execute(self.conn.pool())
        .await
        .map_err(|e| map_sqlx_error(e, "Failed to revoke access"))?;

        let revoked = result.rows_affected() > 0;
        if revoked {
            info!(user_id = %user_id, "User access revoked");
        }
        Ok(revoked)
    }
}
