use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Postgres, QueryBuilder, Transaction};
use tracing::debug;
use uuid::Uuid;

use funeral_hub_core::{
    BurialProgress, BurialProgressPatch, CoreError, Document, NewDocument, Protocol, ProtocolId,
    ProtocolMutation, ProtocolQuery, ProtocolStore, ProtocolTransaction,
};

use crate::error::map_sqlx_error;
use crate::rows::{burial_progress_from_row, document_from_row, protocol_from_row};
use crate::PostgresConnection;

/// Postgres implementation of the ProtocolStore
#[derive(Clone)]
pub struct PostgresProtocolStore {
    conn: PostgresConnection,
    lock_timeout_ms: u64,
}

impl PostgresProtocolStore {
    /// Create a new store; row locks wait at most `lock_timeout_ms`
    pub fn new(conn: PostgresConnection, lock_timeout_ms: u64) -> Self {
        Self {
            conn,
            lock_timeout_ms,
        }
    }
}

fn not_found(id: &ProtocolId) -> CoreError {
    CoreError::NotFound(format!("Protocol {} not found", id))
}

#[async_trait]
impl ProtocolStore for PostgresProtocolStore {
    async fn begin(&self) -> Result<Box<dyn ProtocolTransaction>, CoreError> {
        let mut tx = self
            .conn
            .pool()
            .begin()
            .await
            .map_err(|e| map_sqlx_error(e, "Failed to begin transaction"))?;

        sqlx::query("SELECT set_config('lock_timeout', $1, true)")
            .bind(format!("{}ms", self.lock_timeout_ms))
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error(e, "Failed to set lock timeout"))?;

        Ok(Box::new(PostgresTransaction { tx }))
    }

    async fn read_protocol(&self, id: &ProtocolId) -> Result<Protocol, CoreError> {
        let row = sqlx::query("SELECT * FROM protocols WHERE id = $1")
            .bind(id.0)
            .fetch_optional(self.conn.pool())
            .await
            .map_err(|e| map_sqlx_error(e, "Failed to read protocol"))?
            .ok_or_else(|| not_found(id))?;
        protocol_from_row(&row)
    }

    async fn list_documents(&self, id: &ProtocolId) -> Result<Vec<Document>, CoreError> {
        sqlx::query("SELECT * FROM documents WHERE protocol_id = $1 ORDER BY uploaded_at, id")
            .bind(id.0)
            .fetch_all(self.conn.pool())
            .await
            .map_err(|e| map_sqlx_error(e, "Failed to list documents"))?
            .iter()
            .map(document_from_row)
            .collect()
    }

    async fn read_burial_progress(
        &self,
        id: &ProtocolId,
    ) -> Result<Option<BurialProgress>, CoreError> {
        sqlx::query("SELECT * FROM burial_progress WHERE protocol_id = $1")
            .bind(id.0)
            .fetch_optional(self.conn.pool())
            .await
            .map_err(|e| map_sqlx_error(e, "Failed to read burial progress"))?
            .as_ref()
            .map(burial_progress_from_row)
            .transpose()
    }

    async fn list_protocols(&self, query: &ProtocolQuery) -> Result<Vec<Protocol>, CoreError> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT * FROM protocols WHERE TRUE");

        if let Some(status) = query.status {
            builder.push(" AND status = ").push_bind(status.as_str());
        }
        if !query.documentation_statuses.is_empty() {
            let statuses: Vec<String> = query
                .documentation_statuses
                .iter()
                .map(|status| status.as_str().to_string())
                .collect();
            builder
                .push(" AND documentation_status = ANY(")
                .push_bind(statuses)
                .push(")");
        }
        if let Some(before) = query.updated_before {
            builder.push(" AND updated_at < ").push_bind(before);
        }
        if let Some(before) = query.finalized_before {
            builder.push(" AND finalized_at < ").push_bind(before);
        }
        if let Some(before) = query.closed_before {
            builder.push(" AND closed_at < ").push_bind(before);
        }
        if query.not_purged {
            builder.push(" AND documents_purged_at IS NULL");
        }
        if query.declarant_not_revoked {
            builder.push(" AND declarant_id IS NOT NULL AND declarant_access_revoked_at IS NULL");
        }
        builder.push(" ORDER BY ").push(query.order.sql());
        if let Some(limit) = query.limit {
            builder.push(" LIMIT ").push_bind(limit.max(0));
        }

        builder
            .build()
            .fetch_all(self.conn.pool())
            .await
            .map_err(|e| map_sqlx_error(e, "Failed to list protocols"))?
            .iter()
            .map(protocol_from_row)
            .collect()
    }
}

/// Transaction over a pooled Postgres connection.
///
/// Dropping it without `commit` rolls the database transaction back and
/// releases every row lock taken through it.
pub struct PostgresTransaction {
    tx: Transaction<'static, Postgres>,
}

const INSERT_PROTOCOL: &str = r#"
    INSERT INTO protocols (
        id, status, burial_status, documentation_status,
        deceased_full_name, deceased_birth_date, deceased_mother_name, deceased_cpf,
        death_at, burial_scheduled_at, creator_id, group_id,
        funeral_home_id, notary_id, declarant_id,
        draft_rejection_count, draft_rejection_remarks, pickup_predicted_at,
        created_at, updated_at, finalized_at, closed_at, documents_purged_at,
        declarant_access_revoked_at
    ) VALUES (
        $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12,
        $13, $14, $15, $16, $17, $18, $19, $20, $21, $22, $23, $24
    )
"#;

const APPLY_MUTATION: &str = r#"
    UPDATE protocols SET
        status = COALESCE($2, status),
        burial_status = COALESCE($3, burial_status),
        documentation_status = COALESCE($4, documentation_status),
        funeral_home_id = COALESCE($5, funeral_home_id),
        notary_id = COALESCE($6, notary_id),
        declarant_id = COALESCE($7, declarant_id),
        draft_rejection_count = CASE WHEN $8 THEN draft_rejection_count + 1
                                     ELSE draft_rejection_count END,
        draft_rejection_remarks = COALESCE($9, draft_rejection_remarks),
        pickup_predicted_at = COALESCE($10, pickup_predicted_at),
        finalized_at = COALESCE($11, finalized_at),
        closed_at = COALESCE($12, closed_at),
        documents_purged_at = COALESCE($13, documents_purged_at),
        declarant_access_revoked_at = COALESCE($15, declarant_access_revoked_at),
        updated_at = $14
    WHERE id = $1
    RETURNING *
"#;

const UPSERT_BURIAL_PROGRESS: &str = r#"
    INSERT INTO burial_progress (
        protocol_id, body_retrieved_at, body_removed, wake_arrival_at,
        burial_stage, burial_completed_at, updated_at
    ) VALUES ($1, $2, COALESCE($3, FALSE), $4, $5, $6, $7)
    ON CONFLICT (protocol_id) DO UPDATE SET
        body_retrieved_at = COALESCE($2, burial_progress.body_retrieved_at),
        body_removed = COALESCE($3, burial_progress.body_removed),
        wake_arrival_at = COALESCE($4, burial_progress.wake_arrival_at),
        burial_stage = COALESCE($5, burial_progress.burial_stage),
        burial_completed_at = COALESCE($6, burial_progress.burial_completed_at),
        updated_at = $7
    RETURNING *
"#;

#[async_trait]
impl ProtocolTransaction for PostgresTransaction {
    async fn lock_protocol(&mut self, id: &ProtocolId) -> Result<Protocol, CoreError> {
        let row = sqlx::query("SELECT * FROM protocols WHERE id = $1 FOR UPDATE")
            .bind(id.0)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error(e, "Failed to lock protocol"))?
            .ok_or_else(|| not_found(id))?;
        debug!(protocol_id = %id, "Row lock acquired");
        protocol_from_row(&row)
    }

    async fn insert_protocol(&mut self, protocol: &Protocol) -> Result<(), CoreError> {
        let rejections = i32::try_from(protocol.draft_rejection_count).map_err(|_| {
            CoreError::Internal(format!(
                "Draft rejection count out of range: {}",
                protocol.draft_rejection_count
            ))
        })?;

        sqlx::query(INSERT_PROTOCOL)
            .bind(protocol.id.0)
            .bind(protocol.status.as_str())
            .bind(protocol.burial_status.as_str())
            .bind(protocol.documentation_status.as_str())
            .bind(&protocol.deceased.full_name)
            .bind(protocol.deceased.birth_date)
            .bind(protocol.deceased.mother_name.as_deref())
            .bind(protocol.deceased.cpf.as_deref())
            .bind(protocol.death_at)
            .bind(protocol.burial_scheduled_at)
            .bind(protocol.creator_id.0)
            .bind(protocol.group_id.map(|group| group.0))
            .bind(protocol.funeral_home_id.map(|user| user.0))
            .bind(protocol.notary_id.map(|user| user.0))
            .bind(protocol.declarant_id.map(|user| user.0))
            .bind(rejections)
            .bind(protocol.draft_rejection_remarks.as_deref())
            .bind(protocol.pickup_predicted_at)
            .bind(protocol.created_at)
            .bind(protocol.updated_at)
            .bind(protocol.finalized_at)
            .bind(protocol.closed_at)
            .bind(protocol.documents_purged_at)
            .bind(protocol.declarant_access_revoked_at)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error(e, "Failed to insert protocol"))?;
        Ok(())
    }

    async fn apply_mutation(
        &mut self,
        id: &ProtocolId,
        mutation: &ProtocolMutation,
    ) -> Result<Protocol, CoreError> {
        let row = sqlx::query(APPLY_MUTATION)
            .bind(id.0)
            .bind(mutation.status.map(|s| s.as_str()))
            .bind(mutation.burial_status.map(|s| s.as_str()))
            .bind(mutation.documentation_status.map(|s| s.as_str()))
            .bind(mutation.funeral_home_id.map(|user| user.0))
            .bind(mutation.notary_id.map(|user| user.0))
            .bind(mutation.declarant_id.map(|user| user.0))
            .bind(mutation.increment_draft_rejections)
            .bind(mutation.draft_rejection_remarks.as_deref())
            .bind(mutation.pickup_predicted_at)
            .bind(mutation.finalized_at)
            .bind(mutation.closed_at)
            .bind(mutation.documents_purged_at)
            .bind(mutation.updated_at)
            .bind(mutation.declarant_access_revoked_at)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error(e, "Failed to update protocol"))?
            .ok_or_else(|| not_found(id))?;
        protocol_from_row(&row)
    }

    async fn insert_document(&mut self, document: &NewDocument) -> Result<Document, CoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO documents (
                id, protocol_id, kind, storage_ref, original_name,
                content_type, size_bytes, uploaded_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(document.protocol_id.0)
        .bind(document.kind.as_str())
        .bind(&document.file.storage_ref)
        .bind(&document.file.original_name)
        .bind(&document.file.content_type)
        .bind(document.file.size_bytes)
        .bind(document.uploaded_at)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error(e, "Failed to insert document"))?;
        document_from_row(&row)
    }

    async fn upsert_burial_progress(
        &mut self,
        id: &ProtocolId,
        patch: &BurialProgressPatch,
    ) -> Result<BurialProgress, CoreError> {
        let row = sqlx::query(UPSERT_BURIAL_PROGRESS)
            .bind(id.0)
            .bind(patch.body_retrieved_at)
            .bind(patch.body_removed)
            .bind(patch.wake_arrival_at)
            .bind(patch.burial_stage.map(|stage| stage.as_str()))
            .bind(patch.burial_completed_at)
            .bind(Utc::now())
            .fetch_one(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error(e, "Failed to upsert burial progress"))?;
        burial_progress_from_row(&row)
    }

    async fn purge_documents(&mut self, id: &ProtocolId) -> Result<u64, CoreError> {
        let result = sqlx::query("DELETE FROM documents WHERE protocol_id = $1")
            .bind(id.0)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error(e, "Failed to purge documents"))?;
        Ok(result.rows_affected())
    }

    async fn commit(self: Box<Self>) -> Result<(), CoreError> {
        self.tx
            .commit()
            .await
            .map_err(|e| map_sqlx_error(e, "Failed to commit transaction"))
    }

    async fn rollback(self: Box<Self>) -> Result<(), CoreError> {
        self.tx
            .rollback()
            .await
            .map_err(|e| map_sqlx_error(e, "Failed to roll back transaction"))
    }
}
