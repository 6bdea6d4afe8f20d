use chrono::{DateTime, NaiveDate, Utc};
use funeral_hub_core::{
    BurialProgress, CoreError, Deceased, Document, DocumentId, GroupId, Protocol, ProtocolId,
    UserId,
};
use sqlx::{postgres::PgRow, Row};
use uuid::Uuid;

fn column<'r, T>(row: &'r PgRow, name: &str) -> Result<T, CoreError>
where
    T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
{
    row.try_get(name)
        .map_err(|e| CoreError::Internal(format!("Error reading column {}: {}", name, e)))
}

fn user(row: &PgRow, name: &str) -> Result<Option<UserId>, CoreError> {
    Ok(column::<Option<i64>>(row, name)?.map(UserId))
}

pub(crate) fn protocol_from_row(row: &PgRow) -> Result<Protocol, CoreError> {
    let rejections: i32 = column(row, "draft_rejection_count")?;
    Ok(Protocol {
        id: ProtocolId(column::<Uuid>(row, "id")?),
        status: column::<String>(row, "status")?.parse()?,
        burial_status: column::<String>(row, "burial_status")?.parse()?,
        documentation_status: column::<String>(row, "documentation_status")?.parse()?,
        deceased: Deceased {
            full_name: column(row, "deceased_full_name")?,
            birth_date: column::<NaiveDate>(row, "deceased_birth_date")?,
            mother_name: column(row, "deceased_mother_name")?,
            cpf: column(row, "deceased_cpf")?,
        },
        death_at: column::<Option<DateTime<Utc>>>(row, "death_at")?,
        burial_scheduled_at: column::<Option<DateTime<Utc>>>(row, "burial_scheduled_at")?,
        creator_id: UserId(column::<i64>(row, "creator_id")?),
        group_id: column::<Option<i64>>(row, "group_id")?.map(GroupId),
        funeral_home_id: user(row, "funeral_home_id")?,
        notary_id: user(row, "notary_id")?,
        declarant_id: user(row, "declarant_id")?,
        draft_rejection_count: u32::try_from(rejections).map_err(|_| {
            CoreError::Internal(format!("Negative draft rejection count: {}", rejections))
        })?,
        draft_rejection_remarks: column(row, "draft_rejection_remarks")?,
        pickup_predicted_at: column(row, "pickup_predicted_at")?,
        created_at: column(row, "created_at")?,
        updated_at: column(row, "updated_at")?,
        finalized_at: column(row, "finalized_at")?,
        closed_at: column(row, "closed_at")?,
        documents_purged_at: column(row, "documents_purged_at")?,
        declarant_access_revoked_at: column(row, "declarant_access_revoked_at")?,
    })
}

pub(crate) fn document_from_row(row: &PgRow) -> Result<Document, CoreError> {
    Ok(Document {
        id: DocumentId(column::<Uuid>(row, "id")?),
        protocol_id: ProtocolId(column::<Uuid>(row, "protocol_id")?),
        kind: column::<String>(row, "kind")?.parse()?,
        storage_ref: column(row, "storage_ref")?,
        original_name: column(row, "original_name")?,
        content_type: column(row, "content_type")?,
        size_bytes: column(row, "size_bytes")?,
        uploaded_at: column(row, "uploaded_at")?,
    })
}

pub(crate) fn burial_progress_from_row(row: &PgRow) -> Result<BurialProgress, CoreError> {
    Ok(BurialProgress {
        protocol_id: ProtocolId(column::<Uuid>(row, "protocol_id")?),
        body_retrieved_at: column(row, "body_retrieved_at")?,
        body_removed: column(row, "body_removed")?,
        wake_arrival_at: column(row, "wake_arrival_at")?,
        burial_stage: column::<Option<String>>(row, "burial_stage")?
            .map(|stage| stage.parse())
            .transpose()?,
        burial_completed_at: column(row, "burial_completed_at")?,
        updated_at: column(row, "updated_at")?,
    })
}
