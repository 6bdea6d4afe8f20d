use crate::{domain::protocol::ProtocolId, CoreError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Value object: Document ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentId(pub Uuid);

impl DocumentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind tag of an attachment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    DeathDeclaration,
    Faf,
    Draft,
    FinalCertificate,
    Supporting,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::DeathDeclaration => "death_declaration",
            DocumentKind::Faf => "faf",
            DocumentKind::Draft => "draft",
            DocumentKind::FinalCertificate => "final_certificate",
            DocumentKind::Supporting => "supporting",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "death_declaration" => Ok(DocumentKind::DeathDeclaration),
            "faf" => Ok(DocumentKind::Faf),
            "draft" => Ok(DocumentKind::Draft),
            "final_certificate" => Ok(DocumentKind::FinalCertificate),
            "supporting" => Ok(DocumentKind::Supporting),
            other => Err(CoreError::Internal(format!("Unknown document kind: {}", other))),
        }
    }
}

/// File already accepted by the upload layer.
///
/// Type and size checks happen before the engine sees it; only the metadata
/// and the storage reference are persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedFile {
    pub storage_ref: String,
    pub original_name: String,
    pub content_type: String,
    pub size_bytes: i64,
}

impl UploadedFile {
    /// Reject files the upload layer could not have produced
    pub fn validate(&self, label: &str) -> Result<(), CoreError> {
        if self.storage_ref.trim().is_empty() {
            return Err(CoreError::InvalidPayload(format!(
                "{} has no storage reference",
                label
            )));
        }
        if self.original_name.trim().is_empty() {
            return Err(CoreError::InvalidPayload(format!("{} has no file name", label)));
        }
        if self.size_bytes <= 0 {
            return Err(CoreError::InvalidPayload(format!("{} is empty", label)));
        }
        Ok(())
    }
}

/// Document row waiting to be inserted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDocument {
    pub protocol_id: ProtocolId,
    pub kind: DocumentKind,
    pub file: UploadedFile,
    pub uploaded_at: DateTime<Utc>,
}

impl NewDocument {
    pub fn new(
        protocol_id: ProtocolId,
        kind: DocumentKind,
        file: UploadedFile,
        uploaded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            protocol_id,
            kind,
            file,
            uploaded_at,
        }
    }
}

/// Persisted attachment; append-only
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub protocol_id: ProtocolId,
    pub kind: DocumentKind,
    pub storage_ref: String,
    pub original_name: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub uploaded_at: DateTime<Utc>,
}

impl Document {
    /// Materialize a new document with a fresh id
    pub fn from_new(new: &NewDocument) -> Self {
        Self {
            id: DocumentId::new(),
            protocol_id: new.protocol_id,
            kind: new.kind,
            storage_ref: new.file.storage_ref.clone(),
            original_name: new.file.original_name.clone(),
            content_type: new.file.content_type.clone(),
            size_bytes: new.file.size_bytes,
            uploaded_at: new.uploaded_at,
        }
    }
}
