use crate::{
    domain::actor::{GroupId, UserId},
    CoreError,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Value object: Protocol ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProtocolId(pub Uuid);

impl ProtocolId {
    /// Generate a fresh protocol identifier
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// First eight characters, as used in human-facing messages
    pub fn short(&self) -> String {
        self.0.to_string().chars().take(8).collect()
    }
}

impl Default for ProtocolId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ProtocolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ProtocolId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(ProtocolId)
            .map_err(|_| CoreError::NotFound(format!("protocol {}", s)))
    }
}

/// Primary state of a protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProtocolStatus {
    /// Record is being assembled
    Creating,
    /// Waiting for intake to validate the submitted data
    AwaitingValidation,
    /// Waiting for the family to attend in person
    AwaitingAttendance,
    /// Waiting for the FAF form signatures
    AwaitingFafSignatures,
    /// Burial and documentation sub-flows are running
    ParallelExecution,
    /// Both sub-flows reached their terminal sub-state
    Finalized,
    /// Archived; target for retention purges
    Closed,
    /// Abandoned
    Cancelled,
}

impl ProtocolStatus {
    /// All primary states
    pub const ALL: [ProtocolStatus; 8] = [
        ProtocolStatus::Creating,
        ProtocolStatus::AwaitingValidation,
        ProtocolStatus::AwaitingAttendance,
        ProtocolStatus::AwaitingFafSignatures,
        ProtocolStatus::ParallelExecution,
        ProtocolStatus::Finalized,
        ProtocolStatus::Closed,
        ProtocolStatus::Cancelled,
    ];

    /// Persistent representation
    pub fn as_str(&self) -> &'static str {
        match self {
            ProtocolStatus::Creating => "creating",
            ProtocolStatus::AwaitingValidation => "awaiting_validation",
            ProtocolStatus::AwaitingAttendance => "awaiting_attendance",
            ProtocolStatus::AwaitingFafSignatures => "awaiting_faf_signatures",
            ProtocolStatus::ParallelExecution => "parallel_execution",
            ProtocolStatus::Finalized => "finalized",
            ProtocolStatus::Closed => "closed",
            ProtocolStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ProtocolStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProtocolStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProtocolStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| CoreError::Internal(format!("Unknown protocol status: {}", s)))
    }
}

/// Burial logistics sub-state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BurialStatus {
    /// Sub-flow not yet opened
    NotStarted,
    /// Funeral home is working on it
    InProgress,
    /// Burial performed
    Done,
}

impl BurialStatus {
    /// All burial sub-states
    pub const ALL: [BurialStatus; 3] = [
        BurialStatus::NotStarted,
        BurialStatus::InProgress,
        BurialStatus::Done,
    ];

    /// Persistent representation
    pub fn as_str(&self) -> &'static str {
        match self {
            BurialStatus::NotStarted => "not_started",
            BurialStatus::InProgress => "in_progress",
            BurialStatus::Done => "done",
        }
    }
}

impl fmt::Display for BurialStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BurialStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BurialStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| CoreError::Internal(format!("Unknown burial status: {}", s)))
    }
}

/// Legal documentation sub-state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentationStatus {
    /// Sub-flow not yet opened
    NotStarted,
    /// Notary has to submit the certificate draft
    AwaitingDraft,
    /// Declarant has to accept or reject the draft
    AwaitingDeclarantApproval,
    /// Notary has to correct a rejected draft
    AwaitingCorrection,
    /// Declarant did not answer in time
    DraftRejectionTimeout,
    /// Notary has to issue the certificate
    AwaitingCertificateIssuance,
    /// Certificate issued, waiting for pickup
    AwaitingCertificatePickup,
    /// Final certificate attached
    Done,
}

impl DocumentationStatus {
    /// All documentation sub-states
    pub const ALL: [DocumentationStatus; 8] = [
        DocumentationStatus::NotStarted,
        DocumentationStatus::AwaitingDraft,
        DocumentationStatus::AwaitingDeclarantApproval,
        DocumentationStatus::AwaitingCorrection,
        DocumentationStatus::DraftRejectionTimeout,
        DocumentationStatus::AwaitingCertificateIssuance,
        DocumentationStatus::AwaitingCertificatePickup,
        DocumentationStatus::Done,
    ];

    /// Persistent representation
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentationStatus::NotStarted => "not_started",
            DocumentationStatus::AwaitingDraft => "awaiting_draft",
            DocumentationStatus::AwaitingDeclarantApproval => "awaiting_declarant_approval",
            DocumentationStatus::AwaitingCorrection => "awaiting_correction",
            DocumentationStatus::DraftRejectionTimeout => "draft_rejection_timeout",
            DocumentationStatus::AwaitingCertificateIssuance => "awaiting_certificate_issuance",
            DocumentationStatus::AwaitingCertificatePickup => "awaiting_certificate_pickup",
            DocumentationStatus::Done => "done",
        }
    }
}

impl fmt::Display for DocumentationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentationStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DocumentationStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| CoreError::Internal(format!("Unknown documentation status: {}", s)))
    }
}

/// Deceased person the protocol is about
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deceased {
    /// Full legal name
    pub full_name: String,
    /// Date of birth
    pub birth_date: NaiveDate,
    /// Mother's name, used to disambiguate homonyms
    pub mother_name: Option<String>,
    /// Brazilian taxpayer number
    pub cpf: Option<String>,
}

/// Aggregate: Protocol
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Protocol {
    /// Unique identifier
    pub id: ProtocolId,

    /// Primary state
    pub status: ProtocolStatus,

    /// Burial logistics sub-state
    pub burial_status: BurialStatus,

    /// Legal documentation sub-state
    pub documentation_status: DocumentationStatus,

    /// Deceased person
    pub deceased: Deceased,

    /// Date of death
    pub death_at: Option<DateTime<Utc>>,

    /// Scheduled burial date
    pub burial_scheduled_at: Option<DateTime<Utc>>,

    /// Intake user that created the protocol
    pub creator_id: UserId,

    /// Intake group owning the protocol
    pub group_id: Option<GroupId>,

    /// Bound funeral home
    pub funeral_home_id: Option<UserId>,

    /// Bound notary office
    pub notary_id: Option<UserId>,

    /// Bound declarant
    pub declarant_id: Option<UserId>,

    /// Number of draft rejections so far
    pub draft_rejection_count: u32,

    /// Remarks from the most recent draft rejection
    pub draft_rejection_remarks: Option<String>,

    /// Predicted certificate pickup date
    pub pickup_predicted_at: Option<DateTime<Utc>>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last mutation timestamp
    pub updated_at: DateTime<Utc>,

    /// Finalization timestamp
    pub finalized_at: Option<DateTime<Utc>>,

    /// Closure timestamp
    pub closed_at: Option<DateTime<Utc>>,

    /// When the retention purge removed the documents
    pub documents_purged_at: Option<DateTime<Utc>>,

    /// When the declarant's access was revoked after closure
    pub declarant_access_revoked_at: Option<DateTime<Utc>>,
}

impl Protocol {
    /// Build a freshly created protocol in `awaiting_validation`
    pub fn new(
        creator_id: UserId,
        group_id: Option<GroupId>,
        deceased: Deceased,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ProtocolId::new(),
            status: ProtocolStatus::AwaitingValidation,
            burial_status: BurialStatus::NotStarted,
            documentation_status: DocumentationStatus::NotStarted,
            deceased,
            death_at: None,
            burial_scheduled_at: None,
            creator_id,
            group_id,
            funeral_home_id: None,
            notary_id: None,
            declarant_id: None,
            draft_rejection_count: 0,
            draft_rejection_remarks: None,
            pickup_predicted_at: None,
            created_at: now,
            updated_at: now,
            finalized_at: None,
            closed_at: None,
            documents_purged_at: None,
            declarant_access_revoked_at: None,
        }
    }

    /// Apply a structured partial update, returning the resulting protocol.
    ///
    /// Stores that keep whole rows use this to reproduce exactly what a
    /// relational `UPDATE ... RETURNING *` would produce.
    pub fn with_mutation(&self, mutation: &ProtocolMutation) -> Protocol {
        let mut next = self.clone();
        if let Some(status) = mutation.status {
            next.status = status;
        }
        if let Some(burial_status) = mutation.burial_status {
            next.burial_status = burial_status;
        }
        if let Some(documentation_status) = mutation.documentation_status {
            next.documentation_status = documentation_status;
        }
        if let Some(funeral_home_id) = mutation.funeral_home_id {
            next.funeral_home_id = Some(funeral_home_id);
        }
        if let Some(notary_id) = mutation.notary_id {
            next.notary_id = Some(notary_id);
        }
        if let Some(declarant_id) = mutation.declarant_id {
            next.declarant_id = Some(declarant_id);
        }
        if mutation.increment_draft_rejections {
            next.draft_rejection_count += 1;
        }
        if let Some(remarks) = &mutation.draft_rejection_remarks {
            next.draft_rejection_remarks = Some(remarks.clone());
        }
        if let Some(pickup) = mutation.pickup_predicted_at {
            next.pickup_predicted_at = Some(pickup);
        }
        if let Some(finalized_at) = mutation.finalized_at {
            next.finalized_at = Some(finalized_at);
        }
        if let Some(closed_at) = mutation.closed_at {
            next.closed_at = Some(closed_at);
        }
        if let Some(purged_at) = mutation.documents_purged_at {
            next.documents_purged_at = Some(purged_at);
        }
        if let Some(revoked_at) = mutation.declarant_access_revoked_at {
            next.declarant_access_revoked_at = Some(revoked_at);
        }
        next.updated_at = mutation.updated_at;
        next
    }
}

/// Structured partial update over the fixed set of mutable protocol fields.
///
/// Fields left as `None` (or `false`) are untouched. There is no way to
/// address a column outside this set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolMutation {
    /// New primary state
    pub status: Option<ProtocolStatus>,
    /// New burial sub-state
    pub burial_status: Option<BurialStatus>,
    /// New documentation sub-state
    pub documentation_status: Option<DocumentationStatus>,
    /// Bind funeral home
    pub funeral_home_id: Option<UserId>,
    /// Bind notary
    pub notary_id: Option<UserId>,
    /// Bind declarant
    pub declarant_id: Option<UserId>,
    /// Add one to the draft rejection counter
    pub increment_draft_rejections: bool,
    /// Remarks of the rejection being recorded
    pub draft_rejection_remarks: Option<String>,
    /// Predicted certificate pickup date
    pub pickup_predicted_at: Option<DateTime<Utc>>,
    /// Finalization stamp
    pub finalized_at: Option<DateTime<Utc>>,
    /// Closure stamp
    pub closed_at: Option<DateTime<Utc>>,
    /// Retention purge stamp
    pub documents_purged_at: Option<DateTime<Utc>>,
    /// Declarant revocation stamp
    pub declarant_access_revoked_at: Option<DateTime<Utc>>,
    /// Always stamped
    pub updated_at: DateTime<Utc>,
}

impl ProtocolMutation {
    /// Mutation that only touches `updated_at`
    pub fn touch(now: DateTime<Utc>) -> Self {
        Self {
            status: None,
            burial_status: None,
            documentation_status: None,
            funeral_home_id: None,
            notary_id: None,
            declarant_id: None,
            increment_draft_rejections: false,
            draft_rejection_remarks: None,
            pickup_predicted_at: None,
            finalized_at: None,
            closed_at: None,
            documents_purged_at: None,
            declarant_access_revoked_at: None,
            updated_at: now,
        }
    }

    /// Set the primary state
    pub fn status(mut self, status: ProtocolStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Set the burial sub-state
    pub fn burial_status(mut self, status: BurialStatus) -> Self {
        self.burial_status = Some(status);
        self
    }

    /// Set the documentation sub-state
    pub fn documentation_status(mut self, status: DocumentationStatus) -> Self {
        self.documentation_status = Some(status);
        self
    }
}
