use crate::domain::{
    actor::{GroupId, UserId},
    document::UploadedFile,
    protocol::Deceased,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Action requested against an existing protocol, with its raw payload.
///
/// Payload fields are optional here; presence and shape are checked by the
/// payload guard, after authorization and state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    ConfirmValidation,
    DesignateStakeholders {
        funeral_home_id: Option<UserId>,
        notary_id: Option<UserId>,
        #[serde(default)]
        declarant_id: Option<UserId>,
    },
    SubmitFaf {
        file: Option<UploadedFile>,
    },
    UpdateBurialProgress {
        #[serde(default)]
        fields: Map<String, Value>,
    },
    SubmitDraft {
        file: Option<UploadedFile>,
    },
    AcceptDraft,
    RejectDraft {
        remarks: Option<String>,
    },
    SetPickupPrediction {
        predicted_for: Option<String>,
    },
    AttachFinalCertificate {
        file: Option<UploadedFile>,
    },
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::ConfirmValidation => ActionKind::ConfirmValidation,
            Action::DesignateStakeholders { .. } => ActionKind::DesignateStakeholders,
            Action::SubmitFaf { .. } => ActionKind::SubmitFaf,
            Action::UpdateBurialProgress { .. } => ActionKind::UpdateBurialProgress,
            Action::SubmitDraft { .. } => ActionKind::SubmitDraft,
            Action::AcceptDraft => ActionKind::AcceptDraft,
            Action::RejectDraft { .. } => ActionKind::RejectDraft,
            Action::SetPickupPrediction { .. } => ActionKind::SetPickupPrediction,
            Action::AttachFinalCertificate { .. } => ActionKind::AttachFinalCertificate,
        }
    }
}

/// Payload-free discriminant of [`Action`], used as the transition table key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    ConfirmValidation,
    DesignateStakeholders,
    SubmitFaf,
    UpdateBurialProgress,
    SubmitDraft,
    AcceptDraft,
    RejectDraft,
    SetPickupPrediction,
    AttachFinalCertificate,
}

impl ActionKind {
    pub const ALL: [ActionKind; 9] = [
        ActionKind::ConfirmValidation,
        ActionKind::DesignateStakeholders,
        ActionKind::SubmitFaf,
        ActionKind::UpdateBurialProgress,
        ActionKind::SubmitDraft,
        ActionKind::AcceptDraft,
        ActionKind::RejectDraft,
        ActionKind::SetPickupPrediction,
        ActionKind::AttachFinalCertificate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::ConfirmValidation => "confirm_validation",
            ActionKind::DesignateStakeholders => "designate_stakeholders",
            ActionKind::SubmitFaf => "submit_faf",
            ActionKind::UpdateBurialProgress => "update_burial_progress",
            ActionKind::SubmitDraft => "submit_draft",
            ActionKind::AcceptDraft => "accept_draft",
            ActionKind::RejectDraft => "reject_draft",
            ActionKind::SetPickupPrediction => "set_pickup_prediction",
            ActionKind::AttachFinalCertificate => "attach_final_certificate",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Data supplied by intake when opening a protocol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProtocol {
    pub deceased: Deceased,
    pub death_at: Option<DateTime<Utc>>,
    pub burial_scheduled_at: Option<DateTime<Utc>>,
    /// Falls back to the creating actor's group
    #[serde(default)]
    pub group_id: Option<GroupId>,
    #[serde(default)]
    pub declarant_id: Option<UserId>,
    /// Mandatory death declaration
    pub death_declaration: Option<UploadedFile>,
    #[serde(default)]
    pub supporting_documents: Vec<UploadedFile>,
}
