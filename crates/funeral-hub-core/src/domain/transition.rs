//! Transition table, guards and planners
//!
//! Each [`ActionKind`] maps to a [`TransitionRule`]. Guards run in a fixed
//! order: authorization, then state (business caps last), then payload. The
//! first failure wins. A validated [`Command`] is turned into a
//! [`TransitionPlan`] by a pure planner; nothing here touches storage.

use chrono::{DateTime, Utc};
use serde_json::json;

use super::action::{Action, ActionKind, NewProtocol};
use super::actor::{Actor, Role, RoleSlot, UserId};
use super::burial::{parse_date_or_timestamp, BurialProgressPatch, BurialStage};
use super::document::{DocumentKind, NewDocument, UploadedFile};
use super::notification::{EventKind, Notification, NotificationTarget};
use super::protocol::{
    BurialStatus, DocumentationStatus, Protocol, ProtocolMutation, ProtocolStatus,
};
use crate::CoreError;

/// Static preconditions of one action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionRule {
    pub action: ActionKind,
    pub role: Role,
    /// Slot the actor must be bound to; `None` for intake actions
    pub slot: Option<RoleSlot>,
    pub primary: ProtocolStatus,
    /// Allowed documentation sub-states; `None` means any
    pub documentation: Option<&'static [DocumentationStatus]>,
}

const DRAFT_SOURCES: &[DocumentationStatus] = &[
    DocumentationStatus::AwaitingDraft,
    DocumentationStatus::AwaitingCorrection,
];
const APPROVAL_SOURCES: &[DocumentationStatus] = &[DocumentationStatus::AwaitingDeclarantApproval];
const ISSUANCE_SOURCES: &[DocumentationStatus] =
    &[DocumentationStatus::AwaitingCertificateIssuance];
const PICKUP_SOURCES: &[DocumentationStatus] = &[DocumentationStatus::AwaitingCertificatePickup];

/// Look up the rule for an action
pub fn rule_for(action: ActionKind) -> TransitionRule {
    let (role, slot, primary, documentation) = match action {
        ActionKind::ConfirmValidation => {
            (Role::Intake, None, ProtocolStatus::AwaitingValidation, None)
        }
        ActionKind::DesignateStakeholders => {
            (Role::Intake, None, ProtocolStatus::AwaitingAttendance, None)
        }
        ActionKind::SubmitFaf => (Role::Intake, None, ProtocolStatus::AwaitingFafSignatures, None),
        ActionKind::UpdateBurialProgress => (
            Role::FuneralHome,
            Some(RoleSlot::FuneralHome),
            ProtocolStatus::ParallelExecution,
            None,
        ),
        ActionKind::SubmitDraft => (
            Role::Notary,
            Some(RoleSlot::Notary),
            ProtocolStatus::ParallelExecution,
            Some(DRAFT_SOURCES),
        ),
        ActionKind::AcceptDraft | ActionKind::RejectDraft => (
            Role::Declarant,
            Some(RoleSlot::Declarant),
            ProtocolStatus::ParallelExecution,
            Some(APPROVAL_SOURCES),
        ),
        ActionKind::SetPickupPrediction => (
            Role::Notary,
            Some(RoleSlot::Notary),
            ProtocolStatus::ParallelExecution,
            Some(ISSUANCE_SOURCES),
        ),
        ActionKind::AttachFinalCertificate => (
            Role::Notary,
            Some(RoleSlot::Notary),
            ProtocolStatus::ParallelExecution,
            Some(PICKUP_SOURCES),
        ),
    };
    TransitionRule {
        action,
        role,
        slot,
        primary,
        documentation,
    }
}

/// Authorization guard: role match, then slot binding
pub fn authorize(rule: &TransitionRule, protocol: &Protocol, actor: &Actor) -> Result<(), CoreError> {
    if actor.role != rule.role {
        return Err(CoreError::Forbidden(format!(
            "Only {} may {}",
            rule.role, rule.action
        )));
    }

    let bound = match rule.slot {
        None => return Ok(()),
        Some(RoleSlot::FuneralHome) => protocol.funeral_home_id,
        Some(RoleSlot::Notary) => protocol.notary_id,
        Some(RoleSlot::Declarant) => protocol.declarant_id,
    };
    if bound != Some(actor.id) {
        return Err(CoreError::Forbidden(format!(
            "{} is not the {} designated for protocol {}",
            actor,
            rule.role,
            protocol.id.short()
        )));
    }
    Ok(())
}

/// State guard; the rejection cap is checked last
pub fn check_state(
    rule: &TransitionRule,
    protocol: &Protocol,
    rejection_cap: u32,
) -> Result<(), CoreError> {
    if protocol.status != rule.primary {
        return Err(CoreError::InvalidTransition(format!(
            "{} requires protocol state '{}', but it is '{}'",
            rule.action, rule.primary, protocol.status
        )));
    }

    if let Some(allowed) = rule.documentation {
        if !allowed.contains(&protocol.documentation_status) {
            let expected: Vec<&str> = allowed.iter().map(|s| s.as_str()).collect();
            return Err(CoreError::InvalidTransition(format!(
                "{} requires documentation state in [{}], but it is '{}'",
                rule.action,
                expected.join(", "),
                protocol.documentation_status
            )));
        }
    }

    if rule.action == ActionKind::RejectDraft && protocol.draft_rejection_count >= rejection_cap {
        return Err(CoreError::BusinessLimitExceeded(format!(
            "Draft rejection limit of {} per protocol already reached",
            rejection_cap
        )));
    }
    Ok(())
}

/// Action with a validated payload
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    ConfirmValidation,
    DesignateStakeholders {
        funeral_home_id: UserId,
        notary_id: UserId,
        declarant_id: Option<UserId>,
    },
    SubmitFaf(UploadedFile),
    UpdateBurialProgress(BurialProgressPatch),
    SubmitDraft(UploadedFile),
    AcceptDraft,
    RejectDraft { remarks: String },
    SetPickupPrediction(DateTime<Utc>),
    AttachFinalCertificate(UploadedFile),
}

/// Payload guard
pub fn validate_payload(action: &Action) -> Result<Command, CoreError> {
    match action {
        Action::ConfirmValidation => Ok(Command::ConfirmValidation),
        Action::DesignateStakeholders {
            funeral_home_id,
            notary_id,
            declarant_id,
        } => match (funeral_home_id, notary_id) {
            (Some(funeral_home_id), Some(notary_id)) => Ok(Command::DesignateStakeholders {
                funeral_home_id: *funeral_home_id,
                notary_id: *notary_id,
                declarant_id: *declarant_id,
            }),
            _ => Err(CoreError::InvalidPayload(
                "Funeral home and notary ids are required".to_string(),
            )),
        },
        Action::SubmitFaf { file } => required_file(file, "FAF form").map(Command::SubmitFaf),
        Action::UpdateBurialProgress { fields } => {
            BurialProgressPatch::from_fields(fields).map(Command::UpdateBurialProgress)
        }
        Action::SubmitDraft { file } => required_file(file, "Draft").map(Command::SubmitDraft),
        Action::AcceptDraft => Ok(Command::AcceptDraft),
        Action::RejectDraft { remarks } => match remarks.as_deref().map(str::trim) {
            Some(remarks) if !remarks.is_empty() => Ok(Command::RejectDraft {
                remarks: remarks.to_string(),
            }),
            _ => Err(CoreError::InvalidPayload(
                "Remarks are required to reject a draft".to_string(),
            )),
        },
        Action::SetPickupPrediction { predicted_for } => predicted_for
            .as_deref()
            .map(str::trim)
            .and_then(parse_date_or_timestamp)
            .map(Command::SetPickupPrediction)
            .ok_or_else(|| {
                CoreError::InvalidPayload("A valid pickup prediction date is required".to_string())
            }),
        Action::AttachFinalCertificate { file } => {
            required_file(file, "Final certificate").map(Command::AttachFinalCertificate)
        }
    }
}

fn required_file(file: &Option<UploadedFile>, label: &str) -> Result<UploadedFile, CoreError> {
    let file = file
        .as_ref()
        .ok_or_else(|| CoreError::InvalidPayload(format!("{} file is required", label)))?;
    file.validate(label)?;
    Ok(file.clone())
}

/// Run every guard for `action` in order
pub fn evaluate_guards(
    protocol: &Protocol,
    action: &Action,
    actor: &Actor,
    rejection_cap: u32,
) -> Result<Command, CoreError> {
    let rule = rule_for(action.kind());
    authorize(&rule, protocol, actor)?;
    check_state(&rule, protocol, rejection_cap)?;
    let command = validate_payload(action)?;
    check_command(protocol, &command)?;
    Ok(command)
}

/// Guards that need both the protocol and the validated payload.
///
/// A performed burial is final: later patches may still fill in details but
/// cannot move the stage back.
pub fn check_command(protocol: &Protocol, command: &Command) -> Result<(), CoreError> {
    if let Command::UpdateBurialProgress(patch) = command {
        let regressed = patch
            .burial_stage
            .map_or(false, |stage| stage != BurialStage::Performed);
        if protocol.burial_status == BurialStatus::Done && regressed {
            return Err(CoreError::InvalidTransition(format!(
                "Burial of protocol {} was already performed",
                protocol.id.short()
            )));
        }
    }
    Ok(())
}

/// Everything a transition writes and announces
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionPlan {
    pub mutation: ProtocolMutation,
    pub document: Option<NewDocument>,
    pub burial_patch: Option<BurialProgressPatch>,
    pub notifications: Vec<Notification>,
}

impl TransitionPlan {
    fn new(mutation: ProtocolMutation) -> Self {
        Self {
            mutation,
            document: None,
            burial_patch: None,
            notifications: Vec::new(),
        }
    }

    fn with_document(mut self, document: NewDocument) -> Self {
        self.document = Some(document);
        self
    }

    fn notify_user(mut self, user: Option<UserId>, kind: EventKind, message: String) -> Self {
        if let Some(user) = user {
            self.notifications.push(Notification::new(
                NotificationTarget::User(user),
                kind,
                json!({ "message": message }),
            ));
        }
        self
    }

    fn notify_target(mut self, target: Option<NotificationTarget>, kind: EventKind, message: String) -> Self {
        if let Some(target) = target {
            self.notifications
                .push(Notification::new(target, kind, json!({ "message": message })));
        }
        self
    }
}

/// Plan the effects of a validated command against the locked protocol
pub fn plan(protocol: &Protocol, command: Command, now: DateTime<Utc>) -> TransitionPlan {
    let short = protocol.id.short();
    let touch = ProtocolMutation::touch(now);
    let group_channel = protocol.group_id.map(NotificationTarget::group);

    let plan = match command {
        Command::ConfirmValidation => {
            TransitionPlan::new(touch.status(ProtocolStatus::AwaitingAttendance))
        }
        Command::DesignateStakeholders {
            funeral_home_id,
            notary_id,
            declarant_id,
        } => {
            let mut mutation = touch.status(ProtocolStatus::AwaitingFafSignatures);
            mutation.funeral_home_id = Some(funeral_home_id);
            mutation.notary_id = Some(notary_id);
            mutation.declarant_id = declarant_id;
            let message = format!("You were designated on protocol #{}.", short);
            TransitionPlan::new(mutation)
                .notify_user(Some(funeral_home_id), EventKind::StakeholdersDesignated, message.clone())
                .notify_user(Some(notary_id), EventKind::StakeholdersDesignated, message)
        }
        Command::SubmitFaf(file) => {
            let mutation = touch
                .status(ProtocolStatus::ParallelExecution)
                .documentation_status(DocumentationStatus::AwaitingDraft)
                .burial_status(BurialStatus::InProgress);
            let message = format!("Protocol #{} is now in parallel execution.", short);
            TransitionPlan::new(mutation)
                .with_document(NewDocument::new(protocol.id, DocumentKind::Faf, file, now))
                .notify_user(protocol.funeral_home_id, EventKind::ParallelExecutionStarted, message.clone())
                .notify_user(protocol.notary_id, EventKind::ParallelExecutionStarted, message.clone())
                .notify_user(protocol.declarant_id, EventKind::ParallelExecutionStarted, message)
        }
        Command::UpdateBurialProgress(patch) => {
            let mut mutation = touch;
            if patch.marks_burial_complete() {
                mutation.burial_status = Some(BurialStatus::Done);
            }
            let mut plan = TransitionPlan::new(mutation).notify_target(
                group_channel,
                EventKind::BurialProgressUpdated,
                format!("Burial progress updated on protocol #{}.", short),
            );
            plan.burial_patch = Some(patch);
            plan
        }
        Command::SubmitDraft(file) => TransitionPlan::new(
            touch.documentation_status(DocumentationStatus::AwaitingDeclarantApproval),
        )
        .with_document(NewDocument::new(protocol.id, DocumentKind::Draft, file, now))
        .notify_user(
            protocol.declarant_id,
            EventKind::DraftAwaitingApproval,
            format!("The certificate draft of protocol #{} awaits your approval.", short),
        ),
        Command::AcceptDraft => TransitionPlan::new(
            touch.documentation_status(DocumentationStatus::AwaitingCertificateIssuance),
        )
        .notify_user(
            protocol.notary_id,
            EventKind::DraftAccepted,
            format!("The declarant accepted the draft of protocol #{}.", short),
        ),
        Command::RejectDraft { remarks } => {
            let mut mutation =
                touch.documentation_status(DocumentationStatus::AwaitingCorrection);
            mutation.increment_draft_rejections = true;
            mutation.draft_rejection_remarks = Some(remarks.clone());
            let mut plan = TransitionPlan::new(mutation);
            if let Some(notary) = protocol.notary_id {
                plan.notifications.push(Notification::new(
                    NotificationTarget::User(notary),
                    EventKind::DraftRejected,
                    json!({
                        "message": format!("The declarant rejected the draft of protocol #{}.", short),
                        "remarks": remarks,
                    }),
                ));
            }
            plan
        }
        Command::SetPickupPrediction(at) => {
            let mut mutation =
                touch.documentation_status(DocumentationStatus::AwaitingCertificatePickup);
            mutation.pickup_predicted_at = Some(at);
            TransitionPlan::new(mutation).notify_user(
                protocol.declarant_id,
                EventKind::PickupPredictionSet,
                format!(
                    "The certificate of protocol #{} is predicted for pickup on {}.",
                    short,
                    at.format("%Y-%m-%d")
                ),
            )
        }
        Command::AttachFinalCertificate(file) => {
            TransitionPlan::new(touch.documentation_status(DocumentationStatus::Done))
                .with_document(NewDocument::new(
                    protocol.id,
                    DocumentKind::FinalCertificate,
                    file,
                    now,
                ))
                .notify_user(
                    protocol.declarant_id,
                    EventKind::FinalCertificateAttached,
                    format!("The final certificate of protocol #{} is available.", short),
                )
        }
    };

    with_protocol_id(plan, protocol)
}

fn with_protocol_id(mut plan: TransitionPlan, protocol: &Protocol) -> TransitionPlan {
    for notification in &mut plan.notifications {
        if let Some(body) = notification.payload.as_object_mut() {
            body.insert("protocol_id".to_string(), json!(protocol.id.to_string()));
        }
    }
    plan
}

/// Validated creation request
#[derive(Debug, Clone, PartialEq)]
pub struct CreationPlan {
    pub protocol: Protocol,
    pub documents: Vec<NewDocument>,
    pub notifications: Vec<Notification>,
}

/// Guard and plan protocol creation
pub fn plan_creation(
    actor: &Actor,
    request: NewProtocol,
    now: DateTime<Utc>,
) -> Result<CreationPlan, CoreError> {
    if actor.role != Role::Intake {
        return Err(CoreError::Forbidden(format!(
            "Only {} may create protocols",
            Role::Intake
        )));
    }

    let declaration = request.death_declaration.ok_or_else(|| {
        CoreError::InvalidPayload("The death declaration upload is required".to_string())
    })?;
    declaration.validate("Death declaration")?;
    for file in &request.supporting_documents {
        file.validate("Supporting document")?;
    }

    let deceased = request.deceased;
    if deceased.full_name.trim().is_empty() {
        return Err(CoreError::InvalidPayload(
            "The deceased's full name is required".to_string(),
        ));
    }
    if deceased.birth_date > now.date_naive() {
        return Err(CoreError::InvalidPayload(
            "The birth date cannot be in the future".to_string(),
        ));
    }
    if let Some(death_at) = request.death_at {
        if death_at >= now {
            return Err(CoreError::InvalidPayload(
                "The date of death must be in the past".to_string(),
            ));
        }
        if death_at.date_naive() < deceased.birth_date {
            return Err(CoreError::InvalidPayload(
                "The date of death precedes the birth date".to_string(),
            ));
        }
    }
    if let Some(burial_at) = request.burial_scheduled_at {
        if burial_at <= now {
            return Err(CoreError::InvalidPayload(
                "The scheduled burial date must be in the future".to_string(),
            ));
        }
    }

    let group_id = request.group_id.or(actor.group_id).ok_or_else(|| {
        CoreError::InvalidPayload("An intake group is required".to_string())
    })?;

    let mut protocol = Protocol::new(actor.id, Some(group_id), deceased, now);
    protocol.death_at = request.death_at;
    protocol.burial_scheduled_at = request.burial_scheduled_at;
    protocol.declarant_id = request.declarant_id;

    let mut documents = vec![NewDocument::new(
        protocol.id,
        DocumentKind::DeathDeclaration,
        declaration,
        now,
    )];
    documents.extend(
        request
            .supporting_documents
            .into_iter()
            .map(|file| NewDocument::new(protocol.id, DocumentKind::Supporting, file, now)),
    );

    let short = protocol.id.short();
    let plan = TransitionPlan::new(ProtocolMutation::touch(now))
        .notify_target(
            Some(NotificationTarget::group(group_id)),
            EventKind::NewProtocolAwaitingValidation,
            format!("New protocol #{} awaiting your validation.", short),
        )
        .notify_user(
            protocol.declarant_id,
            EventKind::ProtocolCreated,
            "A protocol was opened for you. Follow its progress.".to_string(),
        );
    let plan = with_protocol_id(plan, &protocol);

    Ok(CreationPlan {
        protocol,
        documents,
        notifications: plan.notifications,
    })
}
