use crate::{domain::protocol::ProtocolId, CoreError};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Stage of the burial itself, reported by the funeral home
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BurialStage {
    Scheduled,
    InProgress,
    Performed,
}

impl BurialStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            BurialStage::Scheduled => "scheduled",
            BurialStage::InProgress => "in_progress",
            BurialStage::Performed => "performed",
        }
    }
}

impl fmt::Display for BurialStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BurialStage {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(BurialStage::Scheduled),
            "in_progress" => Ok(BurialStage::InProgress),
            "performed" => Ok(BurialStage::Performed),
            other => Err(CoreError::InvalidPayload(format!(
                "Unknown burial stage: {}",
                other
            ))),
        }
    }
}

/// Burial logistics record, one per protocol
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BurialProgress {
    pub protocol_id: ProtocolId,
    pub body_retrieved_at: Option<DateTime<Utc>>,
    pub body_removed: bool,
    pub wake_arrival_at: Option<DateTime<Utc>>,
    pub burial_stage: Option<BurialStage>,
    pub burial_completed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl BurialProgress {
    /// Empty record, as created by the first upsert
    pub fn empty(protocol_id: ProtocolId, now: DateTime<Utc>) -> Self {
        Self {
            protocol_id,
            body_retrieved_at: None,
            body_removed: false,
            wake_arrival_at: None,
            burial_stage: None,
            burial_completed_at: None,
            updated_at: now,
        }
    }

    /// Overlay the fields present in `patch`
    pub fn merged(&self, patch: &BurialProgressPatch, now: DateTime<Utc>) -> Self {
        let mut next = self.clone();
        if let Some(at) = patch.body_retrieved_at {
            next.body_retrieved_at = Some(at);
        }
        if let Some(removed) = patch.body_removed {
            next.body_removed = removed;
        }
        if let Some(at) = patch.wake_arrival_at {
            next.wake_arrival_at = Some(at);
        }
        if let Some(stage) = patch.burial_stage {
            next.burial_stage = Some(stage);
        }
        if let Some(at) = patch.burial_completed_at {
            next.burial_completed_at = Some(at);
        }
        next.updated_at = now;
        next
    }
}

/// Partial update over the burial progress allow-list
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BurialProgressPatch {
    pub body_retrieved_at: Option<DateTime<Utc>>,
    pub body_removed: Option<bool>,
    pub wake_arrival_at: Option<DateTime<Utc>>,
    pub burial_stage: Option<BurialStage>,
    pub burial_completed_at: Option<DateTime<Utc>>,
}

impl BurialProgressPatch {
    /// Field names accepted from callers
    pub const ALLOWED_FIELDS: [&'static str; 5] = [
        "body_retrieved_at",
        "body_removed",
        "wake_arrival_at",
        "burial_stage",
        "burial_completed_at",
    ];

    /// Build a patch from loosely typed fields.
    ///
    /// Any key outside [`Self::ALLOWED_FIELDS`] is rejected, as is a patch
    /// that sets nothing. `null` values are treated as absent.
    pub fn from_fields(fields: &Map<String, Value>) -> Result<Self, CoreError> {
        let mut patch = BurialProgressPatch::default();

        for (key, value) in fields {
            if value.is_null() {
                continue;
            }
            match key.as_str() {
                "body_retrieved_at" => patch.body_retrieved_at = Some(parse_timestamp(key, value)?),
                "body_removed" => {
                    patch.body_removed = Some(value.as_bool().ok_or_else(|| {
                        CoreError::InvalidPayload(format!("{} must be a boolean", key))
                    })?)
                }
                "wake_arrival_at" => patch.wake_arrival_at = Some(parse_timestamp(key, value)?),
                "burial_stage" => {
                    let stage = value.as_str().ok_or_else(|| {
                        CoreError::InvalidPayload(format!("{} must be a string", key))
                    })?;
                    patch.burial_stage = Some(stage.parse()?);
                }
                "burial_completed_at" => {
                    patch.burial_completed_at = Some(parse_timestamp(key, value)?)
                }
                other => {
                    return Err(CoreError::InvalidPayload(format!(
                        "Field '{}' cannot be updated on burial progress",
                        other
                    )))
                }
            }
        }

        if patch.is_empty() {
            return Err(CoreError::InvalidPayload(
                "No burial progress fields were provided".to_string(),
            ));
        }
        Ok(patch)
    }

    pub fn is_empty(&self) -> bool {
        *self == BurialProgressPatch::default()
    }

    /// Whether applying this patch means the burial has been performed
    pub fn marks_burial_complete(&self) -> bool {
        self.burial_stage == Some(BurialStage::Performed)
    }
}

/// Parse an RFC 3339 timestamp or a bare `YYYY-MM-DD` date (midnight UTC)
pub fn parse_date_or_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Some(at.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn parse_timestamp(key: &str, value: &Value) -> Result<DateTime<Utc>, CoreError> {
    value
        .as_str()
        .and_then(parse_date_or_timestamp)
        .ok_or_else(|| CoreError::InvalidPayload(format!("{} must be a valid date", key)))
}
