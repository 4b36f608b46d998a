//! Status conditions recorded on a ComponentDetectionQuery

use chrono::{SecondsFormat, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::ErrorTag;

/// Written before any analysis starts
pub const PROCESSING: &str = "Processing";
/// Terminal condition; `status` tells success from failure
pub const COMPLETED: &str = "Completed";

pub const REASON_SUCCESS: &str = "Success";
pub const REASON_OK: &str = "OK";
pub const REASON_NO_COMPONENTS: &str = "NoComponents";

pub const MSG_PROCESSING: &str = "ComponentDetectionQuery is processing";
pub const MSG_FINISHED: &str = "ComponentDetectionQuery has successfully finished";
pub const MSG_NO_COMPONENTS: &str =
    "ComponentDetectionQuery has successfully finished, no components detected";
pub const MSG_FAILED_PREFIX: &str = "ComponentDetectionQuery failed: ";

#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq, JsonSchema)]
pub enum ConditionStatus {
    True,
    False,
    Unknown,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CdqCondition {
    #[serde(rename = "type")]
    pub type_: String,
    pub status: ConditionStatus,
    pub reason: String,
    pub message: String,
    pub last_transition_time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
}

/// How a detection ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalOutcome {
    Succeeded { components: usize },
    Failed { tag: ErrorTag, message: String },
}

impl CdqCondition {
    pub fn processing(generation: i64) -> Self {
        Self::new(
            PROCESSING,
            ConditionStatus::True,
            REASON_SUCCESS,
            MSG_PROCESSING.to_string(),
            generation,
        )
    }

    pub fn terminal(generation: i64, outcome: &TerminalOutcome) -> Self {
        match outcome {
            TerminalOutcome::Succeeded { components: 0 } => Self::new(
                COMPLETED,
                ConditionStatus::True,
                REASON_NO_COMPONENTS,
                MSG_NO_COMPONENTS.to_string(),
                generation,
            ),
            TerminalOutcome::Succeeded { .. } => Self::new(
                COMPLETED,
                ConditionStatus::True,
                REASON_OK,
                MSG_FINISHED.to_string(),
                generation,
            ),
            TerminalOutcome::Failed { tag, message } => Self::new(
                COMPLETED,
                ConditionStatus::False,
                tag.as_str(),
                format!("{MSG_FAILED_PREFIX}{message}"),
                generation,
            ),
        }
    }

    fn new(
        type_: &str,
        status: ConditionStatus,
        reason: &str,
        message: String,
        generation: i64,
    ) -> Self {
        Self {
            type_: type_.to_string(),
            status,
            reason: reason.to_string(),
            message,
            last_transition_time: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            observed_generation: Some(generation),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.type_ == COMPLETED
    }
}
