//! Structured audit record produced from one directive on one invocation.

use crate::RecordId;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, IntoStaticStr};
use thiserror::Error;

/// Record errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordError {
    /// The final message was already set.
    #[error("record {id} already has a final message")]
    AlreadyFinalized {
        /// The record that was finalized twice.
        id: RecordId,
    },
}

/// One structured audit entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    /// Unique record identifier.
    pub id: RecordId,
    /// When the record was created.
    pub timestamp: DateTime<Utc>,
    /// Business object identifier.
    pub biz_id: Option<String>,
    /// Business object category.
    pub biz_type: Option<String>,
    /// Who performed the operation.
    pub operator_id: Option<String>,
    /// Free-form additional information.
    pub extra: Option<String>,
    /// Whether the operation completed without error.
    pub success: bool,
    /// Error text when the operation failed.
    pub exception_message: Option<String>,
    /// Wall-clock duration of the operation.
    pub execution_time_millis: i64,
    /// Rendered success/failure template.
    pub template_message: Option<String>,
    final_message: Option<String>,
}

impl Record {
    /// Create a pending record with a fresh id and the current time.
    pub fn new() -> Self {
        Self {
            id: RecordId::new(),
            timestamp: Utc::now(),
            biz_id: None,
            biz_type: None,
            operator_id: None,
            extra: None,
            success: true,
            exception_message: None,
            execution_time_millis: 0,
            template_message: None,
            final_message: None,
        }
    }

    /// Mark the record as failed.
    pub fn fail(&mut self, message: impl Into<String>) {
        self.success = false;
        self.exception_message = Some(message.into());
    }

    /// Set the final message. Only the first call succeeds.
    pub fn finalize(&mut self, message: String) -> Result<(), RecordError> {
        if self.final_message.is_some() {
            return Err(RecordError::AlreadyFinalized { id: self.id });
        }
        self.final_message = Some(message);
        Ok(())
    }

    /// Whether the final message has been set.
    pub fn is_finalized(&self) -> bool {
        self.final_message.is_some()
    }

    /// The final message, or an empty string before finalization.
    pub fn final_message(&self) -> &str {
        self.final_message.as_deref().unwrap_or_default()
    }

    /// Render one field's value. Missing values yield `None`.
    pub fn field_value(&self, field: RecordField) -> Option<String> {
        match field {
            RecordField::BizId => self.biz_id.clone(),
            RecordField::BizType => self.biz_type.clone(),
            RecordField::OperatorId => self.operator_id.clone(),
            RecordField::Extra => self.extra.clone(),
            RecordField::Success => Some(self.success.to_string()),
            RecordField::ExceptionMessage => self.exception_message.clone(),
            RecordField::ExecutionTimeMillis => Some(self.execution_time_millis.to_string()),
            RecordField::TemplateMessage => self.template_message.clone(),
            RecordField::Id => Some(self.id.to_string()),
            RecordField::Timestamp => {
                Some(self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true))
            }
        }
    }
}

impl Default for Record {
    fn default() -> Self {
        Self::new()
    }
}

/// Every record field except the final message, in rendering order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoStaticStr)]
#[strum(serialize_all = "camelCase")]
pub enum RecordField {
    /// `bizId`
    BizId,
    /// `bizType`
    BizType,
    /// `operatorId`
    OperatorId,
    /// `extra`
    Extra,
    /// `success`
    Success,
    /// `exceptionMessage`
    ExceptionMessage,
    /// `executionTimeMillis`
    ExecutionTimeMillis,
    /// `templateMessage`
    TemplateMessage,
    /// `id`
    Id,
    /// `timestamp`
    Timestamp,
}

impl RecordField {
    /// Fields in the order they appear in a rendered message.
    pub const ALL: [RecordField; 10] = [
        RecordField::BizId,
        RecordField::BizType,
        RecordField::OperatorId,
        RecordField::Extra,
        RecordField::Success,
        RecordField::ExceptionMessage,
        RecordField::ExecutionTimeMillis,
        RecordField::TemplateMessage,
        RecordField::Id,
        RecordField::Timestamp,
    ];

    /// The field's name as it appears in messages.
    pub fn name(&self) -> &'static str {
        self.into()
    }
}
