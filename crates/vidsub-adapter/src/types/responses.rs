/*
[INPUT]:  Task service schema definitions and serde requirements
[OUTPUT]: Typed response envelope with success/failure decoding
[POS]:    Data layer - type definitions for API communication
[UPDATE]: When API schema changes or new types added
*/

use serde::{Deserialize, Serialize};

use crate::http::{AdapterError, Result};

/// Success code carried by every envelope the service returns.
pub const SUCCESS_CODE: i32 = 0;

/// `{code, msg, data}` wrapper around every task service response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    pub code: i32,
    #[serde(default)]
    pub msg: String,
    pub data: Option<T>,
}

impl<T> ApiEnvelope<T> {
    pub fn is_success(&self) -> bool {
        self.code == SUCCESS_CODE
    }

    /// Data of a successful envelope; `null` data is a protocol violation.
    pub fn into_data(self) -> Result<T> {
        match self.into_optional()? {
            Some(data) => Ok(data),
            None => Err(AdapterError::InvalidResponse(
                "success envelope without data".to_string(),
            )),
        }
    }

    /// Data of a successful envelope for commands that may return nothing.
    pub fn into_optional(self) -> Result<Option<T>> {
        if self.is_success() {
            Ok(self.data)
        } else {
            Err(AdapterError::Api {
                code: self.code,
                message: self.msg,
            })
        }
    }
}
