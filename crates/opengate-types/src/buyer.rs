//! Buyer contact details captured before payment.
//!
//! Serialized camelCase because this record is stored verbatim as the
//! order's guest info and consumed by the outer application in that shape.

use serde::{Deserialize, Serialize};

use crate::{OpengateError, Result};

/// The six mandatory contact fields collected at the BUYER_INFO stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuyerInfo {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub city: String,
    pub country: String,
}

impl BuyerInfo {
    /// Validate that every mandatory field is present and plausible.
    ///
    /// # Errors
    /// Returns `MissingBuyerField` naming the first blank field, or
    /// `InvalidBuyerInfo` for a malformed email.
    pub fn validate(&self) -> Result<()> {
        // 1. Every field must be non-blank after trimming
        for (field, value) in [
            ("firstName", &self.first_name),
            ("lastName", &self.last_name),
            ("email", &self.email),
            ("phone", &self.phone),
            ("city", &self.city),
            ("country", &self.country),
        ] {
            if value.trim().is_empty() {
                return Err(OpengateError::MissingBuyerField {
                    field: field.to_string(),
                });
            }
        }

        // 2. Minimal email shape check
        if !self.email.contains('@') {
            return Err(OpengateError::InvalidBuyerInfo {
                reason: format!("email {:?} has no @", self.email),
            });
        }

        Ok(())
    }

    /// Display name for receipts and logs.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
    }
}

/// Test helpers.
#[cfg(any(test, feature = "test-helpers"))]
impl BuyerInfo {
    pub fn dummy() -> Self {
        Self {
            first_name: "Ana".to_string(),
            last_name: "Rokodovu".to_string(),
            email: "ana@example.com".to_string(),
            phone: "+679 555 0101".to_string(),
            city: "Suva".to_string(),
            country: "Fiji".to_string(),
        }
    }
}
