//! Command structs for engine operations.
//!
//! These types group parameters for write operations (create/update),
//! keeping call sites readable and avoiding long argument lists.

use chrono::{DateTime, Utc};

use crate::MoneyCents;

/// An uploaded receipt file, as received from the caller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReceiptUpload {
    /// Name declared by the uploader; only its extension is trusted.
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl ReceiptUpload {
    #[must_use]
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: bytes.into(),
        }
    }
}

/// Create a record together with its receipt.
#[derive(Clone, Debug)]
pub struct CreateRecordCmd {
    pub amount: MoneyCents,
    pub description: String,
    pub record_type: String,
    /// Defaults to the creation time when unset.
    pub date: Option<DateTime<Utc>>,
    pub created_by: i64,
    /// Required: a record cannot exist without its receipt.
    pub receipt: Option<ReceiptUpload>,
}

impl CreateRecordCmd {
    #[must_use]
    pub fn new(
        amount: MoneyCents,
        description: impl Into<String>,
        record_type: impl Into<String>,
        created_by: i64,
    ) -> Self {
        Self {
            amount,
            description: description.into(),
            record_type: record_type.into(),
            date: None,
            created_by,
            receipt: None,
        }
    }

    #[must_use]
    pub fn date(mut self, date: DateTime<Utc>) -> Self {
        self.date = Some(date);
        self
    }

    #[must_use]
    pub fn receipt(mut self, receipt: ReceiptUpload) -> Self {
        self.receipt = Some(receipt);
        self
    }
}

/// Sparse patch of the mutable record fields.
///
/// `None` leaves the field unchanged; a present value is validated like on
/// creation, so a record can never be patched into an invalid state.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RecordPatch {
    pub amount: Option<MoneyCents>,
    pub description: Option<String>,
    pub record_type: Option<String>,
    pub date: Option<DateTime<Utc>>,
}

impl RecordPatch {
    #[must_use]
    pub fn amount(mut self, amount: MoneyCents) -> Self {
        self.amount = Some(amount);
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn record_type(mut self, record_type: impl Into<String>) -> Self {
        self.record_type = Some(record_type.into());
        self
    }

    #[must_use]
    pub fn date(mut self, date: DateTime<Utc>) -> Self {
        self.date = Some(date);
        self
    }
}

/// Update a record and, optionally, replace its receipt file.
#[derive(Clone, Debug)]
pub struct UpdateRecordCmd {
    pub id: i64,
    pub patch: RecordPatch,
    pub receipt: Option<ReceiptUpload>,
    /// Acting user, must be the record creator.
    pub user_id: i64,
}

impl UpdateRecordCmd {
    #[must_use]
    pub fn new(id: i64, user_id: i64) -> Self {
        Self {
            id,
            patch: RecordPatch::default(),
            receipt: None,
            user_id,
        }
    }

    #[must_use]
    pub fn patch(mut self, patch: RecordPatch) -> Self {
        self.patch = patch;
        self
    }

    #[must_use]
    pub fn receipt(mut self, receipt: ReceiptUpload) -> Self {
        self.receipt = Some(receipt);
        self
    }
}
