use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod health {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct Health {
        pub status: String,
        pub service: String,
    }
}

pub mod record {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum RecordKind {
        Income,
        Expense,
    }

    /// The PDF attached to a record.
    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct ReceiptView {
        pub id: i64,
        pub file_name: String,
        /// Where the file can be fetched from (e.g. `/uploads/<name>`).
        pub locator: String,
        pub mime_type: String,
        pub uploaded_by: i64,
        /// Hex SHA-256 of the file content.
        pub checksum: String,
        pub created_at: DateTime<Utc>,
        pub updated_at: DateTime<Utc>,
    }

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct RecordView {
        pub id: i64,
        pub kind: RecordKind,
        /// Amount formatted with two decimals, e.g. `"150.00"`.
        pub amount: String,
        pub amount_minor: i64,
        pub description: String,
        pub date: DateTime<Utc>,
        #[serde(rename = "type")]
        pub record_type: String,
        pub created_by: i64,
        pub created_at: DateTime<Utc>,
        pub updated_at: DateTime<Utc>,
        pub receipt: Option<ReceiptView>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct RecordList {
        pub records: Vec<RecordView>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct Message {
        pub message: String,
    }
}
