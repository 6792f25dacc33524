//! Record primitives.
//!
//! A [`Record`] is a bookkeeping entry (an income or an expense) backed by
//! exactly one uploaded [`Receipt`]. The record kind decides which set of
//! types is accepted: an income can be an `invoice` but never an
//! `operational` expense.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{EngineError, MoneyCents, Receipt, ResultEngine};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Income,
    Expense,
}

impl RecordKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncomeType {
    Invoice,
    Receipt,
    Transfer,
    DepositSlip,
}

impl IncomeType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Invoice => "invoice",
            Self::Receipt => "receipt",
            Self::Transfer => "transfer",
            Self::DepositSlip => "deposit_slip",
        }
    }
}

impl TryFrom<&str> for IncomeType {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "invoice" => Ok(Self::Invoice),
            "receipt" => Ok(Self::Receipt),
            "transfer" => Ok(Self::Transfer),
            "deposit_slip" => Ok(Self::DepositSlip),
            other => Err(EngineError::Validation(format!(
                "invalid income type: {other}"
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpenseType {
    Operational,
    Administrative,
    Personal,
    Extraordinary,
}

impl ExpenseType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Operational => "operational",
            Self::Administrative => "administrative",
            Self::Personal => "personal",
            Self::Extraordinary => "extraordinary",
        }
    }
}

impl TryFrom<&str> for ExpenseType {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "operational" => Ok(Self::Operational),
            "administrative" => Ok(Self::Administrative),
            "personal" => Ok(Self::Personal),
            "extraordinary" => Ok(Self::Extraordinary),
            other => Err(EngineError::Validation(format!(
                "invalid expense type: {other}"
            ))),
        }
    }
}

/// The type of a record, constrained by its kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordType {
    Income(IncomeType),
    Expense(ExpenseType),
}

impl RecordType {
    /// Parses `value` as a type valid for `kind`.
    pub fn parse(kind: RecordKind, value: &str) -> ResultEngine<Self> {
        let value = value.trim();
        if value.is_empty() {
            return Err(EngineError::Validation(format!("{kind} type is required")));
        }
        match kind {
            RecordKind::Income => IncomeType::try_from(value).map(Self::Income),
            RecordKind::Expense => ExpenseType::try_from(value).map(Self::Expense),
        }
    }

    pub fn kind(self) -> RecordKind {
        match self {
            Self::Income(_) => RecordKind::Income,
            Self::Expense(_) => RecordKind::Expense,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Income(t) => t.as_str(),
            Self::Expense(t) => t.as_str(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Database identifier, assigned on insert (always > 0 once persisted).
    pub id: i64,
    pub kind: RecordKind,
    pub amount: MoneyCents,
    pub description: String,
    pub date: DateTime<Utc>,
    pub record_type: RecordType,
    /// Creator of the record, immutable after creation.
    pub created_by: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub receipt: Option<Receipt>,
}

impl Record {
    /// Builds a validated, not yet persisted record.
    ///
    /// `date` defaults to `now` when unset.
    pub fn new(
        kind: RecordKind,
        amount: MoneyCents,
        description: &str,
        record_type: &str,
        date: Option<DateTime<Utc>>,
        created_by: i64,
        now: DateTime<Utc>,
    ) -> ResultEngine<Self> {
        let amount = validate_amount(kind, amount)?;
        let description = normalize_description(kind, description)?;
        let record_type = RecordType::parse(kind, record_type)?;
        if created_by <= 0 {
            return Err(EngineError::Validation(format!(
                "{kind} created_by is required"
            )));
        }
        Ok(Self {
            id: 0,
            kind,
            amount,
            description,
            date: date.unwrap_or(now),
            record_type,
            created_by,
            created_at: now,
            updated_at: now,
            deleted_at: None,
            receipt: None,
        })
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Creator-only authorization check.
    pub fn ensure_creator(&self, user_id: i64, action: &str) -> ResultEngine<()> {
        if self.created_by != user_id {
            return Err(EngineError::Forbidden(format!(
                "only the creator can {action} this {}",
                self.kind
            )));
        }
        Ok(())
    }
}

pub(crate) fn validate_amount(kind: RecordKind, amount: MoneyCents) -> ResultEngine<MoneyCents> {
    if !amount.is_positive() {
        return Err(EngineError::Validation(format!(
            "{kind} amount must be greater than 0"
        )));
    }
    Ok(amount)
}

pub(crate) fn normalize_description(kind: RecordKind, value: &str) -> ResultEngine<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EngineError::Validation(format!(
            "{kind} description is required"
        )));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expense(amount: i64, description: &str, ty: &str, created_by: i64) -> ResultEngine<Record> {
        Record::new(
            RecordKind::Expense,
            MoneyCents::new(amount),
            description,
            ty,
            None,
            created_by,
            Utc::now(),
        )
    }

    #[test]
    fn type_is_validated_per_kind() {
        assert_eq!(
            RecordType::parse(RecordKind::Income, "deposit_slip").unwrap(),
            RecordType::Income(IncomeType::DepositSlip)
        );
        assert_eq!(
            RecordType::parse(RecordKind::Expense, " personal ").unwrap(),
            RecordType::Expense(ExpenseType::Personal)
        );
        assert!(RecordType::parse(RecordKind::Expense, "invoice").is_err());
        assert!(RecordType::parse(RecordKind::Income, "operational").is_err());
        assert!(RecordType::parse(RecordKind::Income, "").is_err());
    }

    #[test]
    fn new_record_defaults_date_to_now() {
        let now = Utc::now();
        let record = Record::new(
            RecordKind::Income,
            MoneyCents::new(100),
            "Consulting",
            "invoice",
            None,
            3,
            now,
        )
        .unwrap();
        assert_eq!(record.date, now);
        assert_eq!(record.record_type.kind(), RecordKind::Income);
        assert!(!record.is_deleted());
    }

    #[test]
    fn new_record_rejects_bad_fields() {
        assert_eq!(
            expense(0, "Office supplies", "operational", 7),
            Err(EngineError::Validation(
                "expense amount must be greater than 0".to_string()
            ))
        );
        assert!(expense(-5, "Office supplies", "operational", 7).is_err());
        assert_eq!(
            expense(100, "   ", "operational", 7),
            Err(EngineError::Validation(
                "expense description is required".to_string()
            ))
        );
        assert!(expense(100, "Office supplies", "bogus", 7).is_err());
        assert!(expense(100, "Office supplies", "operational", 0).is_err());
    }

    #[test]
    fn only_creator_passes_authorization() {
        let record = expense(15000, "Office supplies", "operational", 7).unwrap();
        assert!(record.ensure_creator(7, "delete").is_ok());
        assert!(matches!(
            record.ensure_creator(9, "delete"),
            Err(EngineError::Forbidden(_))
        ));
    }
}
