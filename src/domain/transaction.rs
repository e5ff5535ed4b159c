//! Ledger transaction records and input parsing.

use chrono::{Datelike, NaiveDate};

use crate::domain::error::StockCardError;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse a `YYYY-MM-DD` calendar date.
pub fn parse_date(value: &str) -> Result<NaiveDate, StockCardError> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).map_err(|_| {
        StockCardError::InvalidDate {
            value: value.to_string(),
        }
    })
}

/// Parse a whole, non-negative quantity. Blank input counts as zero.
pub fn parse_quantity(field: &str, value: &str) -> Result<i64, StockCardError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(0);
    }
    match trimmed.parse::<i64>() {
        Ok(q) if q >= 0 => Ok(q),
        _ => Err(StockCardError::InvalidQuantity {
            field: field.to_string(),
            value: value.to_string(),
        }),
    }
}

/// Unvalidated transaction input as typed by a user.
#[derive(Debug, Clone, Default)]
pub struct RawTransaction {
    pub date: String,
    pub reference: String,
    pub receipt_qty: String,
    pub issue_qty: String,
    pub issue_office: String,
    pub days_to_consume: String,
}

/// A transaction that has not been assigned an id yet.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NewTransaction {
    pub date: NaiveDate,
    pub reference: String,
    pub receipt_qty: i64,
    pub issue_qty: i64,
    pub issue_office: String,
    pub days_to_consume: i64,
}

impl NewTransaction {
    pub fn from_raw(raw: &RawTransaction) -> Result<Self, StockCardError> {
        Ok(Self {
            date: parse_date(&raw.date)?,
            reference: raw.reference.trim().to_string(),
            receipt_qty: parse_quantity("receipt_qty", &raw.receipt_qty)?,
            issue_qty: parse_quantity("issue_qty", &raw.issue_qty)?,
            issue_office: raw.issue_office.trim().to_string(),
            days_to_consume: parse_quantity("days_to_consume", &raw.days_to_consume)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Transaction {
    pub id: String,
    pub stock_card_id: String,
    /// Per-card insertion counter; breaks ties between equal dates.
    pub seq: i64,
    pub date: NaiveDate,
    pub month: Option<u32>,
    pub year: Option<i32>,
    pub reference: String,
    pub receipt_qty: i64,
    pub issue_qty: i64,
    pub issue_office: String,
    pub balance_qty: i64,
    pub days_to_consume: i64,
}

impl Transaction {
    /// Build a persisted-shape transaction. The balance is left at zero until
    /// the ledger is recomputed.
    pub fn from_new(id: String, stock_card_id: String, seq: i64, new: NewTransaction) -> Self {
        Self {
            id,
            stock_card_id,
            seq,
            month: Some(new.date.month()),
            year: Some(new.date.year()),
            date: new.date,
            reference: new.reference,
            receipt_qty: new.receipt_qty,
            issue_qty: new.issue_qty,
            issue_office: new.issue_office,
            balance_qty: 0,
            days_to_consume: new.days_to_consume,
        }
    }

    /// Signed movement this entry applies to the running balance.
    pub fn net_movement(&self) -> Option<i64> {
        self.receipt_qty.checked_sub(self.issue_qty)
    }

    pub fn is_issue(&self) -> bool {
        self.issue_qty > 0
    }
}
