//! Month/year ledger filtering and card search.

use chrono::Datelike;
use std::collections::BTreeSet;

use crate::domain::error::StockCardError;
use crate::domain::stock_card::CardSummary;
use crate::domain::transaction::Transaction;

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

pub fn month_name(month: u32) -> Option<&'static str> {
    MONTH_NAMES.get(month.checked_sub(1)? as usize).copied()
}

/// `None` on either axis means "all".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MonthYearFilter {
    pub month: Option<u32>,
    pub year: Option<i32>,
}

impl MonthYearFilter {
    pub fn new(month: Option<u32>, year: Option<i32>) -> Result<Self, StockCardError> {
        if let Some(m) = month {
            if !(1..=12).contains(&m) {
                return Err(StockCardError::InvalidDate {
                    value: format!("month {m}"),
                });
            }
        }
        Ok(Self { month, year })
    }

    pub fn is_active(&self) -> bool {
        self.month.is_some() || self.year.is_some()
    }

    pub fn matches(&self, tx: &Transaction) -> bool {
        self.month.is_none_or(|m| tx.date.month() == m)
            && self.year.is_none_or(|y| tx.date.year() == y)
    }

    /// Keep matching entries. Balances are not recomputed: a filtered view
    /// shows each entry's balance within the full ledger.
    pub fn apply<'a>(&self, transactions: &'a [Transaction]) -> Vec<&'a Transaction> {
        transactions.iter().filter(|t| self.matches(t)).collect()
    }

    pub fn describe(&self) -> String {
        match (self.month.and_then(month_name), self.year) {
            (Some(m), Some(y)) => format!("{m} {y}"),
            (Some(m), None) => format!("{m} (all years)"),
            (None, Some(y)) => format!("{y}"),
            (None, None) => "all".to_string(),
        }
    }
}

/// Distinct transaction years, newest first.
pub fn available_years(transactions: &[Transaction]) -> Vec<i32> {
    let years: BTreeSet<i32> = transactions.iter().map(|t| t.date.year()).collect();
    years.into_iter().rev().collect()
}

/// Case-insensitive substring search over item name, stock number,
/// description and entity name. An empty term matches every card.
pub fn search_cards<'a>(cards: &'a [CardSummary], term: &str) -> Vec<&'a CardSummary> {
    let needle = term.trim().to_lowercase();
    cards
        .iter()
        .filter(|c| {
            needle.is_empty()
                || [&c.item_name, &c.stock_no, &c.description, &c.entity_name]
                    .iter()
                    .any(|field| field.to_lowercase().contains(&needle))
        })
        .collect()
}
