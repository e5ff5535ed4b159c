//! Ledger balance engine.
//!
//! Every structural change to a card's transaction set re-runs a full
//! [`recompute`]: a stable sort by `(date, seq)` followed by a running-total
//! fold starting at zero. Incremental updates are never applied, since an
//! entry dated before existing ones shifts every later balance.
//!
//! Negative running balances are allowed here. Callers that want to forbid
//! them check [`Ledger::lowest_balance`].

use chrono::NaiveDate;

use crate::domain::error::StockCardError;
use crate::domain::transaction::Transaction;

/// A card's transactions in ledger order with balances populated.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Ledger {
    pub transactions: Vec<Transaction>,
    pub current_balance: i64,
}

impl Ledger {
    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    /// Total received and total issued across the whole ledger.
    pub fn totals(&self) -> (i64, i64) {
        self.transactions.iter().fold((0, 0), |(r, i), t| {
            (r + t.receipt_qty, i + t.issue_qty)
        })
    }

    /// Balance after the last entry dated on or before `date`.
    pub fn balance_as_of(&self, date: NaiveDate) -> i64 {
        self.transactions
            .iter()
            .take_while(|t| t.date <= date)
            .last()
            .map(|t| t.balance_qty)
            .unwrap_or(0)
    }

    pub fn lowest_balance(&self) -> Option<i64> {
        self.transactions.iter().map(|t| t.balance_qty).min()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.transactions.last().map(|t| t.date)
    }
}

fn check_quantities(tx: &Transaction) -> Result<(), StockCardError> {
    if tx.receipt_qty < 0 {
        return Err(StockCardError::InvalidQuantity {
            field: "receipt_qty".into(),
            value: tx.receipt_qty.to_string(),
        });
    }
    if tx.issue_qty < 0 {
        return Err(StockCardError::InvalidQuantity {
            field: "issue_qty".into(),
            value: tx.issue_qty.to_string(),
        });
    }
    Ok(())
}

/// Sort by date (ties by `seq`, then input order) and assign running balances.
///
/// Either every balance is recomputed or an error is returned; the input is
/// consumed and no partially updated sequence escapes.
pub fn recompute(mut transactions: Vec<Transaction>) -> Result<Ledger, StockCardError> {
    for tx in &transactions {
        check_quantities(tx)?;
    }

    transactions.sort_by_key(|t| (t.date, t.seq));

    let mut balance: i64 = 0;
    for tx in transactions.iter_mut() {
        balance = tx
            .net_movement()
            .and_then(|m| balance.checked_add(m))
            .ok_or_else(|| StockCardError::InvalidQuantity {
                field: "balance_qty".into(),
                value: format!("overflow at {}", tx.id),
            })?;
        tx.balance_qty = balance;
    }

    Ok(Ledger {
        transactions,
        current_balance: balance,
    })
}

/// Append `new` and recompute the whole ledger.
pub fn add_transaction(
    existing: Vec<Transaction>,
    new: Transaction,
) -> Result<Ledger, StockCardError> {
    let mut all = existing;
    all.push(new);
    recompute(all)
}

/// Drop the entry with `id` (if present) and recompute the remainder.
pub fn remove_transaction(existing: Vec<Transaction>, id: &str) -> Result<Ledger, StockCardError> {
    let remaining = existing.into_iter().filter(|t| t.id != id).collect();
    recompute(remaining)
}

/// Next insertion counter for a card's transaction set.
pub fn next_seq(existing: &[Transaction]) -> i64 {
    existing.iter().map(|t| t.seq).max().map_or(1, |s| s + 1)
}

/// Check stored balances against a fresh recompute. Returns the id of the
/// first entry (in ledger order) whose stored balance is stale.
pub fn verify(stored: &[Transaction]) -> Result<Option<String>, StockCardError> {
    let expected = recompute(stored.to_vec())?;
    let mut ordered: Vec<&Transaction> = stored.iter().collect();
    ordered.sort_by_key(|t| (t.date, t.seq));

    Ok(ordered
        .into_iter()
        .zip(expected.transactions.iter())
        .find(|(have, want)| have.balance_qty != want.balance_qty)
        .map(|(have, _)| have.id.clone()))
}

/// Ids whose balance differs between two ledgers of the same card. Entries
/// only present in `after` are included.
pub fn changed_balances(before: &[Transaction], after: &Ledger) -> Vec<(String, i64)> {
    after
        .transactions
        .iter()
        .filter(|t| {
            before
                .iter()
                .find(|b| b.id == t.id)
                .is_none_or(|b| b.balance_qty != t.balance_qty)
        })
        .map(|t| (t.id.clone(), t.balance_qty))
        .collect()
}
