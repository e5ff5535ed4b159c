//! Persistence port for stock cards and their ledger entries.

use crate::domain::error::StockCardError;
use crate::domain::stock_card::{NewStockCard, StockCard};
use crate::domain::transaction::Transaction;

/// CRUD over the two record types. Every failure is reported as
/// [`StockCardError::Persistence`] or [`StockCardError::NotFound`].
///
/// Each write below is applied all-or-nothing: on error the store is left
/// exactly as it was before the call.
pub trait StockCardStore {
    /// Persist a new card; the store assigns the id and creation time.
    fn insert_card(&self, card: NewStockCard) -> Result<StockCard, StockCardError>;

    fn get_card(&self, id: &str) -> Result<Option<StockCard>, StockCardError>;

    /// Cards ordered by creation time, oldest first.
    fn list_cards(&self) -> Result<Vec<StockCard>, StockCardError>;

    fn update_card(&self, card: &StockCard) -> Result<(), StockCardError>;

    /// Delete a card together with every transaction it owns. Returns the
    /// number of transactions removed.
    fn delete_card(&self, id: &str) -> Result<usize, StockCardError>;

    /// Insert `tx` and overwrite the stored balances of the entries it shifts.
    fn insert_transaction(
        &self,
        tx: &Transaction,
        shifted: &[(String, i64)],
    ) -> Result<(), StockCardError>;

    /// All transactions of a card ordered by date, then insertion order.
    fn list_transactions(&self, card_id: &str) -> Result<Vec<Transaction>, StockCardError>;

    /// Delete one of a card's transactions and overwrite the stored balances
    /// of the entries it shifts.
    fn delete_transaction(
        &self,
        card_id: &str,
        tx_id: &str,
        shifted: &[(String, i64)],
    ) -> Result<(), StockCardError>;

    /// Overwrite stored balances.
    fn update_balances(
        &self,
        card_id: &str,
        balances: &[(String, i64)],
    ) -> Result<(), StockCardError>;
}
