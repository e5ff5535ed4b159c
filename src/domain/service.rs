//! Stock card service: read-modify-recompute-write against a store.
//!
//! Each mutation of a card's ledger loads the card's full transaction set,
//! runs it through [`ledger`](crate::domain::ledger), and hands the store the
//! entry plus every balance that moved in a single call. Writes for one card
//! must not interleave.

use tracing::{debug, info, warn};

use crate::domain::error::StockCardError;
use crate::domain::filter::{available_years, search_cards, MonthYearFilter};
use crate::domain::ledger::{self, Ledger};
use crate::domain::stock_card::{generate_id, CardSummary, NewStockCard, StockCard};
use crate::domain::transaction::{NewTransaction, Transaction};
use crate::ports::config_port::ConfigPort;
use crate::ports::store_port::StockCardStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceOptions {
    /// Running balances may go below zero (backorders).
    pub allow_negative_balance: bool,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self {
            allow_negative_balance: true,
        }
    }
}

impl ServiceOptions {
    pub fn from_config(config: &dyn ConfigPort) -> Self {
        Self {
            allow_negative_balance: config.get_bool("ledger", "allow_negative_balance", true),
        }
    }
}

/// A card with its full ledger and the entries visible under a filter.
#[derive(Debug, Clone)]
pub struct CardView {
    pub card: StockCard,
    pub summary: CardSummary,
    pub ledger: Ledger,
    pub filter: MonthYearFilter,
    pub years: Vec<i32>,
}

impl CardView {
    pub fn visible(&self) -> Vec<&Transaction> {
        self.filter.apply(&self.ledger.transactions)
    }
}

pub struct StockCardService<'a> {
    store: &'a dyn StockCardStore,
    options: ServiceOptions,
}

impl<'a> StockCardService<'a> {
    pub fn new(store: &'a dyn StockCardStore) -> Self {
        Self::with_options(store, ServiceOptions::default())
    }

    pub fn with_options(store: &'a dyn StockCardStore, options: ServiceOptions) -> Self {
        Self { store, options }
    }

    fn require_card(&self, id: &str) -> Result<StockCard, StockCardError> {
        self.store
            .get_card(id)?
            .ok_or_else(|| StockCardError::card_not_found(id))
    }

    fn check_policy(&self, ledger: &Ledger) -> Result<(), StockCardError> {
        if self.options.allow_negative_balance {
            return Ok(());
        }
        match ledger.lowest_balance() {
            Some(low) if low < 0 => Err(StockCardError::InvalidQuantity {
                field: "issue_qty".into(),
                value: format!("balance would drop to {low}"),
            }),
            _ => Ok(()),
        }
    }

    pub fn create_card(&self, new: NewStockCard) -> Result<StockCard, StockCardError> {
        let new = new.validated()?;
        let card = self.store.insert_card(new)?;
        info!(card_id = %card.id, item = %card.item_name, "stock card created");
        Ok(card)
    }

    pub fn update_card(&self, id: &str, update: NewStockCard) -> Result<StockCard, StockCardError> {
        let update = update.validated()?;
        let mut card = self.require_card(id)?;
        card.apply(update);
        self.store.update_card(&card)?;
        info!(card_id = %card.id, "stock card updated");
        Ok(card)
    }

    /// Delete a card and every transaction it owns. Returns the number of
    /// transactions removed.
    pub fn delete_card(&self, id: &str) -> Result<usize, StockCardError> {
        let card = self.require_card(id)?;
        let removed = self.store.delete_card(id)?;
        info!(card_id = %id, item = %card.item_name, removed, "stock card deleted");
        Ok(removed)
    }

    /// Current ledger for a card, recomputed from the stored transaction set.
    pub fn ledger(&self, card_id: &str) -> Result<Ledger, StockCardError> {
        self.require_card(card_id)?;
        ledger::recompute(self.store.list_transactions(card_id)?)
    }

    pub fn list_cards(&self, search: &str) -> Result<Vec<CardSummary>, StockCardError> {
        let mut summaries = Vec::new();
        for card in self.store.list_cards()? {
            let ledger = ledger::recompute(self.store.list_transactions(&card.id)?)?;
            summaries.push(CardSummary::new(&card, &ledger));
        }
        Ok(search_cards(&summaries, search)
            .into_iter()
            .cloned()
            .collect())
    }

    pub fn view_card(&self, id: &str, filter: MonthYearFilter) -> Result<CardView, StockCardError> {
        let card = self.require_card(id)?;
        let ledger = ledger::recompute(self.store.list_transactions(id)?)?;
        let years = available_years(&ledger.transactions);
        let summary = CardSummary::new(&card, &ledger);
        Ok(CardView {
            card,
            summary,
            ledger,
            filter,
            years,
        })
    }

    /// Record a new entry and rewrite every balance it shifts. Returns the
    /// new transaction's id and the recomputed ledger.
    pub fn add_transaction(
        &self,
        card_id: &str,
        new: NewTransaction,
    ) -> Result<(String, Ledger), StockCardError> {
        self.require_card(card_id)?;
        let existing = self.store.list_transactions(card_id)?;

        let id = generate_id();
        let tx = Transaction::from_new(
            id.clone(),
            card_id.to_string(),
            ledger::next_seq(&existing),
            new,
        );
        let updated = ledger::add_transaction(existing.clone(), tx)?;
        self.check_policy(&updated)?;

        let inserted = updated
            .transactions
            .iter()
            .find(|t| t.id == id)
            .ok_or_else(|| StockCardError::transaction_not_found(&id))?;
        let shifted: Vec<(String, i64)> = ledger::changed_balances(&existing, &updated)
            .into_iter()
            .filter(|(tid, _)| *tid != id)
            .collect();
        debug!(card_id, shifted = shifted.len(), "writing entry and later balances");
        self.store.insert_transaction(inserted, &shifted)?;

        info!(card_id, tx_id = %id, balance = updated.current_balance, "transaction added");
        Ok((id, updated))
    }

    /// Remove an entry and rewrite every balance after it.
    pub fn remove_transaction(&self, card_id: &str, tx_id: &str) -> Result<Ledger, StockCardError> {
        self.require_card(card_id)?;
        let existing = self.store.list_transactions(card_id)?;
        if !existing.iter().any(|t| t.id == tx_id) {
            return Err(StockCardError::transaction_not_found(tx_id));
        }

        let updated = ledger::remove_transaction(existing.clone(), tx_id)?;
        self.check_policy(&updated)?;

        let shifted = ledger::changed_balances(&existing, &updated);
        debug!(card_id, shifted = shifted.len(), "removing entry and rewriting later balances");
        self.store.delete_transaction(card_id, tx_id, &shifted)?;

        info!(card_id, tx_id, balance = updated.current_balance, "transaction removed");
        Ok(updated)
    }

    /// Rewrite stale stored balances. Returns how many entries were fixed.
    pub fn recompute_card(&self, card_id: &str) -> Result<usize, StockCardError> {
        self.require_card(card_id)?;
        let existing = self.store.list_transactions(card_id)?;
        let updated = ledger::recompute(existing.clone())?;
        let stale = ledger::changed_balances(&existing, &updated);
        if !stale.is_empty() {
            warn!(card_id, stale = stale.len(), "repairing stored balances");
            self.store.update_balances(card_id, &stale)?;
        }
        Ok(stale.len())
    }

    /// First transaction whose stored balance disagrees with a recompute.
    pub fn check_card(&self, card_id: &str) -> Result<Option<String>, StockCardError> {
        self.require_card(card_id)?;
        ledger::verify(&self.store.list_transactions(card_id)?)
    }
}
