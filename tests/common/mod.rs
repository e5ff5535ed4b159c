#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use stockcard::domain::error::StockCardError;
use stockcard::domain::stock_card::{NewStockCard, StockCard};
use stockcard::domain::transaction::{NewTransaction, Transaction};
use stockcard::ports::store_port::StockCardStore;

/// In-memory store with per-operation failure injection. Failures are
/// raised before any mutation, so every write is all-or-nothing.
pub struct MockStore {
    pub cards: RefCell<Vec<StockCard>>,
    pub transactions: RefCell<Vec<Transaction>>,
    pub failing: RefCell<HashSet<&'static str>>,
    pub balance_writes: Cell<usize>,
    next_card: Cell<u32>,
}

impl MockStore {
    pub fn new() -> Self {
        Self {
            cards: RefCell::new(Vec::new()),
            transactions: RefCell::new(Vec::new()),
            failing: RefCell::new(HashSet::new()),
            balance_writes: Cell::new(0),
            next_card: Cell::new(1),
        }
    }

    pub fn fail_on(&self, op: &'static str) {
        self.failing.borrow_mut().insert(op);
    }

    pub fn heal(&self) {
        self.failing.borrow_mut().clear();
    }

    fn check(&self, op: &'static str) -> Result<(), StockCardError> {
        if self.failing.borrow().contains(op) {
            return Err(StockCardError::Persistence {
                reason: format!("injected failure in {op}"),
            });
        }
        Ok(())
    }

    /// Validate a balance rewrite before anything is mutated, so a failing
    /// write leaves the store untouched.
    fn check_balances(
        &self,
        card_id: &str,
        balances: &[(String, i64)],
    ) -> Result<(), StockCardError> {
        if balances.is_empty() {
            return Ok(());
        }
        self.check("update_balances")?;
        let txs = self.transactions.borrow();
        for (id, _) in balances {
            if !txs.iter().any(|t| &t.id == id && t.stock_card_id == card_id) {
                return Err(StockCardError::transaction_not_found(id));
            }
        }
        Ok(())
    }

    fn write_balances(&self, balances: &[(String, i64)]) {
        let mut txs = self.transactions.borrow_mut();
        for (id, balance) in balances {
            if let Some(t) = txs.iter_mut().find(|t| &t.id == id) {
                t.balance_qty = *balance;
            }
        }
        self.balance_writes
            .set(self.balance_writes.get() + balances.len());
    }

    /// Stored balances for a card in ledger order.
    pub fn stored_balances(&self, card_id: &str) -> Vec<i64> {
        self.list_transactions(card_id)
            .unwrap()
            .into_iter()
            .map(|t| t.balance_qty)
            .collect()
    }
}

impl StockCardStore for MockStore {
    fn insert_card(&self, card: NewStockCard) -> Result<StockCard, StockCardError> {
        self.check("insert_card")?;
        let n = self.next_card.get();
        self.next_card.set(n + 1);
        let card = StockCard::from_new(format!("card-{n}"), card, created_at());
        self.cards.borrow_mut().push(card.clone());
        Ok(card)
    }

    fn get_card(&self, id: &str) -> Result<Option<StockCard>, StockCardError> {
        self.check("get_card")?;
        Ok(self.cards.borrow().iter().find(|c| c.id == id).cloned())
    }

    fn list_cards(&self) -> Result<Vec<StockCard>, StockCardError> {
        self.check("list_cards")?;
        Ok(self.cards.borrow().clone())
    }

    fn update_card(&self, card: &StockCard) -> Result<(), StockCardError> {
        self.check("update_card")?;
        let mut cards = self.cards.borrow_mut();
        let slot = cards
            .iter_mut()
            .find(|c| c.id == card.id)
            .ok_or_else(|| StockCardError::card_not_found(&card.id))?;
        *slot = card.clone();
        Ok(())
    }

    fn delete_card(&self, id: &str) -> Result<usize, StockCardError> {
        self.check("delete_card")?;
        if !self.cards.borrow().iter().any(|c| c.id == id) {
            return Err(StockCardError::card_not_found(id));
        }
        self.cards.borrow_mut().retain(|c| c.id != id);
        let mut txs = self.transactions.borrow_mut();
        let before = txs.len();
        txs.retain(|t| t.stock_card_id != id);
        Ok(before - txs.len())
    }

    fn insert_transaction(
        &self,
        tx: &Transaction,
        shifted: &[(String, i64)],
    ) -> Result<(), StockCardError> {
        self.check("insert_transaction")?;
        self.check_balances(&tx.stock_card_id, shifted)?;
        self.transactions.borrow_mut().push(tx.clone());
        self.write_balances(shifted);
        Ok(())
    }

    fn list_transactions(&self, card_id: &str) -> Result<Vec<Transaction>, StockCardError> {
        self.check("list_transactions")?;
        let mut txs: Vec<Transaction> = self
            .transactions
            .borrow()
            .iter()
            .filter(|t| t.stock_card_id == card_id)
            .cloned()
            .collect();
        txs.sort_by_key(|t| (t.date, t.seq));
        Ok(txs)
    }

    fn delete_transaction(
        &self,
        card_id: &str,
        tx_id: &str,
        shifted: &[(String, i64)],
    ) -> Result<(), StockCardError> {
        self.check("delete_transaction")?;
        if !self
            .transactions
            .borrow()
            .iter()
            .any(|t| t.id == tx_id && t.stock_card_id == card_id)
        {
            return Err(StockCardError::transaction_not_found(tx_id));
        }
        self.check_balances(card_id, shifted)?;
        self.transactions.borrow_mut().retain(|t| t.id != tx_id);
        self.write_balances(shifted);
        Ok(())
    }

    fn update_balances(
        &self,
        card_id: &str,
        balances: &[(String, i64)],
    ) -> Result<(), StockCardError> {
        self.check_balances(card_id, balances)?;
        self.write_balances(balances);
        Ok(())
    }
}

pub fn created_at() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 4, 1)
        .unwrap()
        .and_hms_opt(8, 0, 0)
        .unwrap()
}

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

pub fn pen_card() -> NewStockCard {
    NewStockCard {
        entity_name: "Department of Education".into(),
        fund_cluster: "General Fund".into(),
        item_name: "Ballpoint Pen".into(),
        stock_no: "S-001".into(),
        description: "Blue ballpoint pen, medium point".into(),
        unit_of_measurement: "piece".into(),
        reorder_point: 50,
    }
}

pub fn paper_card() -> NewStockCard {
    NewStockCard {
        entity_name: "Department of Education".into(),
        fund_cluster: "General Fund".into(),
        item_name: "A4 Paper".into(),
        stock_no: "S-002".into(),
        description: "A4 size copy paper, 80gsm".into(),
        unit_of_measurement: "ream".into(),
        reorder_point: 20,
    }
}

pub fn movement(d: &str, receipt: i64, issue: i64) -> NewTransaction {
    NewTransaction {
        date: date(d),
        reference: String::new(),
        receipt_qty: receipt,
        issue_qty: issue,
        issue_office: if issue > 0 {
            "Admin Office".into()
        } else {
            String::new()
        },
        days_to_consume: 0,
    }
}

/// Ledger entry with a fixed id and seq, balance left at zero.
pub fn entry(id: &str, seq: i64, d: &str, receipt: i64, issue: i64) -> Transaction {
    Transaction::from_new(id.into(), "card-1".into(), seq, movement(d, receipt, issue))
}

/// The three-entry pen history used across tests: +200, -50, -30.
pub fn pen_history() -> Vec<Transaction> {
    vec![
        entry("t1", 1, "2025-04-10", 200, 0),
        entry("t2", 2, "2025-04-15", 0, 50),
        entry("t3", 3, "2025-04-20", 0, 30),
    ]
}
