//! SQLite persistence adapter.

use crate::domain::error::StockCardError;
use crate::domain::stock_card::{generate_id, NewStockCard, StockCard};
use crate::domain::transaction::{Transaction, DATE_FORMAT};
use crate::ports::config_port::ConfigPort;
use crate::ports::store_port::StockCardStore;
use chrono::{NaiveDate, NaiveDateTime, Timelike, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, OptionalExtension, Row};
use tracing::debug;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const CARD_COLUMNS: &str = "id, entity_name, fund_cluster, item_name, stock_no, description,
     unit_of_measurement, reorder_point, created_at";

const TX_COLUMNS: &str = "id, stock_card_id, seq, date, month, year, reference, receipt_qty,
     issue_qty, issue_office, balance_qty, days_to_consume";

fn pool_err(e: r2d2::Error) -> StockCardError {
    StockCardError::Persistence {
        reason: e.to_string(),
    }
}

fn query_err(e: rusqlite::Error) -> StockCardError {
    StockCardError::Persistence {
        reason: e.to_string(),
    }
}

fn conversion_err<E>(len: usize, e: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(len, rusqlite::types::Type::Text, Box::new(e))
}

fn card_from_row(row: &Row<'_>) -> rusqlite::Result<StockCard> {
    let created_str: String = row.get(8)?;
    let created_at = NaiveDateTime::parse_from_str(&created_str, TIMESTAMP_FORMAT)
        .map_err(|e| conversion_err(created_str.len(), e))?;
    Ok(StockCard {
        id: row.get(0)?,
        entity_name: row.get(1)?,
        fund_cluster: row.get(2)?,
        item_name: row.get(3)?,
        stock_no: row.get(4)?,
        description: row.get(5)?,
        unit_of_measurement: row.get(6)?,
        reorder_point: row.get(7)?,
        created_at,
    })
}

fn transaction_from_row(row: &Row<'_>) -> rusqlite::Result<Transaction> {
    let date_str: String = row.get(3)?;
    let date = NaiveDate::parse_from_str(&date_str, DATE_FORMAT)
        .map_err(|e| conversion_err(date_str.len(), e))?;
    Ok(Transaction {
        id: row.get(0)?,
        stock_card_id: row.get(1)?,
        seq: row.get(2)?,
        date,
        month: row.get(4)?,
        year: row.get(5)?,
        reference: row.get(6)?,
        receipt_qty: row.get(7)?,
        issue_qty: row.get(8)?,
        issue_office: row.get(9)?,
        balance_qty: row.get(10)?,
        days_to_consume: row.get(11)?,
    })
}

pub struct SqliteAdapter {
    pool: Pool<SqliteConnectionManager>,
}

impl SqliteAdapter {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, StockCardError> {
        let db_path =
            config
                .get_string("sqlite", "path")
                .ok_or_else(|| StockCardError::ConfigMissing {
                    section: "sqlite".into(),
                    key: "path".into(),
                })?;

        let pool_size = config.get_int("sqlite", "pool_size", 4) as u32;

        let manager = SqliteConnectionManager::file(&db_path)
            .with_init(|c| c.execute_batch("PRAGMA foreign_keys = ON;"));
        let pool = Pool::builder()
            .max_size(pool_size)
            .build(manager)
            .map_err(pool_err)?;

        debug!(path = %db_path, pool_size, "opened sqlite store");
        Ok(Self { pool })
    }

    pub fn in_memory() -> Result<Self, StockCardError> {
        let manager = SqliteConnectionManager::memory()
            .with_init(|c| c.execute_batch("PRAGMA foreign_keys = ON;"));
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(pool_err)?;

        Ok(Self { pool })
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>, StockCardError> {
        self.pool.get().map_err(pool_err)
    }

    pub fn initialize_schema(&self) -> Result<(), StockCardError> {
        let conn = self.conn()?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS stock_cards (
                id TEXT PRIMARY KEY,
                entity_name TEXT NOT NULL DEFAULT '',
                fund_cluster TEXT NOT NULL DEFAULT '',
                item_name TEXT NOT NULL CHECK (item_name <> ''),
                stock_no TEXT NOT NULL DEFAULT '',
                description TEXT NOT NULL DEFAULT '',
                unit_of_measurement TEXT NOT NULL DEFAULT '',
                reorder_point INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS transactions (
                id TEXT PRIMARY KEY,
                stock_card_id TEXT NOT NULL REFERENCES stock_cards(id),
                seq INTEGER NOT NULL,
                date TEXT NOT NULL,
                month INTEGER,
                year INTEGER,
                reference TEXT NOT NULL DEFAULT '',
                receipt_qty INTEGER NOT NULL CHECK (receipt_qty >= 0),
                issue_qty INTEGER NOT NULL CHECK (issue_qty >= 0),
                issue_office TEXT NOT NULL DEFAULT '',
                balance_qty INTEGER NOT NULL,
                days_to_consume INTEGER NOT NULL DEFAULT 0
            );
            CREATE INDEX IF NOT EXISTS idx_transactions_card_order
                ON transactions(stock_card_id, date, seq);",
        )
        .map_err(query_err)?;

        Ok(())
    }
}

impl StockCardStore for SqliteAdapter {
    fn insert_card(&self, card: NewStockCard) -> Result<StockCard, StockCardError> {
        let now = Utc::now().naive_utc();
        let created_at = now.with_nanosecond(0).unwrap_or(now);
        let card = StockCard::from_new(generate_id(), card, created_at);
        let conn = self.conn()?;

        conn.execute(
            "INSERT INTO stock_cards (id, entity_name, fund_cluster, item_name, stock_no,
                description, unit_of_measurement, reorder_point, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                card.id,
                card.entity_name,
                card.fund_cluster,
                card.item_name,
                card.stock_no,
                card.description,
                card.unit_of_measurement,
                card.reorder_point,
                card.created_at.format(TIMESTAMP_FORMAT).to_string(),
            ],
        )
        .map_err(query_err)?;

        Ok(card)
    }

    fn get_card(&self, id: &str) -> Result<Option<StockCard>, StockCardError> {
        let conn = self.conn()?;
        let query = format!("SELECT {CARD_COLUMNS} FROM stock_cards WHERE id = ?1");
        conn.query_row(&query, params![id], card_from_row)
            .optional()
            .map_err(query_err)
    }

    fn list_cards(&self) -> Result<Vec<StockCard>, StockCardError> {
        let conn = self.conn()?;
        let query = format!("SELECT {CARD_COLUMNS} FROM stock_cards ORDER BY created_at, rowid");
        let mut stmt = conn.prepare(&query).map_err(query_err)?;
        let rows = stmt.query_map([], card_from_row).map_err(query_err)?;

        let mut cards = Vec::new();
        for row in rows {
            cards.push(row.map_err(query_err)?);
        }
        Ok(cards)
    }

    fn update_card(&self, card: &StockCard) -> Result<(), StockCardError> {
        let conn = self.conn()?;
        let changed = conn
            .execute(
                "UPDATE stock_cards SET entity_name = ?2, fund_cluster = ?3, item_name = ?4,
                    stock_no = ?5, description = ?6, unit_of_measurement = ?7, reorder_point = ?8
                 WHERE id = ?1",
                params![
                    card.id,
                    card.entity_name,
                    card.fund_cluster,
                    card.item_name,
                    card.stock_no,
                    card.description,
                    card.unit_of_measurement,
                    card.reorder_point,
                ],
            )
            .map_err(query_err)?;

        if changed == 0 {
            return Err(StockCardError::card_not_found(&card.id));
        }
        Ok(())
    }

    fn delete_card(&self, id: &str) -> Result<usize, StockCardError> {
        let mut conn = self.conn()?;
        let sql_tx = conn.transaction().map_err(query_err)?;

        let removed = sql_tx
            .execute(
                "DELETE FROM transactions WHERE stock_card_id = ?1",
                params![id],
            )
            .map_err(query_err)?;
        let changed = sql_tx
            .execute("DELETE FROM stock_cards WHERE id = ?1", params![id])
            .map_err(query_err)?;
        if changed == 0 {
            return Err(StockCardError::card_not_found(id));
        }

        sql_tx.commit().map_err(query_err)?;
        Ok(removed)
    }

    fn insert_transaction(
        &self,
        tx: &Transaction,
        shifted: &[(String, i64)],
    ) -> Result<(), StockCardError> {
        let mut conn = self.conn()?;
        let sql_tx = conn.transaction().map_err(query_err)?;

        sql_tx
            .execute(
                "INSERT INTO transactions (id, stock_card_id, seq, date, month, year, reference,
                    receipt_qty, issue_qty, issue_office, balance_qty, days_to_consume)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                params![
                    tx.id,
                    tx.stock_card_id,
                    tx.seq,
                    tx.date.format(DATE_FORMAT).to_string(),
                    tx.month,
                    tx.year,
                    tx.reference,
                    tx.receipt_qty,
                    tx.issue_qty,
                    tx.issue_office,
                    tx.balance_qty,
                    tx.days_to_consume,
                ],
            )
            .map_err(query_err)?;
        write_balances(&sql_tx, &tx.stock_card_id, shifted)?;

        sql_tx.commit().map_err(query_err)?;
        Ok(())
    }

    fn list_transactions(&self, card_id: &str) -> Result<Vec<Transaction>, StockCardError> {
        let conn = self.conn()?;
        let query = format!(
            "SELECT {TX_COLUMNS} FROM transactions
             WHERE stock_card_id = ?1
             ORDER BY date ASC, seq ASC"
        );
        let mut stmt = conn.prepare(&query).map_err(query_err)?;
        let rows = stmt
            .query_map(params![card_id], transaction_from_row)
            .map_err(query_err)?;

        let mut transactions = Vec::new();
        for row in rows {
            transactions.push(row.map_err(query_err)?);
        }
        Ok(transactions)
    }

    fn delete_transaction(
        &self,
        card_id: &str,
        tx_id: &str,
        shifted: &[(String, i64)],
    ) -> Result<(), StockCardError> {
        let mut conn = self.conn()?;
        let sql_tx = conn.transaction().map_err(query_err)?;

        let changed = sql_tx
            .execute(
                "DELETE FROM transactions WHERE id = ?1 AND stock_card_id = ?2",
                params![tx_id, card_id],
            )
            .map_err(query_err)?;
        if changed == 0 {
            return Err(StockCardError::transaction_not_found(tx_id));
        }
        write_balances(&sql_tx, card_id, shifted)?;

        sql_tx.commit().map_err(query_err)?;
        Ok(())
    }

    fn update_balances(
        &self,
        card_id: &str,
        balances: &[(String, i64)],
    ) -> Result<(), StockCardError> {
        let mut conn = self.conn()?;
        let sql_tx = conn.transaction().map_err(query_err)?;
        write_balances(&sql_tx, card_id, balances)?;
        sql_tx.commit().map_err(query_err)?;
        Ok(())
    }
}

/// Overwrite balances inside an open SQL transaction. An unknown id aborts;
/// dropping the uncommitted transaction rolls back every earlier statement.
fn write_balances(
    sql_tx: &rusqlite::Transaction<'_>,
    card_id: &str,
    balances: &[(String, i64)],
) -> Result<(), StockCardError> {
    for (id, balance) in balances {
        let changed = sql_tx
            .execute(
                "UPDATE transactions SET balance_qty = ?1 WHERE id = ?2 AND stock_card_id = ?3",
                params![balance, id, card_id],
            )
            .map_err(query_err)?;
        if changed == 0 {
            return Err(StockCardError::transaction_not_found(id));
        }
    }
    if !balances.is_empty() {
        debug!(card_id, rewritten = balances.len(), "balances written");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::transaction::NewTransaction;

    struct EmptyConfig;

    impl ConfigPort for EmptyConfig {
        fn get_string(&self, _section: &str, _key: &str) -> Option<String> {
            None
        }
        fn get_int(&self, _section: &str, _key: &str, default: i64) -> i64 {
            default
        }
        fn get_bool(&self, _section: &str, _key: &str, default: bool) -> bool {
            default
        }
    }

    fn store() -> SqliteAdapter {
        let adapter = SqliteAdapter::in_memory().unwrap();
        adapter.initialize_schema().unwrap();
        adapter
    }

    fn paper() -> NewStockCard {
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

    fn entry(card_id: &str, id: &str, seq: i64, date: &str, receipt: i64, issue: i64) -> Transaction {
        let new = NewTransaction {
            date: NaiveDate::parse_from_str(date, DATE_FORMAT).unwrap(),
            reference: format!("REF-{id}"),
            receipt_qty: receipt,
            issue_qty: issue,
            issue_office: if issue > 0 { "Admin Office".into() } else { String::new() },
            days_to_consume: 0,
        };
        Transaction::from_new(id.into(), card_id.into(), seq, new)
    }

    #[test]
    fn from_config_missing_path() {
        match SqliteAdapter::from_config(&EmptyConfig) {
            Err(StockCardError::ConfigMissing { section, key }) => {
                assert_eq!(section, "sqlite");
                assert_eq!(key, "path");
            }
            Err(other) => panic!("expected ConfigMissing, got: {other}"),
            Ok(_) => panic!("expected error, got Ok"),
        }
    }

    #[test]
    fn schema_is_idempotent() {
        let adapter = store();
        adapter.initialize_schema().unwrap();
    }

    #[test]
    fn card_round_trip() {
        let adapter = store();
        let card = adapter.insert_card(paper()).unwrap();
        assert_eq!(card.id.len(), 32);

        let fetched = adapter.get_card(&card.id).unwrap().unwrap();
        assert_eq!(fetched, card);
        assert!(adapter.get_card("missing").unwrap().is_none());
    }

    #[test]
    fn update_and_list_cards() {
        let adapter = store();
        let mut card = adapter.insert_card(paper()).unwrap();
        card.reorder_point = 30;
        adapter.update_card(&card).unwrap();

        let cards = adapter.list_cards().unwrap();
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].reorder_point, 30);
    }

    #[test]
    fn update_missing_card_is_not_found() {
        let adapter = store();
        let ghost = StockCard::from_new("ghost".into(), paper(), Utc::now().naive_utc());
        assert!(matches!(
            adapter.update_card(&ghost),
            Err(StockCardError::NotFound { .. })
        ));
    }

    #[test]
    fn empty_item_name_rejected_by_schema() {
        let adapter = store();
        let mut card = paper();
        card.item_name = String::new();
        assert!(matches!(
            adapter.insert_card(card),
            Err(StockCardError::Persistence { .. })
        ));
    }

    #[test]
    fn transactions_listed_by_date_then_seq() {
        let adapter = store();
        let card = adapter.insert_card(paper()).unwrap();
        adapter
            .insert_transaction(&entry(&card.id, "late", 1, "2025-04-20", 0, 5), &[])
            .unwrap();
        adapter
            .insert_transaction(&entry(&card.id, "tie-b", 3, "2025-04-10", 0, 1), &[])
            .unwrap();
        adapter
            .insert_transaction(&entry(&card.id, "tie-a", 2, "2025-04-10", 40, 0), &[])
            .unwrap();

        let ids: Vec<String> = adapter
            .list_transactions(&card.id)
            .unwrap()
            .into_iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(ids, vec!["tie-a", "tie-b", "late"]);
    }

    #[test]
    fn transaction_fields_round_trip() {
        let adapter = store();
        let card = adapter.insert_card(paper()).unwrap();
        let mut tx = entry(&card.id, "t1", 1, "2025-04-15", 0, 50);
        tx.balance_qty = -50;
        tx.days_to_consume = 30;
        adapter.insert_transaction(&tx, &[]).unwrap();

        let fetched = adapter.list_transactions(&card.id).unwrap();
        assert_eq!(fetched, vec![tx]);
    }

    #[test]
    fn transaction_requires_existing_card() {
        let adapter = store();
        let result =
            adapter.insert_transaction(&entry("no-card", "t1", 1, "2025-04-15", 1, 0), &[]);
        assert!(matches!(result, Err(StockCardError::Persistence { .. })));
    }

    #[test]
    fn cascade_delete() {
        let adapter = store();
        let card = adapter.insert_card(paper()).unwrap();
        let other = adapter.insert_card(paper()).unwrap();
        adapter
            .insert_transaction(&entry(&card.id, "t1", 1, "2025-04-10", 10, 0), &[])
            .unwrap();
        adapter
            .insert_transaction(&entry(&card.id, "t2", 2, "2025-04-11", 0, 3), &[])
            .unwrap();
        adapter
            .insert_transaction(&entry(&other.id, "t3", 1, "2025-04-11", 7, 0), &[])
            .unwrap();

        assert_eq!(adapter.delete_card(&card.id).unwrap(), 2);

        assert!(adapter.get_card(&card.id).unwrap().is_none());
        assert!(adapter.list_transactions(&card.id).unwrap().is_empty());
        assert_eq!(adapter.list_transactions(&other.id).unwrap().len(), 1);
    }

    #[test]
    fn delete_missing_card_is_not_found() {
        let adapter = store();
        assert!(matches!(
            adapter.delete_card("ghost"),
            Err(StockCardError::NotFound { .. })
        ));
    }

    #[test]
    fn insert_with_shifted_balances() {
        let adapter = store();
        let card = adapter.insert_card(paper()).unwrap();
        let mut later = entry(&card.id, "t1", 1, "2025-04-20", 0, 5);
        later.balance_qty = -5;
        adapter.insert_transaction(&later, &[]).unwrap();

        let mut earlier = entry(&card.id, "t2", 2, "2025-04-10", 40, 0);
        earlier.balance_qty = 40;
        adapter
            .insert_transaction(&earlier, &[("t1".to_string(), 35)])
            .unwrap();

        let balances: Vec<i64> = adapter
            .list_transactions(&card.id)
            .unwrap()
            .iter()
            .map(|t| t.balance_qty)
            .collect();
        assert_eq!(balances, vec![40, 35]);
    }

    #[test]
    fn failed_balance_write_rolls_back_insert() {
        let adapter = store();
        let card = adapter.insert_card(paper()).unwrap();
        adapter
            .insert_transaction(&entry(&card.id, "t1", 1, "2025-04-20", 10, 0), &[])
            .unwrap();

        let result = adapter.insert_transaction(
            &entry(&card.id, "t2", 2, "2025-04-10", 5, 0),
            &[("t1".to_string(), 15), ("missing".to_string(), 1)],
        );
        assert!(matches!(result, Err(StockCardError::NotFound { .. })));

        let stored = adapter.list_transactions(&card.id).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].id, "t1");
        assert_eq!(stored[0].balance_qty, 0);
    }

    #[test]
    fn failed_balance_write_rolls_back_delete() {
        let adapter = store();
        let card = adapter.insert_card(paper()).unwrap();
        adapter
            .insert_transaction(&entry(&card.id, "t1", 1, "2025-04-10", 10, 0), &[])
            .unwrap();
        adapter
            .insert_transaction(&entry(&card.id, "t2", 2, "2025-04-11", 0, 3), &[])
            .unwrap();

        let result =
            adapter.delete_transaction(&card.id, "t1", &[("missing".to_string(), -3)]);
        assert!(result.is_err());
        assert_eq!(adapter.list_transactions(&card.id).unwrap().len(), 2);

        adapter
            .delete_transaction(&card.id, "t1", &[("t2".to_string(), -3)])
            .unwrap();
        let stored = adapter.list_transactions(&card.id).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].balance_qty, -3);
    }

    #[test]
    fn delete_missing_transaction() {
        let adapter = store();
        let card = adapter.insert_card(paper()).unwrap();
        assert!(matches!(
            adapter.delete_transaction(&card.id, "nope", &[]),
            Err(StockCardError::NotFound { .. })
        ));
    }

    #[test]
    fn update_balances_is_all_or_nothing() {
        let adapter = store();
        let card = adapter.insert_card(paper()).unwrap();
        adapter
            .insert_transaction(&entry(&card.id, "t1", 1, "2025-04-10", 10, 0), &[])
            .unwrap();

        let result = adapter.update_balances(
            &card.id,
            &[("t1".to_string(), 99), ("missing".to_string(), 1)],
        );
        assert!(result.is_err());
        assert_eq!(adapter.list_transactions(&card.id).unwrap()[0].balance_qty, 0);

        adapter
            .update_balances(&card.id, &[("t1".to_string(), 10)])
            .unwrap();
        assert_eq!(adapter.list_transactions(&card.id).unwrap()[0].balance_qty, 10);
    }
}
