//! Stock card header records.

use chrono::{NaiveDate, NaiveDateTime};
use rand::RngCore;

use crate::domain::error::StockCardError;
use crate::domain::ledger::Ledger;
use crate::domain::transaction::parse_quantity;

/// Fresh opaque identifier: 16 random bytes as lowercase hex.
pub fn generate_id() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Header fields of a card, before it has an id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NewStockCard {
    pub entity_name: String,
    pub fund_cluster: String,
    pub item_name: String,
    pub stock_no: String,
    pub description: String,
    pub unit_of_measurement: String,
    pub reorder_point: i64,
}

impl NewStockCard {
    /// Trim every text field and require a non-empty item name.
    pub fn validated(mut self) -> Result<Self, StockCardError> {
        for field in [
            &mut self.entity_name,
            &mut self.fund_cluster,
            &mut self.item_name,
            &mut self.stock_no,
            &mut self.description,
            &mut self.unit_of_measurement,
        ] {
            *field = field.trim().to_string();
        }
        if self.item_name.is_empty() {
            return Err(StockCardError::MissingField {
                field: "item_name".into(),
            });
        }
        if self.reorder_point < 0 {
            return Err(StockCardError::InvalidQuantity {
                field: "reorder_point".into(),
                value: self.reorder_point.to_string(),
            });
        }
        Ok(self)
    }

    pub fn with_reorder_point_str(mut self, value: &str) -> Result<Self, StockCardError> {
        self.reorder_point = parse_quantity("reorder_point", value)?;
        Ok(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StockCard {
    pub id: String,
    pub entity_name: String,
    pub fund_cluster: String,
    pub item_name: String,
    pub stock_no: String,
    pub description: String,
    pub unit_of_measurement: String,
    pub reorder_point: i64,
    pub created_at: NaiveDateTime,
}

impl StockCard {
    pub fn from_new(id: String, new: NewStockCard, created_at: NaiveDateTime) -> Self {
        Self {
            id,
            entity_name: new.entity_name,
            fund_cluster: new.fund_cluster,
            item_name: new.item_name,
            stock_no: new.stock_no,
            description: new.description,
            unit_of_measurement: new.unit_of_measurement,
            reorder_point: new.reorder_point,
            created_at,
        }
    }

    /// Replace header fields, keeping id and creation time.
    pub fn apply(&mut self, update: NewStockCard) {
        self.entity_name = update.entity_name;
        self.fund_cluster = update.fund_cluster;
        self.item_name = update.item_name;
        self.stock_no = update.stock_no;
        self.description = update.description;
        self.unit_of_measurement = update.unit_of_measurement;
        self.reorder_point = update.reorder_point;
    }

    pub fn header(&self) -> NewStockCard {
        NewStockCard {
            entity_name: self.entity_name.clone(),
            fund_cluster: self.fund_cluster.clone(),
            item_name: self.item_name.clone(),
            stock_no: self.stock_no.clone(),
            description: self.description.clone(),
            unit_of_measurement: self.unit_of_measurement.clone(),
            reorder_point: self.reorder_point,
        }
    }
}

/// Card header plus derived balance figures, as listed and exported.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CardSummary {
    pub id: String,
    pub entity_name: String,
    pub fund_cluster: String,
    pub item_name: String,
    pub stock_no: String,
    pub description: String,
    pub unit_of_measurement: String,
    pub reorder_point: i64,
    pub current_balance: i64,
    pub last_updated: Option<NaiveDate>,
}

impl CardSummary {
    pub fn new(card: &StockCard, ledger: &Ledger) -> Self {
        Self {
            id: card.id.clone(),
            entity_name: card.entity_name.clone(),
            fund_cluster: card.fund_cluster.clone(),
            item_name: card.item_name.clone(),
            stock_no: card.stock_no.clone(),
            description: card.description.clone(),
            unit_of_measurement: card.unit_of_measurement.clone(),
            reorder_point: card.reorder_point,
            current_balance: ledger.current_balance,
            last_updated: ledger.last_date(),
        }
    }

    /// At or below the reorder point. Informational only.
    pub fn needs_reorder(&self) -> bool {
        self.current_balance <= self.reorder_point
    }
}
