//! Spreadsheet export as CSV.
//!
//! Layout mirrors the printed stock card: a title row, header fields in
//! label/value pairs, a column header, then one row per ledger entry. A
//! month/year filter limits the rows; balances stay those of the full ledger.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::domain::error::StockCardError;
use crate::domain::filter::MonthYearFilter;
use crate::domain::ledger::Ledger;
use crate::domain::stock_card::StockCard;
use crate::domain::transaction::DATE_FORMAT;
use crate::ports::export_port::ExportPort;

pub const LEDGER_COLUMNS: [&str; 7] = [
    "Date",
    "Reference",
    "Receipt Qty.",
    "Issue Qty.",
    "Office",
    "Balance Qty.",
    "No. of Days to Consume",
];

fn csv_err(e: csv::Error) -> StockCardError {
    StockCardError::Export {
        reason: format!("CSV write error: {}", e),
    }
}

pub struct CsvExporter {
    filter: MonthYearFilter,
}

impl CsvExporter {
    pub fn new() -> Self {
        Self {
            filter: MonthYearFilter::default(),
        }
    }

    pub fn with_filter(mut self, filter: MonthYearFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Write the card to any sink. Rows vary in width, so the writer is
    /// built with `flexible(true)`.
    pub fn write_to<W: Write>(
        &self,
        sink: W,
        card: &StockCard,
        ledger: &Ledger,
    ) -> Result<(), StockCardError> {
        let mut wtr = csv::WriterBuilder::new().flexible(true).from_writer(sink);

        let mut header_rows: Vec<Vec<String>> = vec![
            vec!["STOCK CARD".into()],
            vec![String::new()],
            vec![
                format!("Entity Name: {}", card.entity_name),
                format!("Fund Cluster: {}", card.fund_cluster),
            ],
            vec![String::new()],
            vec![
                format!("Item: {}", card.item_name),
                format!("Stock No.: {}", card.stock_no),
            ],
            vec![
                format!("Description: {}", card.description),
                format!("Re-order Point: {}", card.reorder_point),
            ],
            vec![format!("Unit of Measurement: {}", card.unit_of_measurement)],
        ];
        if self.filter.is_active() {
            header_rows.push(vec![format!("Period: {}", self.filter.describe())]);
        }
        header_rows.push(vec![String::new()]);
        for row in &header_rows {
            wtr.write_record(row).map_err(csv_err)?;
        }

        wtr.write_record(LEDGER_COLUMNS).map_err(csv_err)?;

        for t in self.filter.apply(&ledger.transactions) {
            wtr.write_record([
                t.date.format(DATE_FORMAT).to_string(),
                t.reference.clone(),
                t.receipt_qty.to_string(),
                t.issue_qty.to_string(),
                t.issue_office.clone(),
                t.balance_qty.to_string(),
                t.days_to_consume.to_string(),
            ])
            .map_err(csv_err)?;
        }

        wtr.flush()?;
        Ok(())
    }
}

impl Default for CsvExporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ExportPort for CsvExporter {
    fn extension(&self) -> &'static str {
        "csv"
    }

    fn write(
        &self,
        card: &StockCard,
        ledger: &Ledger,
        output_path: &Path,
    ) -> Result<(), StockCardError> {
        let file = File::create(output_path).map_err(|e| StockCardError::Export {
            reason: format!("failed to create {}: {}", output_path.display(), e),
        })?;
        self.write_to(file, card, ledger)
    }
}
