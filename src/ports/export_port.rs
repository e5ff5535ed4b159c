//! Export port for rendered stock cards.

use std::path::Path;

use crate::domain::error::StockCardError;
use crate::domain::ledger::Ledger;
use crate::domain::stock_card::StockCard;

pub trait ExportPort {
    /// File extension without the dot.
    fn extension(&self) -> &'static str;

    fn write(
        &self,
        card: &StockCard,
        ledger: &Ledger,
        output_path: &Path,
    ) -> Result<(), StockCardError>;

    /// Default file name for a card, e.g. `stock-card-<id>.csv`.
    fn default_file_name(&self, card: &StockCard) -> String {
        format!("stock-card-{}.{}", card.id, self.extension())
    }
}
