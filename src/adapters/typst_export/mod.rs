//! Typst document export of a stock card.
//!
//! Reads a Typst template (the built-in default or a custom file from
//! `[export] template_path`), resolves its `{{PLACEHOLDER}}` markers and
//! writes a `.typ` file ready for `typst compile`.

pub mod default_template;
pub mod tables;

use std::fs;
use std::path::Path;

use crate::domain::error::StockCardError;
use crate::domain::filter::MonthYearFilter;
use crate::domain::ledger::Ledger;
use crate::domain::stock_card::StockCard;
use crate::ports::export_port::ExportPort;

/// Context for resolving template placeholders.
pub struct ExportContext<'a> {
    pub card: &'a StockCard,
    pub ledger: &'a Ledger,
    pub filter: MonthYearFilter,
}

/// Resolve every placeholder in `template`.
pub fn resolve(template: &str, ctx: &ExportContext) -> String {
    let mut output = template.to_string();

    output = output.replace("{{TITLE}}", "STOCK CARD");
    output = output.replace("{{HEADER_GRID}}", &tables::render_header_grid(ctx.card));
    output = output.replace("{{PERIOD}}", &ctx.filter.describe());

    let visible = ctx.filter.apply(&ctx.ledger.transactions);
    output = output.replace("{{LEDGER_TABLE}}", &tables::render_ledger_table(&visible));

    output = output.replace("{{CURRENT_BALANCE}}", &render_balance(ctx));

    output
}

/// Current balance followed by the unit, escaped like every other user field.
fn render_balance(ctx: &ExportContext) -> String {
    let unit = ctx.card.unit_of_measurement.trim();
    if unit.is_empty() {
        ctx.ledger.current_balance.to_string()
    } else {
        format!("{} {}", ctx.ledger.current_balance, tables::text_cell(unit))
    }
}

pub struct TypstExporter {
    template: Option<String>,
    filter: MonthYearFilter,
}

impl TypstExporter {
    pub fn new() -> Self {
        Self {
            template: None,
            filter: MonthYearFilter::default(),
        }
    }

    pub fn with_template_file(mut self, path: &Path) -> Result<Self, StockCardError> {
        let content = fs::read_to_string(path).map_err(|e| StockCardError::Export {
            reason: format!("failed to read template {}: {}", path.display(), e),
        })?;
        self.template = Some(content);
        Ok(self)
    }

    pub fn with_filter(mut self, filter: MonthYearFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn render(&self, card: &StockCard, ledger: &Ledger) -> String {
        let template = self
            .template
            .as_deref()
            .unwrap_or(default_template::template());
        resolve(
            template,
            &ExportContext {
                card,
                ledger,
                filter: self.filter,
            },
        )
    }
}

impl Default for TypstExporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ExportPort for TypstExporter {
    fn extension(&self) -> &'static str {
        "typ"
    }

    fn write(
        &self,
        card: &StockCard,
        ledger: &Ledger,
        output_path: &Path,
    ) -> Result<(), StockCardError> {
        fs::write(output_path, self.render(card, ledger)).map_err(|e| StockCardError::Export {
            reason: format!("failed to write {}: {}", output_path.display(), e),
        })
    }

    /// Named after the item, like the printed card.
    fn default_file_name(&self, card: &StockCard) -> String {
        let slug: String = card
            .item_name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
            .collect();
        format!("stock-card-{}.{}", slug, self.extension())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ledger::recompute;
    use crate::domain::stock_card::NewStockCard;
    use crate::domain::transaction::{NewTransaction, Transaction};
    use chrono::NaiveDate;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    fn sample_card() -> StockCard {
        StockCard::from_new(
            "c1".into(),
            NewStockCard {
                entity_name: "Department of Education".into(),
                fund_cluster: "General Fund".into(),
                item_name: "Ballpoint Pen".into(),
                stock_no: "S-001".into(),
                description: "Blue ballpoint pen, medium point".into(),
                unit_of_measurement: "piece".into(),
                reorder_point: 50,
            },
            NaiveDate::from_ymd_opt(2025, 4, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
        )
    }

    fn sample_ledger() -> Ledger {
        let rows = [
            ("t1", "2025-03-28", 200, 0),
            ("t2", "2025-04-15", 0, 50),
            ("t3", "2025-04-20", 0, 30),
        ];
        recompute(
            rows.iter()
                .enumerate()
                .map(|(i, (id, date, r, iss))| {
                    Transaction::from_new(
                        id.to_string(),
                        "c1".into(),
                        i as i64 + 1,
                        NewTransaction {
                            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
                            reference: format!("REF-{id}"),
                            receipt_qty: *r,
                            issue_qty: *iss,
                            issue_office: String::new(),
                            days_to_consume: 0,
                        },
                    )
                })
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn default_template_resolves_fully() {
        let out = TypstExporter::new().render(&sample_card(), &sample_ledger());
        assert!(!out.contains("{{"), "unresolved placeholder in output: {out}");
        assert!(out.contains("#set page("));
        assert!(out.contains("= STOCK CARD"));
        assert!(out.contains("#table("));
        assert!(out.contains("*Current balance:* 120 [#\"piece\"]"));
        assert!(out.contains("_Period: all_"));
    }

    #[test]
    fn filter_limits_rows_but_keeps_full_ledger_balances() {
        let filter = MonthYearFilter::new(Some(4), Some(2025)).unwrap();
        let out = TypstExporter::new()
            .with_filter(filter)
            .render(&sample_card(), &sample_ledger());
        assert!(!out.contains("2025-03-28"));
        assert!(out.contains("[2025-04-15], [#\"REF-t2\"], [0], [50], [#\"\"], [150], [0],"));
        assert!(out.contains("_Period: April 2025_"));
    }

    #[test]
    fn custom_template_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "= Custom\n{{{{LEDGER_TABLE}}}}\nBalance {{{{CURRENT_BALANCE}}}}").unwrap();
        let exporter = TypstExporter::new().with_template_file(file.path()).unwrap();
        let out = exporter.render(&sample_card(), &sample_ledger());
        assert!(out.starts_with("= Custom\n#table("));
        assert!(out.ends_with("Balance 120 [#\"piece\"]"));
    }

    #[test]
    fn unit_with_markup_is_escaped() {
        let mut card = sample_card();
        card.unit_of_measurement = "roll *".into();
        let out = TypstExporter::new().render(&card, &sample_ledger());
        assert!(out.contains("*Current balance:* 120 [#\"roll *\"]"));
        assert!(!out.contains("120 roll *"));
    }

    #[test]
    fn blank_unit_renders_bare_balance() {
        let mut card = sample_card();
        card.unit_of_measurement = "  ".into();
        let out = TypstExporter::new().render(&card, &sample_ledger());
        assert!(out.contains("*Current balance:* 120\n"));
    }

    #[test]
    fn missing_template_file_is_export_error() {
        let result = TypstExporter::new().with_template_file(Path::new("/nonexistent.typ"));
        assert!(matches!(result, Err(StockCardError::Export { .. })));
    }

    #[test]
    fn write_uses_item_based_file_name() {
        let dir = TempDir::new().unwrap();
        let exporter = TypstExporter::new();
        let card = sample_card();
        let name = exporter.default_file_name(&card);
        assert_eq!(name, "stock-card-ballpoint-pen.typ");

        let path = dir.path().join(name);
        exporter.write(&card, &sample_ledger(), &path).unwrap();
        assert!(fs::read_to_string(path).unwrap().contains("S-001"));
    }
}
