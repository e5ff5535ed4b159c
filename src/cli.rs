//! CLI definition and dispatch.
//!
//! Each subcommand resolves the config, opens the store and hands a
//! [`StockCardService`] to a `cmd_*` function that returns the text to print.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;

use crate::adapters::csv_export::CsvExporter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::typst_export::TypstExporter;
use crate::domain::config_validation::validate_config;
use crate::domain::error::StockCardError;
use crate::domain::filter::MonthYearFilter;
use crate::domain::service::{CardView, ServiceOptions, StockCardService};
use crate::domain::stock_card::{CardSummary, NewStockCard};
use crate::domain::transaction::{NewTransaction, RawTransaction, DATE_FORMAT};
use crate::ports::config_port::ConfigPort;
use crate::ports::export_port::ExportPort;

#[derive(Parser, Debug)]
#[command(name = "stockcard", about = "Inventory stock cards with running balances")]
pub struct Cli {
    /// INI configuration file
    #[arg(short, long, global = true, default_value = "stockcard.ini")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

/// Header fields of a stock card. Omitted fields keep their current value
/// on `edit` and are blank on `create`.
#[derive(Args, Debug, Default, Clone)]
pub struct HeaderArgs {
    #[arg(long)]
    pub entity: Option<String>,
    #[arg(long)]
    pub fund_cluster: Option<String>,
    #[arg(long)]
    pub item: Option<String>,
    #[arg(long)]
    pub stock_no: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long)]
    pub unit: Option<String>,
    #[arg(long)]
    pub reorder_point: Option<String>,
}

impl HeaderArgs {
    pub fn merge_into(self, mut base: NewStockCard) -> Result<NewStockCard, StockCardError> {
        if let Some(v) = self.entity {
            base.entity_name = v;
        }
        if let Some(v) = self.fund_cluster {
            base.fund_cluster = v;
        }
        if let Some(v) = self.item {
            base.item_name = v;
        }
        if let Some(v) = self.stock_no {
            base.stock_no = v;
        }
        if let Some(v) = self.description {
            base.description = v;
        }
        if let Some(v) = self.unit {
            base.unit_of_measurement = v;
        }
        match self.reorder_point {
            Some(v) => base.with_reorder_point_str(&v),
            None => Ok(base),
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct TransactionArgs {
    /// Transaction date (YYYY-MM-DD)
    #[arg(long)]
    pub date: String,
    #[arg(long, default_value = "")]
    pub reference: String,
    #[arg(long, default_value = "0")]
    pub receipt: String,
    #[arg(long, default_value = "0")]
    pub issue: String,
    /// Office the stock was issued to
    #[arg(long, default_value = "")]
    pub office: String,
    #[arg(long, default_value = "0")]
    pub days_to_consume: String,
}

impl TransactionArgs {
    pub fn to_new(&self) -> Result<NewTransaction, StockCardError> {
        NewTransaction::from_raw(&RawTransaction {
            date: self.date.clone(),
            reference: self.reference.clone(),
            receipt_qty: self.receipt.clone(),
            issue_qty: self.issue.clone(),
            issue_office: self.office.clone(),
            days_to_consume: self.days_to_consume.clone(),
        })
    }
}

#[derive(Args, Debug, Clone, Copy, Default)]
pub struct FilterArgs {
    /// Month number (1-12)
    #[arg(long)]
    pub month: Option<u32>,
    #[arg(long)]
    pub year: Option<i32>,
}

impl FilterArgs {
    pub fn to_filter(self) -> Result<MonthYearFilter, StockCardError> {
        MonthYearFilter::new(self.month, self.year)
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// Spreadsheet rows
    Csv,
    /// Printable Typst document
    Typst,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create the database schema
    Init,
    /// List stock cards with their current balance
    List {
        #[arg(short, long, default_value = "")]
        search: String,
    },
    /// Show a stock card and its ledger
    Show {
        id: String,
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Create a stock card
    Create {
        #[command(flatten)]
        header: HeaderArgs,
    },
    /// Edit a stock card's header
    Edit {
        id: String,
        #[command(flatten)]
        header: HeaderArgs,
    },
    /// Delete a stock card and all of its transactions
    Delete { id: String },
    /// Record a receipt or issue against a card
    AddTx {
        card_id: String,
        #[command(flatten)]
        tx: TransactionArgs,
    },
    /// Remove a transaction and recompute later balances
    RemoveTx { card_id: String, tx_id: String },
    /// Rewrite stale stored balances of a card
    Recompute { card_id: String },
    /// Verify stored balances of a card
    Check { card_id: String },
    /// Export a card as CSV or Typst
    Export {
        card_id: String,
        #[arg(short, long, value_enum, default_value = "csv")]
        format: ExportFormat,
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Custom Typst template (overrides [export] template_path)
        #[arg(long)]
        template: Option<PathBuf>,
        #[command(flatten)]
        filter: FilterArgs,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let config = match load_config(&cli.config) {
        Ok(c) => c,
        Err(code) => return code,
    };
    if let Err(e) = validate_config(&config) {
        eprintln!("error: {e}");
        return (&e).into();
    }

    let result = with_service(&config, |service| match cli.command {
        Command::Init => Ok("database ready".to_string()),
        Command::List { search } => cmd_list(service, &search),
        Command::Show { id, filter } => cmd_show(service, &id, filter.to_filter()?),
        Command::Create { header } => cmd_create(service, header),
        Command::Edit { id, header } => cmd_edit(service, &id, header),
        Command::Delete { id } => cmd_delete(service, &id),
        Command::AddTx { card_id, tx } => cmd_add_tx(service, &card_id, &tx),
        Command::RemoveTx { card_id, tx_id } => cmd_remove_tx(service, &card_id, &tx_id),
        Command::Recompute { card_id } => cmd_recompute(service, &card_id),
        Command::Check { card_id } => cmd_check(service, &card_id),
        Command::Export {
            card_id,
            format,
            output,
            template,
            filter,
        } => cmd_export(
            service,
            &config,
            &card_id,
            format,
            output.as_deref(),
            template.as_deref(),
            filter.to_filter()?,
        ),
    });

    match result {
        Ok(out) => {
            println!("{out}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    info!("Loading config from {}", path.display());
    FileConfigAdapter::from_file(path).map_err(|e| {
        let err = StockCardError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        };
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

#[cfg(feature = "sqlite")]
fn with_service<F>(config: &dyn ConfigPort, f: F) -> Result<String, StockCardError>
where
    F: FnOnce(&StockCardService) -> Result<String, StockCardError>,
{
    use crate::adapters::sqlite_adapter::SqliteAdapter;

    let store = SqliteAdapter::from_config(config)?;
    store.initialize_schema()?;
    let service = StockCardService::with_options(&store, ServiceOptions::from_config(config));
    f(&service)
}

#[cfg(not(feature = "sqlite"))]
fn with_service<F>(_config: &dyn ConfigPort, _f: F) -> Result<String, StockCardError>
where
    F: FnOnce(&StockCardService) -> Result<String, StockCardError>,
{
    Err(StockCardError::ConfigInvalid {
        section: "sqlite".into(),
        key: "path".into(),
        reason: "built without the sqlite feature".into(),
    })
}

pub fn cmd_list(service: &StockCardService, search: &str) -> Result<String, StockCardError> {
    Ok(render_card_list(&service.list_cards(search)?))
}

pub fn cmd_show(
    service: &StockCardService,
    id: &str,
    filter: MonthYearFilter,
) -> Result<String, StockCardError> {
    Ok(render_card_view(&service.view_card(id, filter)?))
}

pub fn cmd_create(service: &StockCardService, header: HeaderArgs) -> Result<String, StockCardError> {
    let card = service.create_card(header.merge_into(NewStockCard::default())?)?;
    Ok(format!("created {} ({})", card.id, card.item_name))
}

pub fn cmd_edit(
    service: &StockCardService,
    id: &str,
    header: HeaderArgs,
) -> Result<String, StockCardError> {
    let current = service.view_card(id, MonthYearFilter::default())?.card;
    let card = service.update_card(id, header.merge_into(current.header())?)?;
    Ok(format!("updated {} ({})", card.id, card.item_name))
}

pub fn cmd_delete(service: &StockCardService, id: &str) -> Result<String, StockCardError> {
    let removed = service.delete_card(id)?;
    Ok(format!("deleted {id} and {removed} transaction(s)"))
}

pub fn cmd_add_tx(
    service: &StockCardService,
    card_id: &str,
    tx: &TransactionArgs,
) -> Result<String, StockCardError> {
    let (tx_id, ledger) = service.add_transaction(card_id, tx.to_new()?)?;
    Ok(format!(
        "added {tx_id}; current balance {}",
        ledger.current_balance
    ))
}

pub fn cmd_remove_tx(
    service: &StockCardService,
    card_id: &str,
    tx_id: &str,
) -> Result<String, StockCardError> {
    let ledger = service.remove_transaction(card_id, tx_id)?;
    Ok(format!(
        "removed {tx_id}; current balance {}",
        ledger.current_balance
    ))
}

pub fn cmd_recompute(service: &StockCardService, card_id: &str) -> Result<String, StockCardError> {
    let fixed = service.recompute_card(card_id)?;
    Ok(format!("{fixed} balance(s) rewritten"))
}

pub fn cmd_check(service: &StockCardService, card_id: &str) -> Result<String, StockCardError> {
    match service.check_card(card_id)? {
        None => Ok("balances consistent".to_string()),
        Some(tx_id) => Err(StockCardError::Persistence {
            reason: format!("stale balance at transaction {tx_id}; run `stockcard recompute {card_id}`"),
        }),
    }
}

pub fn cmd_export(
    service: &StockCardService,
    config: &dyn ConfigPort,
    card_id: &str,
    format: ExportFormat,
    output: Option<&Path>,
    template: Option<&Path>,
    filter: MonthYearFilter,
) -> Result<String, StockCardError> {
    let view = service.view_card(card_id, filter)?;

    let exporter: Box<dyn ExportPort> = match format {
        ExportFormat::Csv => Box::new(CsvExporter::new().with_filter(filter)),
        ExportFormat::Typst => {
            let mut typst = TypstExporter::new().with_filter(filter);
            let template = template
                .map(Path::to_path_buf)
                .or_else(|| config.get_string("export", "template_path").map(PathBuf::from));
            if let Some(path) = template {
                typst = typst.with_template_file(&path)?;
            }
            Box::new(typst)
        }
    };

    let path = match output {
        Some(p) => p.to_path_buf(),
        None => {
            let dir = config
                .get_string("export", "output_dir")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("."));
            dir.join(exporter.default_file_name(&view.card))
        }
    };

    exporter.write(&view.card, &view.ledger, &path)?;
    info!(card_id, path = %path.display(), "exported stock card");
    Ok(format!("wrote {}", path.display()))
}

pub fn render_card_list(cards: &[CardSummary]) -> String {
    if cards.is_empty() {
        return "No stock cards found.".to_string();
    }

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<32}  {:<10}  {:<24}  {:>8}  {:>8}  {:<10}",
        "ID", "STOCK NO", "ITEM", "BALANCE", "REORDER", "UPDATED"
    );
    for c in cards {
        let updated = c
            .last_updated
            .map(|d| d.format(DATE_FORMAT).to_string())
            .unwrap_or_else(|| "-".to_string());
        let flag = if c.needs_reorder() { "  !" } else { "" };
        let _ = writeln!(
            out,
            "{:<32}  {:<10}  {:<24}  {:>8}  {:>8}  {:<10}{}",
            c.id, c.stock_no, c.item_name, c.current_balance, c.reorder_point, updated, flag
        );
    }
    out.trim_end().to_string()
}

pub fn render_card_view(view: &CardView) -> String {
    let card = &view.card;
    let mut out = String::from("STOCK CARD\n\n");
    let _ = writeln!(out, "Entity Name: {:<30} Fund Cluster: {}", card.entity_name, card.fund_cluster);
    let _ = writeln!(out, "Item: {:<37} Stock No.: {}", card.item_name, card.stock_no);
    let _ = writeln!(out, "Description: {:<30} Re-order Point: {}", card.description, card.reorder_point);
    let _ = writeln!(out, "Unit of Measurement: {}", card.unit_of_measurement);
    out.push('\n');

    if view.filter.is_active() {
        let _ = writeln!(out, "Filter: {}", view.filter.describe());
    }
    if !view.years.is_empty() {
        let years: Vec<String> = view.years.iter().map(|y| y.to_string()).collect();
        let _ = writeln!(out, "Years: {}", years.join(", "));
    }

    let _ = writeln!(
        out,
        "{:<10}  {:<16}  {:>8}  {:>8}  {:<18}  {:>8}  {:>6}",
        "DATE", "REFERENCE", "RECEIPT", "ISSUE", "OFFICE", "BALANCE", "DAYS"
    );
    let visible = view.visible();
    if visible.is_empty() {
        let period = if view.filter.is_active() {
            " for the selected filters"
        } else {
            ""
        };
        let _ = writeln!(out, "No transactions found{period}.");
    }
    for t in visible {
        let _ = writeln!(
            out,
            "{:<10}  {:<16}  {:>8}  {:>8}  {:<18}  {:>8}  {:>6}",
            t.date.format(DATE_FORMAT).to_string(),
            t.reference,
            t.receipt_qty,
            t.issue_qty,
            t.issue_office,
            t.balance_qty,
            t.days_to_consume
        );
    }

    out.push('\n');
    let _ = write!(
        out,
        "Current balance: {} {}",
        view.summary.current_balance, card.unit_of_measurement
    );
    out.trim_end().to_string()
}
