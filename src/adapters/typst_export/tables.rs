//! Typst markup for the stock card header grid and ledger table.

use crate::domain::stock_card::StockCard;
use crate::domain::transaction::{Transaction, DATE_FORMAT};

/// Content block holding `text` as a Typst string literal, so markup
/// characters in user input are rendered verbatim.
pub fn text_cell(text: &str) -> String {
    let escaped = text.replace('\\', "\\\\").replace('"', "\\\"");
    format!("[#\"{}\"]", escaped)
}

pub fn render_header_grid(card: &StockCard) -> String {
    let fields = [
        ("Entity Name", card.entity_name.clone()),
        ("Fund Cluster", card.fund_cluster.clone()),
        ("Item", card.item_name.clone()),
        ("Stock No.", card.stock_no.clone()),
        ("Description", card.description.clone()),
        ("Re-order Point", card.reorder_point.to_string()),
        ("Unit of Measurement", card.unit_of_measurement.clone()),
    ];

    let mut out = String::from("#grid(\n  columns: (auto, 1fr, auto, 1fr),\n  gutter: 6pt,\n");
    for (label, value) in fields.iter() {
        out.push_str(&format!("  [*{}:*], {},\n", label, text_cell(value)));
    }
    out.push(')');
    out
}

pub fn render_ledger_table(transactions: &[&Transaction]) -> String {
    if transactions.is_empty() {
        return "_No transactions recorded._".to_string();
    }

    let mut out = String::from(
        "#table(\n  columns: 7,\n  align: (left, left, right, right, left, right, right),\n",
    );
    out.push_str(
        "  [*Date*], [*Reference*], [*Receipt Qty.*], [*Issue Qty.*], [*Office*], [*Balance Qty.*], [*No. of Days to Consume*],\n",
    );

    for t in transactions {
        out.push_str(&format!(
            "  [{}], {}, [{}], [{}], {}, [{}], [{}],\n",
            t.date.format(DATE_FORMAT),
            text_cell(&t.reference),
            t.receipt_qty,
            t.issue_qty,
            text_cell(&t.issue_office),
            t.balance_qty,
            t.days_to_consume,
        ));
    }

    out.push(')');
    out
}
