//! Built-in Typst stock card template.
//!
//! Placeholders: `{{TITLE}}`, `{{HEADER_GRID}}`, `{{LEDGER_TABLE}}`,
//! `{{CURRENT_BALANCE}}`, `{{PERIOD}}`.

const TEMPLATE: &str = r#"#set page(paper: "a4", flipped: true, margin: 1.5cm)
#set text(size: 10pt)

#align(center)[= {{TITLE}}]

{{HEADER_GRID}}

_Period: {{PERIOD}}_

{{LEDGER_TABLE}}

#v(1em)
*Current balance:* {{CURRENT_BALANCE}}
"#;

pub fn template() -> &'static str {
    TEMPLATE
}
