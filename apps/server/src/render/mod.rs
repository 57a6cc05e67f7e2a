//! Report rendering.
//!
//! Every tabular report is first built as a [`TableReport`] and then
//! rendered either as an HTML page ([`html`]) or as a PDF ([`pdf`]).
//!
//! ```text
//! ReportService rows ──► tables::*() ──► TableReport ──┬──► html::table_page()
//!                                                      └──► pdf::table_document()
//! ```

pub mod html;
pub mod pdf;
pub mod tables;

use chrono::{DateTime, Utc};

/// A titled table ready for rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableReport {
    pub title: String,
    pub subtitle: Option<String>,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// Closing line under the table, e.g. a grand total.
    pub footer: Option<String>,
    pub generated_at: DateTime<Utc>,
}

impl TableReport {
    pub fn new<I, S>(title: impl Into<String>, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        TableReport {
            title: title.into(),
            subtitle: None,
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
            footer: None,
            generated_at: Utc::now(),
        }
    }

    pub fn subtitle(mut self, subtitle: impl Into<String>) -> Self {
        self.subtitle = Some(subtitle.into());
        self
    }

    pub fn footer(mut self, footer: impl Into<String>) -> Self {
        self.footer = Some(footer.into());
        self
    }

    pub fn push_row(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// "Generated: 2024-03-01 14:05 UTC"
    pub fn generated_label(&self) -> String {
        format!("Generated: {}", self.generated_at.format("%Y-%m-%d %H:%M UTC"))
    }
}
