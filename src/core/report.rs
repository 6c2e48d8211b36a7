use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{ProductInfo, StockStatus};

const NOT_AVAILABLE: &str = "N/A";
const NEVER: &str = "Never";

const ID_WIDTH: usize = 12;
const BRAND_WIDTH: usize = 16;
const NAME_WIDTH: usize = 32;

/// Where a report row's metadata came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MetadataSource {
    /// Extracted during this cycle (merged over earlier knowledge).
    Live,
    /// This cycle produced nothing; shown from an earlier cycle.
    Cached,
    /// Nothing has ever been extracted for this URL.
    Missing,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReportRow {
    pub url: String,
    pub status: StockStatus,
    pub product: Option<ProductInfo>,
    pub source: MetadataSource,
    pub last_checked: Option<DateTime<Utc>>,
    pub error: Option<String>,
    pub notified: bool,
}

impl ReportRow {
    pub fn identifier(&self) -> &str {
        self.field(|p| p.product_id.as_deref())
    }

    pub fn brand(&self) -> &str {
        self.field(|p| p.brand.as_deref())
    }

    pub fn name(&self) -> &str {
        self.field(|p| p.name.as_deref())
    }

    pub fn price(&self) -> &str {
        self.field(|p| p.price.as_deref())
    }

    pub fn last_checked_display(&self) -> String {
        self.last_checked
            .map(|at| at.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| NEVER.to_string())
    }

    fn field<'a>(&'a self, pick: impl Fn(&'a ProductInfo) -> Option<&'a str>) -> &'a str {
        self.product.as_ref().and_then(pick).unwrap_or(NOT_AVAILABLE)
    }
}

/// Outcome of one check cycle, covering every URL checked in it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusReport {
    pub cycle: u32,
    pub generated_at: DateTime<Utc>,
    pub rows: Vec<ReportRow>,
    /// URLs still being watched after this cycle.
    pub remaining: usize,
    pub complete: bool,
}

impl StatusReport {
    pub fn count(&self, status: StockStatus) -> usize {
        self.rows.iter().filter(|row| row.status == status).count()
    }

    pub fn summary(&self) -> String {
        format!(
            "Check #{}: {} checked, {} in stock, {} out of stock, {} unknown, {} remaining",
            self.cycle,
            self.rows.len(),
            self.count(StockStatus::InStock),
            self.count(StockStatus::OutOfStock),
            self.count(StockStatus::Unknown),
            self.remaining
        )
    }

    /// Plain-text table of the report. Without `verbose`, long identifiers,
    /// brands and names are shortened for display.
    pub fn render_table(&self, verbose: bool) -> String {
        let headers = ["ID", "Brand", "Name", "Status", "Price", "Last Checked"];
        let limits = [ID_WIDTH, BRAND_WIDTH, NAME_WIDTH];

        let rows: Vec<[String; 6]> = self
            .rows
            .iter()
            .map(|row| {
                let shorten = |text: &str, limit: usize| {
                    if verbose {
                        text.to_string()
                    } else {
                        truncate(text, limit)
                    }
                };
                [
                    shorten(row.identifier(), limits[0]),
                    shorten(row.brand(), limits[1]),
                    shorten(row.name(), limits[2]),
                    row.status.label().to_string(),
                    row.price().to_string(),
                    row.last_checked_display(),
                ]
            })
            .collect();

        let mut widths = headers.map(|h| h.chars().count());
        for row in &rows {
            for (width, cell) in widths.iter_mut().zip(row.iter()) {
                *width = (*width).max(cell.chars().count());
            }
        }

        let format_line = |cells: &[String]| {
            cells
                .iter()
                .zip(widths.iter())
                .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
                .collect::<Vec<_>>()
                .join("  ")
                .trim_end()
                .to_string()
        };

        let mut lines = Vec::with_capacity(rows.len() + 2);
        lines.push(format_line(&headers.map(str::to_string)));
        lines.push(
            widths
                .iter()
                .map(|w| "-".repeat(*w))
                .collect::<Vec<_>>()
                .join("  "),
        );
        for row in &rows {
            lines.push(format_line(row));
        }

        lines.join("\n")
    }
}

/// Shorten `text` to at most `max` characters, marking the cut with "...".
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    if max <= 3 {
        return text.chars().take(max).collect();
    }
    let kept: String = text.chars().take(max - 3).collect();
    format!("{}...", kept.trim_end())
}
