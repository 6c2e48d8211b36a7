//! Operator-facing console output.

use console::style;
use dialoguer::{theme::ColorfulTheme, Confirm};
use std::time::Duration;

use crate::core::{CycleReporter, ReportRow, RunOutcome, RunSummary, StatusReport};
use crate::models::StockStatus;
use crate::utils::error::Result;

/// Prints progress lines and report tables to stdout.
#[derive(Debug, Clone, Default)]
pub struct ConsolePrinter {
    pub verbose: bool,
    /// Answer every confirmation with its default instead of prompting.
    pub assume_yes: bool,
}

impl ConsolePrinter {
    pub fn new(verbose: bool, assume_yes: bool) -> Self {
        Self { verbose, assume_yes }
    }

    pub fn theme(&self) -> ColorfulTheme {
        ColorfulTheme::default()
    }

    pub fn confirm(&self, prompt: &str, default: bool) -> Result<bool> {
        if self.assume_yes {
            return Ok(true);
        }
        Confirm::with_theme(&self.theme())
            .with_prompt(prompt)
            .default(default)
            .interact()
            .map_err(|e| crate::AppError::InvalidInput(format!("Confirmation failed: {}", e)))
    }

    pub fn print_header(&self, msg: &str) {
        println!();
        println!("{}", style(msg).bold());
    }

    pub fn print_info(&self, msg: &str) {
        println!("{} {}", style("[*]").cyan(), msg);
    }

    pub fn print_success(&self, msg: &str) {
        println!("{} {}", style("[+]").green(), style(msg).green());
    }

    pub fn print_warning(&self, msg: &str) {
        println!("{} {}", style("[!]").yellow(), style(msg).yellow());
    }

    pub fn print_error(&self, msg: &str) {
        eprintln!("{} {}", style("[-]").red(), style(msg).red());
    }

    pub fn print_report(&self, report: &StatusReport) {
        println!();
        println!("{}", report.render_table(self.verbose));
        println!("{}", style(report.summary()).dim());
    }
}

/// `Item 2/5 - IN STOCK` style line for one checked row.
pub fn progress_line(position: usize, total: usize, row: &ReportRow) -> String {
    let state = match row.status {
        StockStatus::InStock => "IN STOCK",
        StockStatus::OutOfStock => "Out of stock",
        StockStatus::Unknown => "Unable to determine",
    };
    format!("Item {}/{} - {}", position, total, state)
}

/// Every known field of a row, one per line.
pub fn product_details(row: &ReportRow) -> String {
    let product = row.product.clone().unwrap_or_default();
    let or_na = |value: Option<String>| value.unwrap_or_else(|| "N/A".to_string());

    let mut lines = vec![
        format!("URL: {}", row.url),
        format!("Web ID: {}", row.identifier()),
        format!("Brand: {}", row.brand()),
        format!("Name: {}", row.name()),
        format!("Price: {}", row.price()),
        format!("Status: {}", row.status.label()),
        format!("Rating: {}", or_na(product.rating)),
        format!("Reviews: {}", or_na(product.review_count)),
    ];
    if let Some(description) = product.description {
        lines.push(format!("Description: {}", description));
    }
    if let Some(error) = &row.error {
        lines.push(format!("Error: {}", error));
    }
    lines.join("\n")
}

impl CycleReporter for ConsolePrinter {
    fn cycle_started(&self, cycle: u32, active: usize) {
        self.print_header(&format!("Check #{}", cycle));
        self.print_info(&format!("Checking {} item(s)...", active));
    }

    fn item_checked(&self, position: usize, total: usize, row: &ReportRow) {
        let line = progress_line(position, total, row);
        match row.status {
            StockStatus::InStock => self.print_success(&line),
            StockStatus::OutOfStock => self.print_info(&line),
            StockStatus::Unknown => self.print_warning(&line),
        }

        if self.verbose {
            for detail in product_details(row).lines() {
                println!("    {}", detail);
            }
        }
    }

    fn cycle_finished(&self, report: &StatusReport) {
        self.print_report(report);
    }

    fn waiting(&self, interval: Duration) {
        self.print_info(&format!(
            "Waiting {} seconds before next check...",
            interval.as_secs()
        ));
    }

    fn finished(&self, summary: &RunSummary) {
        match summary.outcome {
            RunOutcome::Completed => self.print_success("All items are now in stock!"),
            RunOutcome::Interrupted => self.print_warning("Monitoring stopped."),
        }
    }
}
