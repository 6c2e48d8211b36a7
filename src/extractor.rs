use regex::Regex;
use rust_decimal::Decimal;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::config::SiteSelectors;
use crate::models::{ProductInfo, StockStatus};
use crate::utils::error::AppError;

/// Everything that could be read from one product page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extraction {
    /// `None` when neither the out-of-stock notice nor the add-to-bag
    /// button could be interpreted.
    pub stock: Option<StockStatus>,
    pub product: ProductInfo,
}

impl Extraction {
    pub fn status(&self) -> StockStatus {
        self.stock.unwrap_or(StockStatus::Unknown)
    }

    pub fn is_empty(&self) -> bool {
        self.stock.is_none() && self.product.is_empty()
    }
}

/// Turns raw page markup into structured product data. Implementations are
/// pure and site-specific.
pub trait ProductExtractor: Send + Sync {
    fn extract(&self, html: &str) -> Extraction;
}

struct CompiledSelectors {
    out_of_stock: Selector,
    add_to_bag: Selector,
    product_id: Selector,
    brand: Selector,
    name: Selector,
    price: Selector,
    description: Selector,
    rating: Selector,
    review_count: Selector,
}

/// Extractor driven entirely by configurable CSS selectors.
pub struct SelectorExtractor {
    selectors: CompiledSelectors,
    out_of_stock_text: String,
    product_id_prefix: String,
    price_parser: PriceParser,
}

fn compile(field: &str, selector: &str) -> Result<Selector, AppError> {
    Selector::parse(selector).map_err(|e| AppError::Parse {
        message: format!("Invalid CSS selector for {} '{}': {:?}", field, selector, e),
    })
}

impl SelectorExtractor {
    pub fn new(selectors: &SiteSelectors) -> Result<Self, AppError> {
        Ok(Self {
            selectors: CompiledSelectors {
                out_of_stock: compile("out_of_stock", &selectors.out_of_stock)?,
                add_to_bag: compile("add_to_bag", &selectors.add_to_bag)?,
                product_id: compile("product_id", &selectors.product_id)?,
                brand: compile("brand", &selectors.brand)?,
                name: compile("name", &selectors.name)?,
                price: compile("price", &selectors.price)?,
                description: compile("description", &selectors.description)?,
                rating: compile("rating", &selectors.rating)?,
                review_count: compile("review_count", &selectors.review_count)?,
            },
            out_of_stock_text: selectors.out_of_stock_text.to_lowercase(),
            product_id_prefix: selectors.product_id_prefix.clone(),
            price_parser: PriceParser::new(),
        })
    }

    fn detect_stock(&self, document: &Html) -> Option<StockStatus> {
        let unavailable = document
            .select(&self.selectors.out_of_stock)
            .any(|el| element_text(&el).to_lowercase().contains(&self.out_of_stock_text));
        if unavailable {
            return Some(StockStatus::OutOfStock);
        }

        // A disabled button is ambiguous (size not chosen, page still loading)
        match document.select(&self.selectors.add_to_bag).next() {
            Some(button) if button.value().attr("disabled").is_none() => Some(StockStatus::InStock),
            _ => None,
        }
    }

    fn first_text(&self, document: &Html, selector: &Selector) -> Option<String> {
        document
            .select(selector)
            .map(|el| element_text(&el))
            .find(|text| !text.is_empty())
    }

    fn extract_product(&self, document: &Html) -> ProductInfo {
        let product_id = self.first_text(document, &self.selectors.product_id).and_then(|text| {
            let id = text
                .strip_prefix(self.product_id_prefix.as_str())
                .unwrap_or(&text)
                .trim()
                .to_string();
            (!id.is_empty()).then_some(id)
        });

        let price = self
            .first_text(document, &self.selectors.price)
            .map(|text| match self.price_parser.parse(&text) {
                Some(price) => price.to_string(),
                None => text,
            });

        ProductInfo {
            product_id,
            brand: self.first_text(document, &self.selectors.brand),
            name: self.first_text(document, &self.selectors.name),
            price,
            description: self.first_text(document, &self.selectors.description),
            rating: self.first_text(document, &self.selectors.rating),
            review_count: self.first_text(document, &self.selectors.review_count),
        }
    }
}

impl ProductExtractor for SelectorExtractor {
    fn extract(&self, html: &str) -> Extraction {
        if html.trim().is_empty() {
            return Extraction::default();
        }

        let document = Html::parse_document(html);
        Extraction {
            stock: self.detect_stock(&document),
            product: self.extract_product(&document),
        }
    }
}

/// Collapse an element's text nodes into a single whitespace-normalised line.
fn element_text(element: &ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// A price read off the page, normalised to two decimal places.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Price {
    pub amount: Decimal,
    pub symbol: Option<String>,
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut amount = self.amount.round_dp(2);
        amount.rescale(2);
        match &self.symbol {
            Some(symbol) => write!(f, "{}{}", symbol, amount),
            None => write!(f, "{}", amount),
        }
    }
}

pub struct PriceParser {
    price_regex: Regex,
}

impl Default for PriceParser {
    fn default() -> Self {
        Self::new()
    }
}

impl PriceParser {
    pub fn new() -> Self {
        PriceParser {
            price_regex: Regex::new(
                r"(?P<symbol>[\$£€¥₹])?\s*(?P<amount>\d{1,3}(?:,\d{3})+(?:\.\d{1,2})?|\d+(?:\.\d{1,2})?)",
            )
            .unwrap(),
        }
    }

    /// First price-looking number in `text`, e.g. `"Sale $1,299.9"` gives `$1299.90`.
    pub fn parse(&self, text: &str) -> Option<Price> {
        let captures = self.price_regex.captures(text)?;
        let amount_str = captures.name("amount")?.as_str().replace(',', "");
        let amount = Decimal::from_str(&amount_str).ok()?;
        let symbol = captures.name("symbol").map(|m| m.as_str().to_string());
        Some(Price { amount, symbol })
    }
}
