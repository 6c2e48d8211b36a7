use serde::{Deserialize, Serialize};

/// Best-effort product metadata scraped from a product page.
///
/// Every field is independently optional: a page with a renamed price block
/// still yields the brand and name.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProductInfo {
    pub product_id: Option<String>,
    pub brand: Option<String>,
    pub name: Option<String>,
    pub price: Option<String>,
    pub description: Option<String>,
    pub rating: Option<String>,
    pub review_count: Option<String>,
}

impl ProductInfo {
    /// True when no field was extracted at all.
    pub fn is_empty(&self) -> bool {
        self.product_id.is_none()
            && self.brand.is_none()
            && self.name.is_none()
            && self.price.is_none()
            && self.description.is_none()
            && self.rating.is_none()
            && self.review_count.is_none()
    }

    /// Overlay the fields present in `fresh`; fields missing from `fresh`
    /// keep their previous value.
    pub fn merge_from(&mut self, fresh: &ProductInfo) {
        fn overlay(slot: &mut Option<String>, fresh: &Option<String>) {
            if let Some(value) = fresh {
                *slot = Some(value.clone());
            }
        }

        overlay(&mut self.product_id, &fresh.product_id);
        overlay(&mut self.brand, &fresh.brand);
        overlay(&mut self.name, &fresh.name);
        overlay(&mut self.price, &fresh.price);
        overlay(&mut self.description, &fresh.description);
        overlay(&mut self.rating, &fresh.rating);
        overlay(&mut self.review_count, &fresh.review_count);
    }

    /// "Brand Name", or whichever half is known.
    pub fn display_name(&self) -> Option<String> {
        match (&self.brand, &self.name) {
            (Some(brand), Some(name)) => Some(format!("{} {}", brand, name)),
            (None, Some(name)) => Some(name.clone()),
            (Some(brand), None) => Some(brand.clone()),
            (None, None) => None,
        }
    }
}
