use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use validator::ValidateEmail;

/// Input URLs split by whether they match the target site's product-URL shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlPartition {
    pub valid: Vec<String>,
    pub invalid: Vec<String>,
}

impl UrlPartition {
    pub fn has_valid(&self) -> bool {
        !self.valid.is_empty()
    }

    pub fn has_invalid(&self) -> bool {
        !self.invalid.is_empty()
    }
}

/// Partition `urls` into those starting with `prefix` and everything else.
///
/// Input order is preserved within each side. Surrounding whitespace is
/// trimmed and empty entries are dropped.
pub fn validate_urls<I, S>(urls: I, prefix: &str) -> UrlPartition
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut partition = UrlPartition::default();

    for url in urls {
        let url = url.as_ref().trim();
        if url.is_empty() {
            continue;
        }

        if url.starts_with(prefix) && url::Url::parse(url).is_ok() {
            partition.valid.push(url.to_string());
        } else {
            partition.invalid.push(url.to_string());
        }
    }

    partition
}

pub fn is_valid_email(address: &str) -> bool {
    address.validate_email()
}

/// E.164 style phone numbers, e.g. `+15551234567`.
pub fn is_valid_phone_number(number: &str) -> bool {
    static PHONE_RE: OnceLock<Regex> = OnceLock::new();
    let re = PHONE_RE.get_or_init(|| {
        Regex::new(r"^\+[1-9]\d{6,14}$").expect("phone regex is valid")
    });
    re.is_match(number)
}
