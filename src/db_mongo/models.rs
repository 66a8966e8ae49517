use mongodb::bson::{self, Bson, Document};
use serde::{Deserialize, Serialize};

use crate::error::StoreResult;

/// A currency pair and its conversion rate.
///
/// No `_id` field: the store assigns one on insertion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeRate {
    pub source: String,
    pub target: String,
    pub rate: f64,
}

impl ExchangeRate {
    pub fn new(source: impl Into<String>, target: impl Into<String>, rate: f64) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            rate,
        }
    }

    /// The record written by every run
    pub fn usd_mxn() -> Self {
        Self::new("USD", "MXN", 18.68)
    }

    pub fn to_document(&self) -> StoreResult<Document> {
        Ok(bson::to_document(self)?)
    }

    /// Decode a stored document, ignoring `_id`
    pub fn from_document(document: &Document) -> Option<Self> {
        bson::from_document(document.clone()).ok()
    }
}

/// True when `document` carries exactly `source`, `target` and `rate`
/// (besides `_id`), with string currencies and a positive numeric rate.
pub fn is_exchange_rate_shape(document: &Document) -> bool {
    let mut keys: Vec<&str> = document
        .keys()
        .map(String::as_str)
        .filter(|k| *k != "_id")
        .collect();
    keys.sort_unstable();
    if keys != ["rate", "source", "target"] {
        return false;
    }

    let currencies_ok = document.get_str("source").is_ok() && document.get_str("target").is_ok();
    let rate = match document.get("rate") {
        Some(Bson::Double(v)) => *v,
        Some(Bson::Int32(v)) => f64::from(*v),
        Some(Bson::Int64(v)) => *v as f64,
        _ => return false,
    };

    currencies_ok && rate > 0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::doc;

    #[test]
    fn test_usd_mxn_document() {
        let document = ExchangeRate::usd_mxn().to_document().unwrap();
        assert_eq!(document, doc! { "source": "USD", "target": "MXN", "rate": 18.68 });
        assert!(is_exchange_rate_shape(&document));
    }

    #[test]
    fn test_from_document_ignores_id() {
        let document = doc! { "_id": "abc", "source": "EUR", "target": "USD", "rate": 1.09 };
        assert_eq!(
            ExchangeRate::from_document(&document),
            Some(ExchangeRate::new("EUR", "USD", 1.09))
        );
    }

    #[test]
    fn test_shape_rejects_extra_or_missing_keys() {
        assert!(!is_exchange_rate_shape(&doc! { "source": "USD", "target": "MXN" }));
        assert!(!is_exchange_rate_shape(
            &doc! { "source": "USD", "target": "MXN", "rate": 18.68, "note": "x" }
        ));
    }

    #[test]
    fn test_shape_requires_positive_rate() {
        assert!(!is_exchange_rate_shape(&doc! { "source": "USD", "target": "MXN", "rate": 0.0 }));
        assert!(!is_exchange_rate_shape(&doc! { "source": "USD", "target": "MXN", "rate": "18.68" }));
        assert!(is_exchange_rate_shape(&doc! { "_id": 1, "source": "USD", "target": "MXN", "rate": 18 }));
    }
}
