//! Catalog of popular stocks offered for selection.

use serde::{Deserialize, Serialize};

/// A selectable stock: display label and ticker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub label: String,
    pub ticker: String,
}

impl CatalogEntry {
    pub fn new(label: &str, ticker: &str) -> Self {
        Self {
            label: label.to_string(),
            ticker: ticker.to_string(),
        }
    }
}

/// Ordered list of selectable stocks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self {
            entries: vec![
                CatalogEntry::new("Apple (AAPL)", "AAPL"),
                CatalogEntry::new("Microsoft (MSFT)", "MSFT"),
                CatalogEntry::new("Amazon (AMZN)", "AMZN"),
                CatalogEntry::new("Google (GOOGL)", "GOOGL"),
                CatalogEntry::new("Tesla (TSLA)", "TSLA"),
                CatalogEntry::new("Meta (META)", "META"),
                CatalogEntry::new("NVIDIA (NVDA)", "NVDA"),
                CatalogEntry::new("Berkshire Hathaway (BRK-B)", "BRK-B"),
                CatalogEntry::new("JPMorgan Chase (JPM)", "JPM"),
                CatalogEntry::new("Visa (V)", "V"),
            ],
        }
    }
}

impl Catalog {
    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    /// Map a catalog label or ticker to a ticker; free text passes through uppercased.
    ///
    /// Returns `None` for blank input.
    pub fn resolve(&self, input: &str) -> Option<String> {
        let input = input.trim();
        if input.is_empty() {
            return None;
        }
        let known = self.entries.iter().find(|e| {
            e.label.eq_ignore_ascii_case(input) || e.ticker.eq_ignore_ascii_case(input)
        });
        Some(match known {
            Some(entry) => entry.ticker.clone(),
            None => input.to_uppercase(),
        })
    }

    /// Resolve several inputs, dropping blanks and duplicates while keeping order.
    pub fn resolve_all<I, S>(&self, inputs: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut tickers: Vec<String> = Vec::new();
        for ticker in inputs.into_iter().filter_map(|i| self.resolve(i.as_ref())) {
            if !tickers.contains(&ticker) {
                tickers.push(ticker);
            }
        }
        tickers
    }
}
