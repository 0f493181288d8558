//! Normalised subscription sets

use std::collections::BTreeSet;
use std::fmt;

/// Ordered set of uppercase base-asset symbols
///
/// Entries are trimmed and uppercased; blanks and anything that is not
/// ASCII alphanumeric are dropped and duplicates collapse, so
/// `["btc", " BTC ", "", "usdt-trc20"]` becomes `{BTC}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct SymbolSet(BTreeSet<String>);

impl SymbolSet {
    pub fn new<I, S>(symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(
            symbols
                .into_iter()
                .filter_map(|s| {
                    let raw = s.as_ref();
                    let normalized = normalize_symbol(raw);
                    if normalized.is_none() && !raw.trim().is_empty() {
                        tracing::warn!(symbol = %raw, "Dropping invalid symbol");
                    }
                    normalized
                })
                .collect(),
        )
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Case-insensitive membership
    pub fn contains(&self, symbol: &str) -> bool {
        normalize_symbol(symbol).is_some_and(|s| self.0.contains(&s))
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.0.iter().cloned().collect()
    }
}

impl fmt::Display for SymbolSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}}", self.to_vec().join(","))
    }
}

impl<S: AsRef<str>> FromIterator<S> for SymbolSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter)
    }
}

/// Trim and uppercase.
///
/// `None` for blank input or anything outside `[A-Za-z0-9]`, since the
/// symbol is spliced verbatim into a stream channel name.
pub fn normalize_symbol(symbol: &str) -> Option<String> {
    let trimmed = symbol.trim();
    let valid = !trimmed.is_empty() && trimmed.chars().all(|c| c.is_ascii_alphanumeric());
    valid.then(|| trimmed.to_ascii_uppercase())
}
