//! Normalized content blocks and menu item derivation
//!
//! Extraction normalizes a proposal into [`ContentBlock`]s. Each iteration
//! the controller derives fresh [`MenuItem`]s by merging item records with
//! whatever image descriptions the analysis phase produced. Menu items are
//! read-only views; they are never mutated across iterations, only
//! re-derived.

use crate::document::{AnchorId, ImageDescription};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Name substituted when extraction could not recover one.
///
/// Keeps the non-empty-name invariant; the critique agent surfaces the gap
/// as an incompleteness defect instead of the item being dropped.
pub const UNNAMED_ITEM: &str = "Unnamed item";

/// Currency tag for a price
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Currency {
    /// US dollar
    Usd,
    /// Euro
    Eur,
    /// Pound sterling
    Gbp,
}

impl Currency {
    /// Display symbol for the currency
    #[inline]
    #[must_use]
    pub fn symbol(&self) -> &'static str {
        match self {
            Currency::Usd => "$",
            Currency::Eur => "€",
            Currency::Gbp => "£",
        }
    }
}

/// Nonnegative amount in minor units, currency-tagged
///
/// Nonnegativity holds by construction (unsigned minor units).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Price {
    minor_units: u64,
    currency: Currency,
}

impl Price {
    /// Create a price from minor units (cents)
    #[inline]
    #[must_use]
    pub fn new(minor_units: u64, currency: Currency) -> Self {
        Self {
            minor_units,
            currency,
        }
    }

    /// Amount in minor units
    #[inline]
    #[must_use]
    pub fn minor_units(&self) -> u64 {
        self.minor_units
    }

    /// Currency tag
    #[inline]
    #[must_use]
    pub fn currency(&self) -> Currency {
        self.currency
    }

    /// Parse a price string such as `$12.50`, `€9`, or `£7.5`
    ///
    /// A bare number is read as US dollars, matching the proposal format.
    ///
    /// # Errors
    /// Returns [`PriceError`] when the input is not a nonnegative decimal
    /// with at most two fractional digits, or the amount overflows.
    pub fn parse(input: &str) -> Result<Self, PriceError> {
        let s = input.trim();
        let (currency, rest) = if let Some(r) = s.strip_prefix('$') {
            (Currency::Usd, r)
        } else if let Some(r) = s.strip_prefix('€') {
            (Currency::Eur, r)
        } else if let Some(r) = s.strip_prefix('£') {
            (Currency::Gbp, r)
        } else {
            (Currency::Usd, s)
        };

        let rest = rest.trim();
        let (whole, frac) = match rest.split_once('.') {
            Some((w, f)) => (w, f),
            None => (rest, ""),
        };

        if whole.is_empty()
            || !whole.bytes().all(|b| b.is_ascii_digit())
            || !frac.bytes().all(|b| b.is_ascii_digit())
            || frac.len() > 2
        {
            return Err(PriceError::Unrecognized(input.to_string()));
        }

        let units: u64 = whole
            .parse()
            .map_err(|_| PriceError::OutOfRange(input.to_string()))?;
        let cents: u64 = match frac.len() {
            0 => 0,
            1 => frac.parse::<u64>().expect("digits checked") * 10,
            _ => frac.parse().expect("digits checked"),
        };

        units
            .checked_mul(100)
            .and_then(|c| c.checked_add(cents))
            .map(|minor_units| Self::new(minor_units, currency))
            .ok_or_else(|| PriceError::OutOfRange(input.to_string()))
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}.{:02}",
            self.currency.symbol(),
            self.minor_units / 100,
            self.minor_units % 100
        )
    }
}

/// Errors from parsing price strings
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PriceError {
    /// Input is not a recognizable nonnegative decimal
    #[error("unrecognized price format: {0:?}")]
    Unrecognized(String),

    /// Amount does not fit in minor units
    #[error("price out of range: {0:?}")]
    OutOfRange(String),
}

/// A structural block recognized in the source document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContentBlock {
    /// Free text outside the menu section
    Text(String),
    /// A best-effort menu item record
    Item(ItemRecord),
    /// An image anchor not attached to any item
    ImageAnchor(AnchorId),
}

/// Best-effort menu item record produced by extraction
///
/// Partial records are retained rather than dropped; downstream critique is
/// expected to flag incompleteness.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRecord {
    /// Item name (may be empty for a partial record)
    pub name: String,
    /// Customer-facing description
    pub description: String,
    /// Price, when the proposal states one
    pub price: Option<Price>,
    /// Category heading the item appeared under
    pub category: Option<String>,
    /// Anchor of the item's image, when referenced
    pub anchor: Option<AnchorId>,
}

impl ItemRecord {
    /// Create a record with just a name
    #[inline]
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            price: None,
            category: None,
            anchor: None,
        }
    }

    /// With a description
    #[inline]
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// With a price
    #[inline]
    #[must_use]
    pub fn with_price(mut self, price: Price) -> Self {
        self.price = Some(price);
        self
    }

    /// With a category
    #[inline]
    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// With an image anchor
    #[inline]
    #[must_use]
    pub fn with_anchor(mut self, anchor: AnchorId) -> Self {
        self.anchor = Some(anchor);
        self
    }
}

/// Canonical menu item: record merged with its resolved image description
///
/// # Invariants
/// - `name` is non-empty ([`UNNAMED_ITEM`] substituted when extraction
///   yielded none)
/// - `price`, if present, is well-formed and nonnegative
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItem {
    /// Item name, always non-empty
    pub name: String,
    /// Customer-facing description
    pub description: String,
    /// Price, when known
    pub price: Option<Price>,
    /// Category, when known
    pub category: Option<String>,
    /// Resolved image description (analyzed or placeholder)
    pub image: Option<ImageDescription>,
}

impl MenuItem {
    /// Derive menu items fresh from content blocks and image descriptions
    ///
    /// Order follows the blocks' order in the document. Records whose anchor
    /// has no description entry keep `image: None`; the analysis phase is
    /// responsible for recording a placeholder for every known anchor before
    /// this is called.
    #[must_use]
    pub fn derive(
        blocks: &[ContentBlock],
        descriptions: &IndexMap<AnchorId, ImageDescription>,
    ) -> Vec<MenuItem> {
        blocks
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Item(record) => {
                    let name = if record.name.trim().is_empty() {
                        UNNAMED_ITEM.to_string()
                    } else {
                        record.name.clone()
                    };
                    let image = record
                        .anchor
                        .as_ref()
                        .and_then(|a| descriptions.get(a))
                        .cloned();
                    Some(MenuItem {
                        name,
                        description: record.description.clone(),
                        price: record.price,
                        category: record.category.clone(),
                        image,
                    })
                }
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn price_parse_dollar_and_cents() {
        let price = Price::parse("$12.50").unwrap();
        assert_eq!(price.minor_units(), 1250);
        assert_eq!(price.currency(), Currency::Usd);
        assert_eq!(price.to_string(), "$12.50");
    }

    #[test]
    fn price_parse_whole_and_single_digit_fraction() {
        assert_eq!(Price::parse("€9").unwrap().minor_units(), 900);
        assert_eq!(Price::parse("£7.5").unwrap().minor_units(), 750);
    }

    #[test]
    fn price_parse_bare_number_defaults_to_usd() {
        let price = Price::parse("4.25").unwrap();
        assert_eq!(price.currency(), Currency::Usd);
        assert_eq!(price.minor_units(), 425);
    }

    #[test]
    fn price_parse_rejects_garbage() {
        assert!(matches!(
            Price::parse("market price"),
            Err(PriceError::Unrecognized(_))
        ));
        assert!(matches!(Price::parse("$-3"), Err(PriceError::Unrecognized(_))));
        assert!(matches!(Price::parse("$1.234"), Err(PriceError::Unrecognized(_))));
    }

    #[test]
    fn price_parse_rejects_overflow() {
        let huge = format!("${}", u64::MAX);
        assert!(matches!(Price::parse(&huge), Err(PriceError::OutOfRange(_))));
    }

    #[test]
    fn derive_merges_descriptions_by_anchor() {
        let anchor = AnchorId::new("img-cal");
        let blocks = vec![
            ContentBlock::Text("About us".to_string()),
            ContentBlock::Item(
                ItemRecord::named("Crispy Calamari")
                    .with_price(Price::new(1250, Currency::Usd))
                    .with_anchor(anchor.clone()),
            ),
        ];
        let mut descriptions = IndexMap::new();
        descriptions.insert(
            anchor.clone(),
            ImageDescription::analyzed(
                anchor,
                BTreeSet::from(["fried".to_string()]),
                "Golden calamari rings",
            ),
        );

        let items = MenuItem::derive(&blocks, &descriptions);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "Crispy Calamari");
        assert!(items[0].image.is_some());
    }

    #[test]
    fn derive_substitutes_placeholder_name() {
        let blocks = vec![ContentBlock::Item(
            ItemRecord::named("  ").with_description("mystery dish"),
        )];
        let items = MenuItem::derive(&blocks, &IndexMap::new());
        assert_eq!(items[0].name, UNNAMED_ITEM);
    }

    #[test]
    fn derive_is_repeatable() {
        let blocks = vec![
            ContentBlock::Item(ItemRecord::named("A")),
            ContentBlock::Item(ItemRecord::named("B")),
        ];
        let first = MenuItem::derive(&blocks, &IndexMap::new());
        let second = MenuItem::derive(&blocks, &IndexMap::new());
        assert_eq!(first, second);
    }
}
