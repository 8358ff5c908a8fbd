use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A product line item as it arrives from the raw transaction tables. Brand
/// and SKU fields are noisy free text; resolution to a canonical category is
/// the taxonomy resolver's job.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub brand_name: Option<String>,
    pub sku_code: Option<String>,
    pub description: Option<String>,
    pub quantity: u32,
    pub unit_price: Decimal,
}

/// Which level of the taxonomy waterfall produced a category.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionSource {
    Sku,
    Brand,
    Unmapped,
}

/// The authoritative category attached to a line item after resolution.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedCategory {
    pub category_code: String,
    pub category_name: String,
    pub department_code: String,
    pub source: ResolutionSource,
}

impl ResolvedCategory {
    /// Category literal used when no mapping exists for an item.
    pub const UNSPECIFIED: &'static str = "unspecified";

    pub fn unmapped() -> Self {
        Self {
            category_code: Self::UNSPECIFIED.to_string(),
            category_name: Self::UNSPECIFIED.to_string(),
            department_code: Self::UNSPECIFIED.to_string(),
            source: ResolutionSource::Unmapped,
        }
    }

    pub fn is_unspecified(&self) -> bool {
        self.category_code == Self::UNSPECIFIED
    }
}
