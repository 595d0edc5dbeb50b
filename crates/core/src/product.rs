//! Catalog product model.
//!
//! Products are static data compiled into the storefront; nothing mutates
//! them at runtime.

use serde::{Deserialize, Serialize};

use crate::types::{Price, ProductId};

/// Product line a label kit belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProductCategory {
    /// Pre-printed label kits for common panel sizes.
    #[default]
    Standard,
    /// Labels printed to the customer's circuit list.
    Custom,
    /// Multi-panel packs for contractors.
    Bulk,
}

impl ProductCategory {
    /// All categories in display order.
    pub const ALL: [Self; 3] = [Self::Standard, Self::Custom, Self::Bulk];

    /// URL/query-string form of the category.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Custom => "custom",
            Self::Bulk => "bulk",
        }
    }

    /// Human readable label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Standard => "Standard Kits",
            Self::Custom => "Custom Printed",
            Self::Bulk => "Contractor Bulk Packs",
        }
    }

    /// Parse from the query-string form, case-insensitively.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standard" => Some(Self::Standard),
            "custom" => Some(Self::Custom),
            "bulk" => Some(Self::Bulk),
            _ => None,
        }
    }
}

/// Kind of electrical panel the labels are sized for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PanelType {
    /// Residential load center.
    Residential,
    /// Commercial lighting/appliance panelboard.
    Commercial,
    /// Sub-panel (garage, shop, ADU).
    SubPanel,
    /// Fits any of the above.
    Universal,
}

impl PanelType {
    /// Human readable label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Residential => "Residential",
            Self::Commercial => "Commercial",
            Self::SubPanel => "Sub-Panel",
            Self::Universal => "Universal",
        }
    }
}

/// Physical specification block shown on the product page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSpecs {
    pub material: &'static str,
    pub dimensions: &'static str,
    pub adhesive: &'static str,
    pub temperature_range: &'static str,
    pub compliance: &'static str,
}

/// A product in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Product {
    pub id: ProductId,
    pub slug: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub price: Price,
    pub category: ProductCategory,
    /// Number of breaker slots the kit covers.
    pub slot_count: u32,
    pub panel_type: PanelType,
    pub features: &'static [&'static str],
    pub specs: ProductSpecs,
    pub stock: u32,
    pub tags: &'static [&'static str],
    /// Path of the product image under `/static`.
    pub image: &'static str,
}

impl Product {
    /// Returns true when at least one unit is available.
    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.stock > 0
    }

    /// Returns true when stock is positive but at or below `threshold`.
    #[must_use]
    pub const fn is_low_stock(&self, threshold: u32) -> bool {
        self.stock > 0 && self.stock <= threshold
    }
}
