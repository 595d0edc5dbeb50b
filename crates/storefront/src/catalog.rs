//! Static product catalog.
//!
//! The catalog is compiled in. Products are never mutated at runtime; stock
//! counts are display data only.

use std::sync::LazyLock;

use panel_labels_core::{PanelType, Price, Product, ProductCategory, ProductId, ProductSpecs};

/// Stock at or below which the product page shows a low-stock notice.
pub const LOW_STOCK_THRESHOLD: u32 = 10;

const VINYL_SPECS: ProductSpecs = ProductSpecs {
    material: "UV-resistant laminated vinyl",
    dimensions: "0.5\" x 2.25\" per label",
    adhesive: "Permanent acrylic",
    temperature_range: "-40°F to 180°F",
    compliance: "NEC 408.4(A) circuit directory",
};

const POLYESTER_SPECS: ProductSpecs = ProductSpecs {
    material: "Industrial polyester, matte overlaminate",
    dimensions: "0.75\" x 2.5\" per label",
    adhesive: "High-tack permanent acrylic",
    temperature_range: "-40°F to 250°F",
    compliance: "NEC 408.4(A), UL 969 recognized",
};

static PRODUCTS: LazyLock<Vec<Product>> = LazyLock::new(|| {
    vec![
        Product {
            id: ProductId::new(1),
            slug: "residential-20-circuit-kit",
            name: "Residential 20-Circuit Label Kit",
            description: "Pre-printed labels for the 20 most common household circuits, \
                plus blanks for everything else. Sized for standard load centers.",
            price: Price::usd_cents(1_999),
            category: ProductCategory::Standard,
            slot_count: 20,
            panel_type: PanelType::Residential,
            features: &[
                "Pre-printed common circuits",
                "Blank write-in labels",
                "Fade and smudge resistant",
            ],
            specs: VINYL_SPECS,
            stock: 240,
            tags: &["residential", "starter", "load-center"],
            image: "/static/images/residential-20.svg",
        },
        Product {
            id: ProductId::new(2),
            slug: "residential-40-circuit-kit",
            name: "Residential 40-Circuit Label Kit",
            description: "Full coverage for 40-space panels, including tandem breaker \
                labels and a printed circuit directory card.",
            price: Price::usd_cents(2_900),
            category: ProductCategory::Standard,
            slot_count: 40,
            panel_type: PanelType::Residential,
            features: &[
                "Covers tandem breakers",
                "Circuit directory card included",
                "Fade and smudge resistant",
            ],
            specs: VINYL_SPECS,
            stock: 180,
            tags: &["residential", "load-center", "best-seller"],
            image: "/static/images/residential-40.svg",
        },
        Product {
            id: ProductId::new(3),
            slug: "subpanel-12-circuit-kit",
            name: "Sub-Panel 12-Circuit Label Kit",
            description: "Compact kit for garage, workshop, and ADU sub-panels.",
            price: Price::usd_cents(1_499),
            category: ProductCategory::Standard,
            slot_count: 12,
            panel_type: PanelType::SubPanel,
            features: &["Garage and shop presets", "Feeder identification label"],
            specs: VINYL_SPECS,
            stock: 8,
            tags: &["sub-panel", "garage", "workshop"],
            image: "/static/images/subpanel-12.svg",
        },
        Product {
            id: ProductId::new(4),
            slug: "commercial-42-circuit-kit",
            name: "Commercial 42-Circuit Panelboard Kit",
            description: "Polyester labels for lighting and appliance panelboards, \
                with phase and voltage markers.",
            price: Price::usd_cents(4_900),
            category: ProductCategory::Standard,
            slot_count: 42,
            panel_type: PanelType::Commercial,
            features: &[
                "Phase A/B/C markers",
                "Voltage warning labels",
                "Arc-flash placard",
            ],
            specs: POLYESTER_SPECS,
            stock: 65,
            tags: &["commercial", "panelboard", "three-phase"],
            image: "/static/images/commercial-42.svg",
        },
        Product {
            id: ProductId::new(5),
            slug: "custom-printed-directory",
            name: "Custom Printed Circuit Directory",
            description: "Send us your circuit list and we print a matched set of \
                labels and a directory card for your exact panel.",
            price: Price::usd_cents(3_900),
            category: ProductCategory::Custom,
            slot_count: 42,
            panel_type: PanelType::Universal,
            features: &[
                "Printed to your circuit list",
                "Proof approval before printing",
                "Ships in 3 business days",
            ],
            specs: VINYL_SPECS,
            stock: 500,
            tags: &["custom", "directory", "made-to-order"],
            image: "/static/images/custom-directory.svg",
        },
        Product {
            id: ProductId::new(6),
            slug: "custom-color-coded-kit",
            name: "Custom Color-Coded Label Kit",
            description: "Custom labels color-coded by room or system, printed on \
                industrial polyester.",
            price: Price::usd_cents(5_900),
            category: ProductCategory::Custom,
            slot_count: 42,
            panel_type: PanelType::Universal,
            features: &["Color by room or system", "Printed legend card"],
            specs: POLYESTER_SPECS,
            stock: 0,
            tags: &["custom", "color-coded"],
            image: "/static/images/custom-color.svg",
        },
        Product {
            id: ProductId::new(7),
            slug: "contractor-10-pack",
            name: "Contractor 10-Pack",
            description: "Ten 40-circuit residential kits for electricians finishing \
                inspections across multiple homes.",
            price: Price::usd_cents(19_900),
            category: ProductCategory::Bulk,
            slot_count: 40,
            panel_type: PanelType::Residential,
            features: &[
                "Ten complete kits",
                "Inspection-ready directory cards",
                "Volume pricing",
            ],
            specs: VINYL_SPECS,
            stock: 40,
            tags: &["bulk", "contractor", "residential"],
            image: "/static/images/contractor-10.svg",
        },
        Product {
            id: ProductId::new(8),
            slug: "commercial-5-pack",
            name: "Commercial Panelboard 5-Pack",
            description: "Five commercial panelboard kits for tenant build-outs and \
                multi-panel electrical rooms.",
            price: Price::usd_cents(21_900),
            category: ProductCategory::Bulk,
            slot_count: 42,
            panel_type: PanelType::Commercial,
            features: &["Five complete kits", "Phase markers included"],
            specs: POLYESTER_SPECS,
            stock: 25,
            tags: &["bulk", "commercial", "three-phase"],
            image: "/static/images/commercial-5.svg",
        },
    ]
});

/// Every product in display order.
#[must_use]
pub fn all() -> &'static [Product] {
    &PRODUCTS
}

/// Look up a product by its URL slug.
#[must_use]
pub fn by_slug(slug: &str) -> Option<&'static Product> {
    PRODUCTS.iter().find(|p| p.slug == slug)
}

/// Look up a product by id.
#[must_use]
pub fn by_id(id: ProductId) -> Option<&'static Product> {
    PRODUCTS.iter().find(|p| p.id == id)
}

/// Products in a category, in display order.
pub fn by_category(category: ProductCategory) -> impl Iterator<Item = &'static Product> {
    PRODUCTS.iter().filter(move |p| p.category == category)
}

/// Featured products for the home page: the first in-stock product of each
/// category.
#[must_use]
pub fn featured() -> Vec<&'static Product> {
    ProductCategory::ALL
        .iter()
        .filter_map(|&category| by_category(category).find(|p| p.in_stock()))
        .collect()
}

/// Products related to `product`: same category first, then the rest.
/// Never includes `product` itself.
#[must_use]
pub fn related(product: &Product, limit: usize) -> Vec<&'static Product> {
    let same = PRODUCTS
        .iter()
        .filter(|p| p.id != product.id && p.category == product.category);
    let other = PRODUCTS
        .iter()
        .filter(|p| p.id != product.id && p.category != product.category);
    same.chain(other).take(limit).collect()
}
