//! Product listing and detail route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
};
use panel_labels_core::{Product, ProductCategory};
use serde::Deserialize;
use tracing::instrument;

use crate::catalog::{self, LOW_STOCK_THRESHOLD};
use crate::error::{AppError, Result};
use crate::filters;
use crate::routes::PageContext;
use crate::seo;
use crate::state::AppState;

/// Number of related products shown under a product.
const RELATED_LIMIT: usize = 3;

// =============================================================================
// Views
// =============================================================================

/// Product card shown in grids.
#[derive(Clone, Debug)]
pub struct ProductCard {
    pub id: u32,
    pub slug: &'static str,
    pub name: &'static str,
    pub summary: &'static str,
    pub price: String,
    pub category: &'static str,
    pub slot_count: u32,
    pub image: &'static str,
    pub in_stock: bool,
}

impl From<&Product> for ProductCard {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id.as_u32(),
            slug: product.slug,
            name: product.name,
            summary: product.description,
            price: product.price.display(),
            category: product.category.label(),
            slot_count: product.slot_count,
            image: product.image,
            in_stock: product.in_stock(),
        }
    }
}

/// A category filter tab.
#[derive(Clone, Debug)]
pub struct CategoryTab {
    pub href: String,
    pub label: &'static str,
    pub active: bool,
}

fn category_tabs(active: Option<ProductCategory>) -> Vec<CategoryTab> {
    let mut tabs = vec![CategoryTab {
        href: "/products".to_string(),
        label: "All",
        active: active.is_none(),
    }];
    tabs.extend(ProductCategory::ALL.iter().map(|&category| CategoryTab {
        href: format!("/products?category={}", category.as_str()),
        label: category.label(),
        active: active == Some(category),
    }));
    tabs
}

/// Full product detail for the product page.
#[derive(Clone, Debug)]
pub struct ProductDetail {
    pub card: ProductCard,
    pub panel_type: &'static str,
    pub features: &'static [&'static str],
    pub specs: Vec<(&'static str, &'static str)>,
    pub tags: &'static [&'static str],
    pub stock: u32,
    pub low_stock: bool,
    /// Price without symbol, reported with the browser's `view_item` event.
    pub price_value: String,
    pub currency: &'static str,
}

impl From<&Product> for ProductDetail {
    fn from(product: &Product) -> Self {
        let specs = &product.specs;
        Self {
            card: ProductCard::from(product),
            panel_type: product.panel_type.label(),
            features: product.features,
            specs: vec![
                ("Material", specs.material),
                ("Label size", specs.dimensions),
                ("Adhesive", specs.adhesive),
                ("Temperature range", specs.temperature_range),
                ("Compliance", specs.compliance),
            ],
            tags: product.tags,
            stock: product.stock,
            low_stock: product.is_low_stock(LOW_STOCK_THRESHOLD),
            price_value: product.price.plain(),
            currency: product.price.currency_code.code(),
        }
    }
}

// =============================================================================
// Templates
// =============================================================================

/// Product listing template.
#[derive(Template, WebTemplate)]
#[template(path = "products/index.html")]
pub struct ProductsIndexTemplate {
    pub page: PageContext,
    pub heading: &'static str,
    pub tabs: Vec<CategoryTab>,
    pub products: Vec<ProductCard>,
}

/// Product detail template.
#[derive(Template, WebTemplate)]
#[template(path = "products/show.html")]
pub struct ProductShowTemplate {
    pub page: PageContext,
    pub product: ProductDetail,
    pub related: Vec<ProductCard>,
}

// =============================================================================
// Handlers
// =============================================================================

/// Listing query parameters.
#[derive(Debug, Deserialize)]
pub struct ProductsQuery {
    pub category: Option<String>,
}

/// Display the product listing.
///
/// An unrecognised `category` shows every product.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<ProductsQuery>,
) -> impl IntoResponse {
    let category = query.category.as_deref().and_then(ProductCategory::parse);

    let (products, heading, path): (Vec<ProductCard>, _, _) = match category {
        Some(category) => (
            catalog::by_category(category).map(ProductCard::from).collect(),
            category.label(),
            format!("/products?category={}", category.as_str()),
        ),
        None => (
            catalog::all().iter().map(ProductCard::from).collect(),
            "All Panel Labels",
            "/products".to_string(),
        ),
    };

    let base_url = &state.config().base_url;
    let page = PageContext::new(&state, &path, heading)
        .description(
            "Shop electrical panel label kits, custom printed circuit directories, \
             and contractor bulk packs.",
        )
        .json_ld(&[seo::breadcrumbs(
            base_url,
            &[("Home", "/"), ("Products", "/products")],
        )]);

    ProductsIndexTemplate {
        page,
        heading,
        tabs: category_tabs(category),
        products,
    }
}

/// Display a product.
///
/// The page reads no visitor state so it can be served from the offline
/// cache; `view_item` is reported by the browser beacon.
///
/// # Errors
///
/// Returns 404 if no product has this slug.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse> {
    let product =
        catalog::by_slug(&slug).ok_or_else(|| AppError::NotFound(format!("product {slug}")))?;

    let base_url = &state.config().base_url;
    let path = format!("/products/{}", product.slug);
    let page = PageContext::new(&state, &path, product.name)
        .description(product.description)
        .meta(|meta| meta.og_type("product").image(base_url, product.image))
        .json_ld(&[
            seo::product(base_url, product),
            seo::breadcrumbs(
                base_url,
                &[("Home", "/"), ("Products", "/products"), (product.name, path.as_str())],
            ),
        ]);

    Ok(ProductShowTemplate {
        page,
        product: ProductDetail::from(product),
        related: catalog::related(product, RELATED_LIMIT)
            .into_iter()
            .map(ProductCard::from)
            .collect(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_category_tabs_mark_active() {
        let tabs = category_tabs(Some(ProductCategory::Bulk));
        assert_eq!(tabs.len(), 1 + ProductCategory::ALL.len());
        assert!(!tabs[0].active);
        let active: Vec<_> = tabs.iter().filter(|t| t.active).collect();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].href, "/products?category=bulk");

        assert!(category_tabs(None)[0].active);
    }

    #[test]
    fn test_detail_view_low_stock() {
        let subpanel = catalog::by_slug("subpanel-12-circuit-kit").unwrap();
        let detail = ProductDetail::from(subpanel);
        assert!(detail.low_stock);
        assert_eq!(detail.card.price, "$14.99");
        assert_eq!(detail.specs.len(), 5);
        assert_eq!(detail.price_value, "14.99");
        assert_eq!(detail.currency, "USD");

        let sold_out = ProductDetail::from(catalog::by_slug("custom-color-coded-kit").unwrap());
        assert!(!sold_out.card.in_stock);
    }
}
