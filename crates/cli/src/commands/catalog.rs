//! `pl-cli catalog`: tabular catalog listing.

use std::io::Write;

use panel_labels_core::{Product, ProductCategory};
use panel_labels_storefront::catalog;

use super::CliError;

/// Write the catalog, or one category of it, as an aligned table.
///
/// # Errors
///
/// Returns an error for an unknown category or a failed write.
pub fn run(out: &mut impl Write, category: Option<&str>) -> Result<(), CliError> {
    let products: Vec<&Product> = match category {
        Some(name) => {
            let category = ProductCategory::parse(name)
                .ok_or_else(|| CliError::UnknownCategory(name.to_string()))?;
            catalog::by_category(category).collect()
        }
        None => catalog::all().iter().collect(),
    };

    writeln!(
        out,
        "{:>3}  {:<30}  {:<9}  {:>8}  {:>5}",
        "ID", "SLUG", "CATEGORY", "PRICE", "STOCK"
    )?;
    for product in products {
        writeln!(
            out,
            "{:>3}  {:<30}  {:<9}  {:>8}  {:>5}",
            product.id,
            product.slug,
            product.category.as_str(),
            product.price.display(),
            product.stock
        )?;
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_category_filter() {
        let mut out = Vec::new();
        run(&mut out, Some("bulk")).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("contractor-10-pack"));
        assert!(!text.contains("residential-20-circuit-kit"));
        assert_eq!(text.lines().count(), 1 + catalog::by_category(ProductCategory::Bulk).count());
    }

    #[test]
    fn test_unknown_category() {
        let err = run(&mut Vec::new(), Some("premium")).unwrap_err();
        assert!(matches!(err, CliError::UnknownCategory(ref c) if c == "premium"));
    }
}
