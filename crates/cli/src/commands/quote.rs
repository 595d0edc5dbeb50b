//! `pl-cli quote`: price a cart without running the storefront.

use std::io::Write;

use panel_labels_core::CartState;
use panel_labels_storefront::catalog;

use super::CliError;

/// Parse `slug[:quantity]`. A missing quantity means one.
fn parse_line(line: &str) -> Result<(&str, u32), CliError> {
    let (slug, quantity) = match line.split_once(':') {
        Some((slug, qty)) => {
            let qty = qty
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|q| *q > 0)
                .ok_or_else(|| CliError::InvalidQuantity(line.to_string()))?;
            (slug, qty)
        }
        None => (line, 1),
    };
    Ok((slug.trim(), quantity))
}

/// Build a cart from `lines`.
///
/// # Errors
///
/// Returns an error for an unknown slug, a bad quantity, or a quantity
/// above available stock.
pub fn build_cart(lines: &[String]) -> Result<CartState, CliError> {
    let mut cart = CartState::new();
    for line in lines {
        let (slug, quantity) = parse_line(line)?;
        let product =
            catalog::by_slug(slug).ok_or_else(|| CliError::UnknownProduct(slug.to_string()))?;
        let in_cart = cart.item(product.id).map_or(0, |item| item.quantity);
        if in_cart.saturating_add(quantity) > product.stock {
            return Err(CliError::InsufficientStock {
                name: product.name,
                available: product.stock,
            });
        }
        cart.add(product, quantity);
    }
    Ok(cart)
}

/// Write an itemised quote with totals.
///
/// # Errors
///
/// Returns an error if the cart cannot be built or the write fails.
pub fn run(out: &mut impl Write, lines: &[String]) -> Result<(), CliError> {
    let cart = build_cart(lines)?;
    let totals = cart.totals();

    for item in &cart.items {
        writeln!(
            out,
            "{:>3} x {:<40} {:>10}",
            item.quantity,
            item.product.name,
            item.line_total().display()
        )?;
    }
    writeln!(out, "{:<46} {:>10}", "Subtotal", totals.subtotal.display())?;
    writeln!(out, "{:<46} {:>10}", "Tax (8%)", totals.tax.display())?;
    writeln!(out, "{:<46} {:>10}", "Shipping", totals.shipping.display())?;
    writeln!(out, "{:<46} {:>10}", "Total", totals.total.display())?;
    if let Some(remaining) = totals.remaining_for_free_shipping() {
        writeln!(out, "Add {} for free shipping.", remaining.display())?;
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use panel_labels_core::Price;

    use super::*;

    fn lines(items: &[&str]) -> Vec<String> {
        items.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_quote_totals() {
        let cart = build_cart(&lines(&["residential-40-circuit-kit:2"])).unwrap();
        let totals = cart.totals();
        assert_eq!(totals.subtotal, Price::usd_cents(5_800));
        assert_eq!(totals.tax, Price::usd_cents(464));
        assert!(totals.shipping.is_zero());
        assert_eq!(totals.total, Price::usd_cents(6_264));
    }

    #[test]
    fn test_repeated_lines_merge() {
        let cart = build_cart(&lines(&[
            "subpanel-12-circuit-kit",
            "subpanel-12-circuit-kit:2",
        ]))
        .unwrap();
        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.item_count(), 3);
    }

    #[test]
    fn test_rejects_bad_lines() {
        assert!(matches!(
            build_cart(&lines(&["nope:1"])),
            Err(CliError::UnknownProduct(_))
        ));
        assert!(matches!(
            build_cart(&lines(&["subpanel-12-circuit-kit:0"])),
            Err(CliError::InvalidQuantity(_))
        ));
        assert!(matches!(
            build_cart(&lines(&["subpanel-12-circuit-kit:x"])),
            Err(CliError::InvalidQuantity(_))
        ));
        assert!(matches!(
            build_cart(&lines(&["custom-color-coded-kit"])),
            Err(CliError::InsufficientStock { available: 0, .. })
        ));
    }

    #[test]
    fn test_output_mentions_free_shipping_gap() {
        let mut out = Vec::new();
        run(&mut out, &lines(&["subpanel-12-circuit-kit"])).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("$14.99"));
        assert!(text.contains("Add $35.01 for free shipping."));
    }
}
