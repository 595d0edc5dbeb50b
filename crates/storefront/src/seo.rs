//! SEO metadata, structured data, sitemap, and robots.txt.
//!
//! Everything here is pure data transformation; templates render the results.

use std::fmt::Write as _;

use chrono::NaiveDate;
use panel_labels_core::Product;
use serde_json::{Value, json};

use crate::content::FaqEntry;

/// Brand name appended to page titles.
pub const SITE_NAME: &str = "Panel Labels";

/// Default description for pages without their own.
pub const DEFAULT_DESCRIPTION: &str = "Code-compliant electrical panel labels and circuit \
    directories for homes, sub-panels, and commercial panelboards. Meets NEC 408.4(A).";

/// Default social sharing image.
pub const DEFAULT_IMAGE: &str = "/static/images/og-default.svg";

/// Paths crawlers should not index.
pub const DISALLOWED_PATHS: &[&str] = &["/cart", "/checkout", "/api/"];

// =============================================================================
// Meta Tags
// =============================================================================

/// Per-page `<head>` metadata: title, description, canonical URL, Open Graph,
/// Twitter card, and robots directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetaTags {
    pub title: String,
    pub description: String,
    pub canonical_url: String,
    pub og_type: &'static str,
    pub image_url: String,
    pub twitter_card: &'static str,
    pub robots: &'static str,
}

impl MetaTags {
    /// Metadata for a page at `path` on `base_url`.
    ///
    /// The title is suffixed with the site name unless it already is the
    /// site name.
    #[must_use]
    pub fn new(base_url: &str, path: &str, title: &str) -> Self {
        let title = if title.is_empty() || title == SITE_NAME {
            SITE_NAME.to_string()
        } else {
            format!("{title} | {SITE_NAME}")
        };
        Self {
            title,
            description: DEFAULT_DESCRIPTION.to_string(),
            canonical_url: absolute(base_url, path),
            og_type: "website",
            image_url: absolute(base_url, DEFAULT_IMAGE),
            twitter_card: "summary_large_image",
            robots: "index, follow",
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        let description = description.into();
        if !description.trim().is_empty() {
            self.description = description;
        }
        self
    }

    #[must_use]
    pub fn image(mut self, base_url: &str, path: &str) -> Self {
        self.image_url = absolute(base_url, path);
        self
    }

    #[must_use]
    pub const fn og_type(mut self, og_type: &'static str) -> Self {
        self.og_type = og_type;
        self
    }

    /// Mark the page `noindex, nofollow`.
    #[must_use]
    pub const fn noindex(mut self) -> Self {
        self.robots = "noindex, nofollow";
        self
    }
}

fn absolute(base_url: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        path.to_string()
    } else {
        format!("{}{path}", base_url.trim_end_matches('/'))
    }
}

// =============================================================================
// JSON-LD
// =============================================================================

/// `Organization` structured data.
#[must_use]
pub fn organization(base_url: &str) -> Value {
    json!({
        "@context": "https://schema.org",
        "@type": "Organization",
        "name": SITE_NAME,
        "url": base_url,
        "logo": absolute(base_url, "/static/images/logo.svg"),
    })
}

/// `WebSite` structured data.
#[must_use]
pub fn website(base_url: &str) -> Value {
    json!({
        "@context": "https://schema.org",
        "@type": "WebSite",
        "name": SITE_NAME,
        "url": base_url,
    })
}

/// `Product` structured data with a single offer.
#[must_use]
pub fn product(base_url: &str, product: &Product) -> Value {
    let availability = if product.in_stock() {
        "https://schema.org/InStock"
    } else {
        "https://schema.org/OutOfStock"
    };
    json!({
        "@context": "https://schema.org",
        "@type": "Product",
        "name": product.name,
        "description": product.description,
        "sku": format!("PL-{:04}", product.id.as_u32()),
        "image": absolute(base_url, product.image),
        "category": product.category.label(),
        "brand": { "@type": "Brand", "name": SITE_NAME },
        "offers": {
            "@type": "Offer",
            "url": absolute(base_url, &format!("/products/{}", product.slug)),
            "price": product.price.plain(),
            "priceCurrency": product.price.currency_code.code(),
            "availability": availability,
            "seller": { "@type": "Organization", "name": SITE_NAME },
        },
    })
}

/// `BreadcrumbList` structured data from `(name, path)` pairs.
#[must_use]
pub fn breadcrumbs(base_url: &str, crumbs: &[(&str, &str)]) -> Value {
    let items: Vec<Value> = crumbs
        .iter()
        .enumerate()
        .map(|(i, (name, path))| {
            json!({
                "@type": "ListItem",
                "position": i + 1,
                "name": name,
                "item": absolute(base_url, path),
            })
        })
        .collect();
    json!({
        "@context": "https://schema.org",
        "@type": "BreadcrumbList",
        "itemListElement": items,
    })
}

/// `FAQPage` structured data.
#[must_use]
pub fn faq_page(entries: &[FaqEntry]) -> Value {
    let questions: Vec<Value> = entries
        .iter()
        .map(|entry| {
            json!({
                "@type": "Question",
                "name": entry.question,
                "acceptedAnswer": { "@type": "Answer", "text": entry.answer },
            })
        })
        .collect();
    json!({
        "@context": "https://schema.org",
        "@type": "FAQPage",
        "mainEntity": questions,
    })
}

/// Serialize structured data for a `<script type="application/ld+json">`
/// block.
///
/// `<` is escaped so that no value can close the script element.
#[must_use]
pub fn render_json_ld(blocks: &[Value]) -> String {
    let value = match blocks {
        [single] => single.clone(),
        many => Value::Array(many.to_vec()),
    };
    value.to_string().replace('<', "\\u003c")
}

// =============================================================================
// Sitemap and robots.txt
// =============================================================================

/// A `<url>` entry in the sitemap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SitemapEntry {
    pub path: String,
    pub last_modified: Option<NaiveDate>,
    pub change_frequency: &'static str,
    pub priority: &'static str,
}

impl SitemapEntry {
    #[must_use]
    pub fn new(path: impl Into<String>, change_frequency: &'static str, priority: &'static str) -> Self {
        Self {
            path: path.into(),
            last_modified: None,
            change_frequency,
            priority,
        }
    }

    #[must_use]
    pub const fn last_modified(mut self, date: Option<NaiveDate>) -> Self {
        self.last_modified = date;
        self
    }
}

/// Sitemap entries for the static routes and the catalog.
///
/// Content pages are appended by the caller, which knows what is loaded.
#[must_use]
pub fn catalog_entries(products: &[Product]) -> Vec<SitemapEntry> {
    let mut entries = vec![
        SitemapEntry::new("/", "daily", "1.0"),
        SitemapEntry::new("/products", "daily", "0.9"),
    ];
    entries.extend(
        panel_labels_core::ProductCategory::ALL
            .iter()
            .map(|c| SitemapEntry::new(format!("/products?category={}", c.as_str()), "weekly", "0.7")),
    );
    entries.extend(
        products
            .iter()
            .map(|p| SitemapEntry::new(format!("/products/{}", p.slug), "weekly", "0.8")),
    );
    entries
}

/// Render `sitemap.xml`.
#[must_use]
pub fn sitemap_xml(base_url: &str, entries: &[SitemapEntry]) -> String {
    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n",
    );
    for entry in entries {
        let loc = escape_xml(&absolute(base_url, &entry.path));
        let _ = writeln!(xml, "  <url>\n    <loc>{loc}</loc>");
        if let Some(date) = entry.last_modified {
            let _ = writeln!(xml, "    <lastmod>{date}</lastmod>");
        }
        let _ = writeln!(
            xml,
            "    <changefreq>{}</changefreq>\n    <priority>{}</priority>\n  </url>",
            entry.change_frequency, entry.priority
        );
    }
    xml.push_str("</urlset>\n");
    xml
}

/// Render `robots.txt`.
#[must_use]
pub fn robots_txt(base_url: &str) -> String {
    let mut out = String::from("User-agent: *\nAllow: /\n");
    for path in DISALLOWED_PATHS {
        let _ = writeln!(out, "Disallow: {path}");
    }
    let _ = writeln!(out, "\nSitemap: {}", absolute(base_url, "/sitemap.xml"));
    out
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::catalog;

    const BASE: &str = "https://labels.test";

    #[test]
    fn test_meta_tags() {
        let meta = MetaTags::new(BASE, "/faq", "FAQ").description("Answers");
        assert_eq!(meta.title, "FAQ | Panel Labels");
        assert_eq!(meta.canonical_url, "https://labels.test/faq");
        assert_eq!(meta.description, "Answers");
        assert_eq!(meta.robots, "index, follow");

        let home = MetaTags::new(BASE, "/", SITE_NAME).description("  ");
        assert_eq!(home.title, "Panel Labels");
        assert_eq!(home.description, DEFAULT_DESCRIPTION);
        assert_eq!(MetaTags::new(BASE, "/cart", "Cart").noindex().robots, "noindex, nofollow");
    }

    #[test]
    fn test_product_json_ld() {
        let p = catalog::by_slug("residential-40-circuit-kit").unwrap();
        let ld = product(BASE, p);
        assert_eq!(ld["@type"], "Product");
        assert_eq!(ld["offers"]["price"], "29.00");
        assert_eq!(ld["offers"]["priceCurrency"], "USD");
        assert_eq!(ld["offers"]["availability"], "https://schema.org/InStock");
        assert_eq!(
            ld["offers"]["url"],
            "https://labels.test/products/residential-40-circuit-kit"
        );

        let sold_out = catalog::by_slug("custom-color-coded-kit").unwrap();
        assert_eq!(
            product(BASE, sold_out)["offers"]["availability"],
            "https://schema.org/OutOfStock"
        );
    }

    #[test]
    fn test_breadcrumbs_positions() {
        let ld = breadcrumbs(BASE, &[("Home", "/"), ("Products", "/products")]);
        assert_eq!(ld["itemListElement"][1]["position"], 2);
        assert_eq!(ld["itemListElement"][1]["item"], "https://labels.test/products");
    }

    #[test]
    fn test_render_json_ld_escapes_script_close() {
        let out = render_json_ld(&[json!({"name": "</script><b>"})]);
        assert!(!out.contains("</script>"));
        assert!(out.contains("\\u003c/script>"));

        let many = render_json_ld(&[organization(BASE), website(BASE)]);
        assert!(many.starts_with('['));
    }

    #[test]
    fn test_faq_page() {
        let ld = faq_page(&[FaqEntry {
            question: "Q?".to_string(),
            answer: "A.".to_string(),
        }]);
        assert_eq!(ld["mainEntity"][0]["acceptedAnswer"]["text"], "A.");
    }

    #[test]
    fn test_sitemap_contains_products_and_escapes() {
        let entries = catalog_entries(catalog::all());
        let xml = sitemap_xml(BASE, &entries);
        assert!(xml.contains("<loc>https://labels.test/products/contractor-10-pack</loc>"));
        assert!(xml.contains("category=bulk"));
        assert_eq!(
            xml.matches("<url>").count(),
            2 + panel_labels_core::ProductCategory::ALL.len() + catalog::all().len()
        );
    }

    #[test]
    fn test_robots_txt() {
        let robots = robots_txt(BASE);
        assert!(robots.contains("Disallow: /cart\n"));
        assert!(robots.contains("Disallow: /checkout\n"));
        assert!(robots.contains("Disallow: /api/\n"));
        assert!(robots.contains("Sitemap: https://labels.test/sitemap.xml"));
    }
}
