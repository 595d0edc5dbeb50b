//! `pl-cli sitemap`: render sitemap.xml offline.

use std::io::Write;
use std::path::Path;

use panel_labels_storefront::catalog;
use panel_labels_storefront::content::ContentStore;
use panel_labels_storefront::seo::{self, SitemapEntry};

use super::CliError;

/// Write the sitemap for `base_url`, including the pages in `content_dir`.
///
/// # Errors
///
/// Returns an error if the content directory cannot be read or the write
/// fails.
pub fn run(out: &mut impl Write, base_url: &str, content_dir: &Path) -> Result<(), CliError> {
    let content = ContentStore::load(content_dir)?;

    let mut entries = seo::catalog_entries(catalog::all());
    for slug in content.slugs() {
        let updated_at = content.get_page(slug).and_then(|p| p.meta.updated_at);
        entries.push(
            SitemapEntry::new(format!("/{slug}"), "monthly", "0.5").last_modified(updated_at),
        );
    }

    out.write_all(seo::sitemap_xml(base_url.trim_end_matches('/'), &entries).as_bytes())?;
    Ok(())
}
