use crate::browser::Browser;
use crate::layout::SearchResultsReader;
use crate::models::ProductIdentifier;
use std::collections::HashSet;
use tracing::{debug, info, warn};

const ID_START: &str = "/dp/";
const ID_END: &str = "/ref";

/// Identifier between `/dp/` and the following `/ref` of a product link.
///
/// Links lacking either marker are not product links and give `None`.
pub fn product_id_from_url(url: &str) -> Option<ProductIdentifier> {
    let start = url.find(ID_START)? + ID_START.len();
    let len = url[start..].find(ID_END)?;
    let token = &url[start..start + len];

    if token.is_empty() || token.contains(['/', '?', '#']) {
        return None;
    }
    Some(ProductIdentifier::new(token))
}

/// Product identifiers on the loaded results page, first occurrence first.
///
/// A page without a results container yields nothing.
pub fn harvest<R>(page: &dyn Browser, reader: &R) -> Vec<ProductIdentifier>
where
    R: SearchResultsReader + ?Sized,
{
    let links = match reader.product_links(page) {
        Ok(links) => links,
        Err(e) if e.is_not_found() => {
            info!("Didn't get any products: no results container on the page");
            return Vec::new();
        }
        Err(e) => {
            warn!("Didn't get any products: {}", e);
            return Vec::new();
        }
    };

    let mut seen = HashSet::new();
    let mut ids = Vec::new();
    for link in &links {
        match product_id_from_url(link) {
            Some(id) => {
                if seen.insert(id.clone()) {
                    ids.push(id);
                } else {
                    debug!("Skipping repeated product {}", id);
                }
            }
            None => warn!("Skipping link without a product id: {}", link),
        }
    }

    debug!("{} links gave {} product ids", links.len(), ids.len());
    ids
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::fake::{FakeBrowser, FakePage};
    use crate::browser::{Browser, Locator};
    use crate::layout::AmazonLayout;

    #[test]
    fn extracts_id_between_markers() {
        let id = product_id_from_url("https://x/dp/B000123/ref=sr_1_1").unwrap();
        assert_eq!(id.as_str(), "B000123");

        let id = product_id_from_url("/Apple-iPhone-Pro/dp/B0BDJ7SXCM/ref=sr_1_3?keywords=iphone")
            .unwrap();
        assert_eq!(id.as_str(), "B0BDJ7SXCM");
    }

    #[test]
    fn links_without_markers_have_no_id() {
        assert_eq!(product_id_from_url("https://x/gp/help/ref=footer"), None);
        assert_eq!(product_id_from_url("https://x/dp/B000123"), None);
        assert_eq!(product_id_from_url("https://x/dp//ref=x"), None);
        assert_eq!(product_id_from_url("https://x/ref=a/dp/B000123"), None);
    }

    #[test]
    fn ref_marker_before_dp_is_ignored() {
        let id = product_id_from_url("https://x/ref=a/dp/B000123/ref=b").unwrap();
        assert_eq!(id.as_str(), "B000123");
    }

    fn results_page(links: &[&str]) -> FakeBrowser {
        FakeBrowser::new().page(
            "https://shop/s?k=iphone",
            FakePage::default().with_attributes(
                Locator::class("s-result-list"),
                Locator::css("h2 a"),
                "href",
                links,
            ),
        )
    }

    #[test]
    fn harvests_ids_in_page_order_without_repeats() {
        let mut page = results_page(&[
            "/a/dp/B2/ref=sr_1_1",
            "/b/dp/B1/ref=sr_1_2",
            "/gp/slredirect/picassoRedirect.html",
            "/a/dp/B2/ref=sr_1_9",
        ]);
        page.navigate("https://shop/s?k=iphone").unwrap();

        let ids = harvest(&page, &AmazonLayout::default());
        let ids: Vec<&str> = ids.iter().map(ProductIdentifier::as_str).collect();
        assert_eq!(ids, vec!["B2", "B1"]);
    }

    #[test]
    fn missing_results_container_gives_nothing() {
        let mut page = FakeBrowser::new().page("https://shop/s?k=iphone", FakePage::default());
        page.navigate("https://shop/s?k=iphone").unwrap();

        assert!(harvest(&page, &AmazonLayout::default()).is_empty());
    }
}
