use super::{Browser, Locator};
use crate::error::BrowserError;
use reqwest::blocking::Client;
use reqwest::redirect;
use scraper::{ElementRef, Html, Node, Selector};
use std::time::Duration;
use tracing::debug;
use url::Url;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

struct Page {
    url: Url,
    document: Html,
}

/// Browser backend that fetches server-rendered HTML and queries it with CSS
/// selectors. Pages are complete once loaded, so nothing is ever waited for.
pub struct HttpSession {
    client: Client,
    page: Option<Page>,
}

impl HttpSession {
    pub fn new(user_agent: &str, ignore_certificate_errors: bool) -> Result<Self, BrowserError> {
        let redirect_policy = redirect::Policy::custom(|attempt| {
            if attempt.previous().len() > 100 {
                attempt.error("Too many redirects (>100)")
            } else {
                attempt.follow()
            }
        });

        let client = Client::builder()
            .redirect(redirect_policy)
            .user_agent(user_agent)
            .danger_accept_invalid_certs(ignore_certificate_errors)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(HttpSession { client, page: None })
    }

    /// Session already sitting on `html`, as if it had been loaded from `url`.
    #[cfg(test)]
    pub fn from_html(url: &str, html: &str) -> Result<Self, BrowserError> {
        Ok(HttpSession {
            client: Client::new(),
            page: Some(Page {
                url: Url::parse(url)?,
                document: Html::parse_document(html),
            }),
        })
    }

    fn page(&self) -> Result<&Page, BrowserError> {
        self.page.as_ref().ok_or(BrowserError::NoPage)
    }

    /// GET target of the form around `locator` with `text` typed into it:
    /// the resolved `action`, every hidden input, then the typed field.
    fn form_submission_url(&self, locator: &Locator, text: &str) -> Result<Url, BrowserError> {
        let page = self.page()?;
        let input = self
            .first(locator)?
            .ok_or_else(|| BrowserError::ElementNotFound(locator.to_string()))?;
        let name = input
            .value()
            .attr("name")
            .ok_or_else(|| BrowserError::Form(format!("{locator} has no name attribute")))?;
        let form = input
            .ancestors()
            .filter_map(ElementRef::wrap)
            .find(|el| el.value().name() == "form")
            .ok_or_else(|| BrowserError::Form(format!("{locator} is not inside a form")))?;

        let mut target = match form.value().attr("action") {
            Some(action) if !action.is_empty() => page.url.join(action)?,
            _ => page.url.clone(),
        };
        target.set_fragment(None);

        let hidden = css_selector(&Locator::css("input[type=\"hidden\"]"))?;
        {
            let mut query = target.query_pairs_mut();
            query.clear();
            for el in form.select(&hidden) {
                if let Some(hidden_name) = el.value().attr("name") {
                    query.append_pair(hidden_name, el.value().attr("value").unwrap_or_default());
                }
            }
            query.append_pair(name, text);
        }
        Ok(target)
    }

    fn first<'a>(&'a self, locator: &Locator) -> Result<Option<ElementRef<'a>>, BrowserError> {
        let selector = css_selector(locator)?;
        Ok(self.page()?.document.select(&selector).next())
    }
}

fn css_selector(locator: &Locator) -> Result<Selector, BrowserError> {
    let css = match locator {
        Locator::Id(id) => format!("[id=\"{id}\"]"),
        Locator::Class(class) => format!("[class~=\"{class}\"]"),
        Locator::Css(selector) => selector.clone(),
        #[cfg(feature = "webdriver")]
        Locator::XPath(_) => return Err(BrowserError::UnsupportedLocator(locator.to_string())),
    };
    Selector::parse(&css).map_err(|_| BrowserError::InvalidSelector(css.clone()))
}

/// Elements rendered on a line of their own. `sup` is in here because split
/// prices carry their fraction in one, and a browser shows it apart from the
/// whole part.
const LINE_BREAKING: &[&str] = &[
    "address", "article", "aside", "blockquote", "br", "dd", "div", "dl", "dt", "figcaption",
    "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li", "main",
    "nav", "ol", "p", "pre", "section", "sup", "table", "td", "th", "tr", "ul",
];

/// Text the way a browser would render it: whitespace runs collapse to one
/// space, line-breaking elements start a new line, and blank lines go.
fn element_text(element: ElementRef<'_>) -> String {
    let mut raw = String::new();
    collect_text(element, &mut raw);
    raw.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                out.extend(text.chars().map(|c| if c.is_whitespace() { ' ' } else { c }));
            }
            Node::Element(el) if matches!(el.name(), "script" | "style") => {}
            Node::Element(el) => {
                let breaks = LINE_BREAKING.contains(&el.name());
                if breaks {
                    out.push('\n');
                }
                if let Some(child_el) = ElementRef::wrap(child) {
                    collect_text(child_el, out);
                }
                if breaks {
                    out.push('\n');
                }
            }
            _ => {}
        }
    }
}

impl Browser for HttpSession {
    fn navigate(&mut self, url: &str) -> Result<(), BrowserError> {
        let resp = self.client.get(url).send()?.error_for_status()?;
        let final_url = resp.url().clone();
        let body = resp.text()?;
        debug!("Loaded {} ({} bytes)", final_url, body.len());

        self.page = Some(Page {
            url: final_url,
            document: Html::parse_document(&body),
        });
        Ok(())
    }

    fn current_url(&self) -> Result<String, BrowserError> {
        Ok(self.page()?.url.to_string())
    }

    fn exists(&self, locator: &Locator) -> Result<bool, BrowserError> {
        Ok(self.first(locator)?.is_some())
    }

    fn text(&self, locator: &Locator) -> Result<String, BrowserError> {
        self.first(locator)?
            .map(element_text)
            .ok_or_else(|| BrowserError::ElementNotFound(locator.to_string()))
    }

    fn attributes_within(
        &self,
        container: &Locator,
        target: &Locator,
        attr: &str,
    ) -> Result<Vec<String>, BrowserError> {
        let container_el = self
            .first(container)?
            .ok_or_else(|| BrowserError::ElementNotFound(container.to_string()))?;
        let selector = css_selector(target)?;

        Ok(container_el
            .select(&selector)
            .filter_map(|el| el.value().attr(attr))
            .map(str::to_string)
            .collect())
    }

    /// Submits the enclosing form the way pressing Enter in it would.
    fn submit_text(&mut self, locator: &Locator, text: &str) -> Result<(), BrowserError> {
        let target = self.form_submission_url(locator, text)?;
        debug!("Submitting search form to {}", target);
        self.navigate(target.as_str())
    }

    fn wait_for(
        &self,
        locator: &Locator,
        _timeout: Duration,
        _poll: Duration,
    ) -> Result<bool, BrowserError> {
        self.exists(locator)
    }

    /// Form submission is a synchronous request: whatever page it led to is
    /// already loaded.
    fn wait_for_url_change(
        &self,
        from: &str,
        _timeout: Duration,
        _poll: Duration,
    ) -> Result<Option<String>, BrowserError> {
        let url = self.current_url()?;
        Ok((url != from).then_some(url))
    }

    fn close(&mut self) -> Result<(), BrowserError> {
        self.page = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEARCH_PAGE: &str = r#"
        <html><body>
          <form name="site-search" action="/s/ref=nb_sb_noss" method="GET">
            <input type="hidden" name="__mk_de_DE" value="ÅMÅŽÕÑ">
            <input type="text" id="twotabsearchtextbox" name="field-keywords">
          </form>
          <div class="s-main-slot s-result-list">
            <h2><a class="a-link-normal" href="/Apple-iPhone/dp/B000123/ref=sr_1_1">  Apple
              iPhone </a></h2>
            <h2><a class="a-link-normal">no link</a></h2>
          </div>
          <span id="priceblock_ourprice">€12,90</span>
          <span id="split-price">€<span>1,049</span><sup>99</sup></span>
          <div id="availability">
            <span>Only 2 left</span><br><span>in   stock.</span>
            <script>track("stock")</script>
          </div>
        </body></html>
    "#;

    fn session() -> HttpSession {
        HttpSession::from_html("https://www.amazon.de/", SEARCH_PAGE).unwrap()
    }

    #[test]
    fn reads_text_by_id_with_collapsed_whitespace() {
        let s = session();
        assert_eq!(s.text(&Locator::id("priceblock_ourprice")).unwrap(), "€12,90");
        assert_eq!(s.text(&Locator::css("h2 a")).unwrap(), "Apple iPhone");
    }

    #[test]
    fn split_price_keeps_its_fraction_on_a_new_line() {
        let raw = session().text(&Locator::id("split-price")).unwrap();
        assert_eq!(raw, "€1,049\n99");
        assert_eq!(crate::price::parse_price(&raw, "€").unwrap(), 1049.99);
    }

    #[test]
    fn line_breaks_follow_elements_and_scripts_are_skipped() {
        let text = session().text(&Locator::id("availability")).unwrap();
        assert_eq!(text, "Only 2 left\nin stock.");
    }

    #[test]
    fn missing_element_is_not_found() {
        let err = session().text(&Locator::id("productTitle")).unwrap_err();
        assert!(err.is_not_found());
        assert!(!session().exists(&Locator::id("productTitle")).unwrap());
    }

    #[test]
    fn class_locator_matches_one_of_many_classes() {
        let hrefs = session()
            .attributes_within(&Locator::class("s-result-list"), &Locator::css("h2 a"), "href")
            .unwrap();
        assert_eq!(hrefs, vec!["/Apple-iPhone/dp/B000123/ref=sr_1_1".to_string()]);
    }

    #[test]
    fn missing_container_is_not_found() {
        let err = session()
            .attributes_within(&Locator::class("nothing-here"), &Locator::css("a"), "href")
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn malformed_css_is_an_invalid_selector() {
        let err = session().exists(&Locator::css("[[[")).unwrap_err();
        assert!(matches!(err, BrowserError::InvalidSelector(css) if css == "[[["));
    }

    #[cfg(feature = "webdriver")]
    #[test]
    fn xpath_is_unsupported() {
        let err = session()
            .exists(&Locator::XPath("//div".to_string()))
            .unwrap_err();
        assert!(matches!(err, BrowserError::UnsupportedLocator(_)));
    }

    #[test]
    fn search_form_submission_keeps_hidden_inputs() {
        let url = session()
            .form_submission_url(&Locator::id("twotabsearchtextbox"), "iphone 12")
            .unwrap();
        assert_eq!(url.path(), "/s/ref=nb_sb_noss");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("__mk_de_DE".to_string(), "ÅMÅŽÕÑ".to_string()),
                ("field-keywords".to_string(), "iphone 12".to_string()),
            ]
        );
    }

    #[test]
    fn input_outside_a_form_cannot_be_submitted() {
        let s = HttpSession::from_html("https://shop.test/", r#"<input id="q" name="q">"#).unwrap();
        let err = s.form_submission_url(&Locator::id("q"), "x").unwrap_err();
        assert!(matches!(err, BrowserError::Form(_)));
    }

    #[test]
    fn static_page_never_waits() {
        let s = session();
        let found = s
            .wait_for(&Locator::id("productTitle"), Duration::from_secs(60), Duration::from_secs(1))
            .unwrap();
        assert!(!found);
    }

    #[test]
    fn url_change_is_reported_without_waiting() {
        let s = session();
        let (timeout, poll) = (Duration::from_secs(60), Duration::from_secs(1));

        let same = s.wait_for_url_change("https://www.amazon.de/", timeout, poll);
        assert_eq!(same.unwrap(), None);
        let moved = s.wait_for_url_change("https://www.amazon.de/gp/cart", timeout, poll);
        assert_eq!(moved.unwrap().as_deref(), Some("https://www.amazon.de/"));
    }

    #[test]
    fn navigation_without_a_page_fails_cleanly() {
        let mut s = HttpSession::new(DEFAULT_USER_AGENT, false).unwrap();
        assert!(matches!(s.current_url(), Err(BrowserError::NoPage)));
        s.close().unwrap();
    }
}
