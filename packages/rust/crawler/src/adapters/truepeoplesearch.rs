//! TruePeopleSearch adapter.

use std::sync::LazyLock;

use ownertrace_shared::{OwnerTraceError, ProfileFields, Result};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use super::SiteAdapter;

static RESULT_LINK: LazyLock<Selector> = LazyLock::new(|| {
    selector(r#"div[class*="card-summary"] div[class*="hidden-mobile"] > a[href*="/find/person"]"#)
});
static HEADING: LazyLock<Selector> = LazyLock::new(|| selector("h1"));
static SPAN: LazyLock<Selector> = LazyLock::new(|| selector("span"));
static STREET: LazyLock<Selector> =
    LazyLock::new(|| selector(r#"div[itemprop="homeLocation"] span[itemprop="streetAddress"]"#));
static LOCALITY: LazyLock<Selector> =
    LazyLock::new(|| selector(r#"div[itemprop="homeLocation"] span[itemprop="addressLocality"]"#));
static REGION: LazyLock<Selector> =
    LazyLock::new(|| selector(r#"div[itemprop="homeLocation"] span[itemprop="addressRegion"]"#));
static POSTAL_CODE: LazyLock<Selector> =
    LazyLock::new(|| selector(r#"div[itemprop="homeLocation"] span[itemprop="postalCode"]"#));
static TELEPHONE: LazyLock<Selector> = LazyLock::new(|| selector(r#"span[itemprop="telephone"]"#));

static AGE: LazyLock<Regex> = LazyLock::new(|| regex(r"Age\s(\d+)"));
static YEAR: LazyLock<Regex> = LazyLock::new(|| regex(r"\d{4}"));

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("static selector must parse")
}

fn regex(pattern: &str) -> Regex {
    Regex::new(pattern).expect("static regex must compile")
}

/// Resolves and extracts people profiles from truepeoplesearch.com.
pub struct TruePeopleSearchAdapter;

impl SiteAdapter for TruePeopleSearchAdapter {
    fn resolve(&self, doc: &Html, base: &Url) -> Option<Url> {
        // Only the first result card counts; later cards are never considered.
        let href = doc.select(&RESULT_LINK).next()?.value().attr("href")?;
        base.join(href).ok()
    }

    fn extract(&self, doc: &Html) -> Result<ProfileFields> {
        let heading = doc
            .select(&HEADING)
            .next()
            .ok_or_else(|| OwnerTraceError::extraction("profile page has no heading"))?;

        let born = born_text(doc);

        let mut fields = ProfileFields {
            name: non_empty(heading.text().collect()),
            age: born
                .iter()
                .find_map(|t| AGE.captures(t))
                .map(|c| c[1].to_string()),
            birth_year: born
                .iter()
                .find_map(|t| YEAR.find(t))
                .map(|m| m.as_str().to_string()),
            street: first_text(doc, &STREET),
            city: first_text(doc, &LOCALITY),
            region: first_text(doc, &REGION),
            zipcode: first_text(doc, &POSTAL_CODE),
            ..ProfileFields::default()
        };

        fields.set_phones(
            doc.select(&TELEPHONE)
                .filter_map(|el| non_empty(el.text().collect())),
        );

        Ok(fields)
    }

    fn name(&self) -> &str {
        "truepeoplesearch"
    }
}

/// Direct text nodes of every `<span>` whose first own text node mentions
/// "Born". Later text nodes of that span (after a `<br>`, say) are kept too.
fn born_text(doc: &Html) -> Vec<String> {
    doc.select(&SPAN)
        .map(|el| own_text(&el))
        .filter(|texts| texts.first().is_some_and(|t| t.contains("Born")))
        .flatten()
        .collect()
}

fn own_text(el: &ElementRef<'_>) -> Vec<String> {
    el.children()
        .filter_map(|node| node.value().as_text().map(|t| t.to_string()))
        .collect()
}

fn first_text(doc: &Html, sel: &Selector) -> Option<String> {
    doc.select(sel)
        .next()
        .and_then(|el| non_empty(el.text().collect()))
}

fn non_empty(text: String) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn results_base() -> Url {
        Url::parse("https://www.truepeoplesearch.com/results?name=John+Doe").unwrap()
    }

    const PROFILE: &str = r#"<html><body>
        <div id="personDetails">
            <h1 class="oh1">John A Doe</h1>
            <span class="content-value">Age 47, Born 1977</span>
            <div itemprop="homeLocation">
                <span itemprop="streetAddress">1200 NW 7th St</span>
                <span itemprop="addressLocality">Miami</span>,
                <span itemprop="addressRegion">FL</span>
                <span itemprop="postalCode">33125</span>
            </div>
            <div itemprop="homeLocation">
                <span itemprop="streetAddress">99 Old Rd</span>
            </div>
            <span itemprop="telephone">(305) 555-0101</span>
            <span itemprop="telephone">(305) 555-0102</span>
        </div>
    </body></html>"#;

    #[test]
    fn resolve_first_card_only() {
        let html = r#"<html><body>
            <div class="card card-summary">
                <div class="h4">John Doe</div>
                <div class="col-md-4 hidden-mobile"><a href="/find/person/p1abc">View Details</a></div>
            </div>
            <div class="card card-summary">
                <div class="col-md-4 hidden-mobile"><a href="/find/person/p2def">View Details</a></div>
            </div>
        </body></html>"#;

        let url = TruePeopleSearchAdapter.resolve_page(html, &results_base()).unwrap();
        assert_eq!(url.as_str(), "https://www.truepeoplesearch.com/find/person/p1abc");
    }

    #[test]
    fn resolve_skips_links_outside_hidden_mobile() {
        let html = r#"<html><body>
            <div class="card-summary">
                <div class="visible-mobile"><a href="/find/person/mobile">View</a></div>
                <div class="hidden-mobile"><a href="/find/person/desktop">View</a></div>
            </div>
        </body></html>"#;

        let url = TruePeopleSearchAdapter.resolve_page(html, &results_base()).unwrap();
        assert!(url.path().ends_with("/desktop"));
    }

    #[test]
    fn resolve_no_match() {
        let html = r#"<html><body>
            <div class="row"><div class="h2">We could not find any records for that search.</div></div>
            <div class="card-summary"><div class="hidden-mobile"><a href="/about">About</a></div></div>
        </body></html>"#;

        assert!(TruePeopleSearchAdapter.resolve_page(html, &results_base()).is_none());
    }

    #[test]
    fn extract_full_profile() {
        let fields = TruePeopleSearchAdapter.extract_page(PROFILE).unwrap();
        assert_eq!(fields.name.as_deref(), Some("John A Doe"));
        assert_eq!(fields.age.as_deref(), Some("47"));
        assert_eq!(fields.birth_year.as_deref(), Some("1977"));
        assert_eq!(fields.street.as_deref(), Some("1200 NW 7th St"));
        assert_eq!(fields.city.as_deref(), Some("Miami"));
        assert_eq!(fields.region.as_deref(), Some("FL"));
        assert_eq!(fields.zipcode.as_deref(), Some("33125"));
        assert_eq!(fields.phone_count(), 2);
    }

    #[test]
    fn extract_missing_fields_are_null() {
        let html = "<html><body><h1>Jane Roe</h1></body></html>";
        let fields = TruePeopleSearchAdapter.extract_page(html).unwrap();
        assert_eq!(fields.name.as_deref(), Some("Jane Roe"));
        assert!(fields.age.is_none());
        assert!(fields.birth_year.is_none());
        assert!(fields.street.is_none());
        assert!(fields.zipcode.is_none());
        assert_eq!(fields.phone_count(), 0);
    }

    #[test]
    fn extract_without_heading_fails() {
        let html = r#"<html><body><span itemprop="telephone">(305) 555-0101</span></body></html>"#;
        let err = TruePeopleSearchAdapter.extract_page(html).unwrap_err();
        assert!(matches!(err, OwnerTraceError::Extraction { .. }));
    }

    #[test]
    fn extract_seven_phones_fills_five_slots() {
        let phones: Vec<String> = (1..=7).map(|i| format!("(786) 555-01{i:02}")).collect();
        let spans: String = phones
            .iter()
            .map(|p| format!(r#"<span itemprop="telephone">{p}</span>"#))
            .collect();
        let html = format!("<html><body><h1>Jo</h1>{spans}</body></html>");

        let fields = TruePeopleSearchAdapter.extract_page(&html).unwrap();
        assert_eq!(fields.phone_count(), 5);

        let filled: HashSet<&str> = fields.phones.iter().flatten().map(String::as_str).collect();
        assert_eq!(filled.len(), 5);
        assert!(filled.iter().all(|p| phones.iter().any(|q| q == p)));
    }

    #[test]
    fn extract_repeated_phone_fills_one_slot() {
        let html = r#"<html><body><h1>Jo</h1>
            <span itemprop="telephone">(305) 555-0199</span>
            <span itemprop="telephone">(305) 555-0199</span>
            <span itemprop="telephone">(305) 555-0199</span>
        </body></html>"#;

        let fields = TruePeopleSearchAdapter.extract_page(html).unwrap();
        assert_eq!(fields.phone_count(), 1);
        assert_eq!(fields.phones[0].as_deref(), Some("(305) 555-0199"));
        assert!(fields.phones[1..].iter().all(Option::is_none));
    }

    #[test]
    fn age_requires_age_prefix() {
        let html = "<html><body><h1>Jo</h1><span>Born March 1980</span></body></html>";
        let fields = TruePeopleSearchAdapter.extract_page(html).unwrap();
        assert!(fields.age.is_none());
        assert_eq!(fields.birth_year.as_deref(), Some("1980"));
    }

    #[test]
    fn extract_age_after_line_break_in_born_span() {
        let html = "<html><body><h1>Jo</h1><span>Born 1977<br>Age 47</span></body></html>";
        let fields = TruePeopleSearchAdapter.extract_page(html).unwrap();
        assert_eq!(fields.birth_year.as_deref(), Some("1977"));
        assert_eq!(fields.age.as_deref(), Some("47"));
    }

    #[test]
    fn born_span_selected_by_first_text_node() {
        let html = "<html><body><h1>Jo</h1><span>Age 47<br>Born 1977</span></body></html>";
        let fields = TruePeopleSearchAdapter.extract_page(html).unwrap();
        assert!(fields.age.is_none());
        assert!(fields.birth_year.is_none());
    }
}
