//! Site adapter trait and the built-in people-search adapter.
//!
//! An adapter knows the page structure of one target site: how to pick the
//! profile link off a results page and how to read fields off a profile page.

mod truepeoplesearch;

use ownertrace_shared::{ProfileFields, Result};
use scraper::Html;
use url::Url;

pub use truepeoplesearch::TruePeopleSearchAdapter;

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Trait for site-specific result resolution and profile extraction.
pub trait SiteAdapter: Send + Sync {
    /// Pick the profile link from a parsed results page.
    ///
    /// Returns the first matching link in document order, resolved against
    /// `base`, or `None` when the page has no match.
    fn resolve(&self, doc: &Html, base: &Url) -> Option<Url>;

    /// Extract profile fields from a parsed profile page.
    ///
    /// Missing fields are `None`; only a page lacking its basic structure
    /// is an error.
    fn extract(&self, doc: &Html) -> Result<ProfileFields>;

    /// Human-readable adapter name for tracing.
    fn name(&self) -> &str;

    /// Parse `body` and resolve its profile link.
    fn resolve_page(&self, body: &str, base: &Url) -> Option<Url> {
        let doc = Html::parse_document(body);
        self.resolve(&doc, base)
    }

    /// Parse `body` and extract its profile fields.
    fn extract_page(&self, body: &str) -> Result<ProfileFields> {
        let doc = Html::parse_document(body);
        self.extract(&doc)
    }
}
