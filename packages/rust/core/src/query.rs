//! Search URL construction.

use url::Url;

use ownertrace_shared::Query;

/// Location parameter: `"{city}, {state}"` when either is present, else the zip code.
///
/// With nothing to go on the result is `", "`, matching what the site
/// receives for an empty city/state pair.
pub fn citystatezip(query: &Query) -> String {
    if !query.city.is_empty() || !query.state.is_empty() || query.zipcode.is_empty() {
        format!("{}, {}", query.city, query.state)
    } else {
        query.zipcode.clone()
    }
}

/// Build the search URL for `query` against `endpoint`.
///
/// Returns the display name alongside the URL. Parameters are
/// form-encoded (spaces become `+`).
pub fn build_url(endpoint: &Url, query: &Query) -> (String, Url) {
    let mut url = endpoint.clone();
    url.query_pairs_mut()
        .clear()
        .append_pair("name", &query.name)
        .append_pair("citystatezip", &citystatezip(query));
    (query.name.clone(), url)
}
