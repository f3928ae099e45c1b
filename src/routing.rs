use crate::types::BackendKind;

/// URL substrings of sites that only render with JavaScript.
const JS_HEAVY_INDICATORS: &[&str] = &[
    "linkedin.com",
    "twitter.com",
    "facebook.com",
    "sedar",
    "sedi",
    "react",
    "angular",
    "vue",
    "spa",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// RSS/Atom endpoint: the feed parser always goes first.
    Feed,
    /// Needs a real browser: browser backends go first.
    JsHeavy,
    /// No rule applies; use the learned order as is.
    Learned,
}

pub fn is_feed_url(url: &str) -> bool {
    let url = url.to_ascii_lowercase();
    let path = url.split(['?', '#']).next().unwrap_or_default();
    path.ends_with(".rss")
        || path.ends_with(".xml")
        || url.contains("/feed/")
        || url.contains("/rss/")
}

pub fn is_js_heavy(url: &str) -> bool {
    let url = url.to_ascii_lowercase();
    JS_HEAVY_INDICATORS.iter().any(|i| url.contains(i))
}

pub fn classify(url: &str) -> Route {
    if is_feed_url(url) {
        Route::Feed
    } else if is_js_heavy(url) {
        Route::JsHeavy
    } else {
        Route::Learned
    }
}

/// Applies the routing override for `route` on top of `order`.
///
/// A feed URL puts the feed parser first even when `order` lacks it. A
/// JS-heavy URL only moves the browser backends already in `order` to the
/// front, keeping their learned order. Everything else keeps its position.
pub fn apply_route(route: Route, order: &[BackendKind]) -> Vec<BackendKind> {
    match route {
        Route::Learned => order.to_vec(),
        Route::Feed => std::iter::once(BackendKind::Feed)
            .chain(order.iter().copied().filter(|k| *k != BackendKind::Feed))
            .collect(),
        Route::JsHeavy => {
            let (mut browsers, rest): (Vec<_>, Vec<_>) =
                order.iter().copied().partition(|k| k.is_browser());
            browsers.extend(rest);
            browsers
        }
    }
}
