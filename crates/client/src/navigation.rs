//! Page navigation capability.

use std::sync::{Mutex, MutexGuard};

use reqwest::Url;

/// Query parameter carrying a one-time cross-domain sign-in token.
pub const TOKEN_PARAM: &str = "token";

pub trait Navigator: Send + Sync {
    fn current_url(&self) -> Url;

    /// Rewrite the visible URL in place (history replace, no reload).
    fn replace_url(&self, url: Url);

    /// Leave the current page.
    fn navigate(&self, url: Url);
}

#[derive(Debug)]
struct NavState {
    current: Url,
    replaced: Vec<Url>,
    navigations: Vec<Url>,
}

/// Navigator that records what it was asked to do.
#[derive(Debug)]
pub struct MemoryNavigator {
    state: Mutex<NavState>,
}

impl MemoryNavigator {
    pub fn new(url: Url) -> Self {
        Self {
            state: Mutex::new(NavState {
                current: url,
                replaced: Vec::new(),
                navigations: Vec::new(),
            }),
        }
    }

    /// Full navigations performed so far (e.g. sign-in redirects).
    pub fn navigations(&self) -> Vec<Url> {
        self.state().navigations.clone()
    }

    /// In-place URL rewrites performed so far.
    pub fn replacements(&self) -> Vec<Url> {
        self.state().replaced.clone()
    }

    fn state(&self) -> MutexGuard<'_, NavState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Navigator for MemoryNavigator {
    fn current_url(&self) -> Url {
        self.state().current.clone()
    }

    fn replace_url(&self, url: Url) {
        let mut state = self.state();
        state.replaced.push(url.clone());
        state.current = url;
    }

    fn navigate(&self, url: Url) {
        let mut state = self.state();
        state.navigations.push(url.clone());
        state.current = url;
    }
}

/// Split `name` out of the query string.
///
/// Returns the first value found and the URL with *every* occurrence of the
/// parameter removed; other parameters and the fragment are preserved.
pub fn take_query_param(url: &Url, name: &str) -> (Option<String>, Url) {
    let mut value = None;
    let mut kept = Vec::new();
    for (key, val) in url.query_pairs() {
        if key == name {
            if value.is_none() {
                value = Some(val.into_owned());
            }
        } else {
            kept.push((key.into_owned(), val.into_owned()));
        }
    }

    let mut cleaned = url.clone();
    if kept.is_empty() {
        cleaned.set_query(None);
    } else {
        cleaned.query_pairs_mut().clear().extend_pairs(kept);
    }
    (value, cleaned)
}

/// True when `url` already points at `page` (e.g. the sign-in page).
pub fn is_on_page(url: &Url, page: &str) -> bool {
    let page = page.trim_start_matches('/');
    !page.is_empty() && url.path().trim_end_matches('/').ends_with(page)
}
