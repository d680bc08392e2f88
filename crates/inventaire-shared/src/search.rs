//! Search, filtering and pagination over the article catalog.
//!
//! Everything here is a pure function of the catalog and a [`FilterState`];
//! callers recompute on demand instead of caching derived lists.

use serde::{Deserialize, Serialize};

use crate::types::Article;

/// Free-text search term plus the two equality filters.
///
/// An empty string means "not set".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterState {
    pub search_term: String,
    pub deposit_nature: String,
    pub location: String,
}

/// Strip leading zeros from a code so `0008443` and `8443` compare equal.
///
/// A code made only of zeros becomes `"0"`; an empty code stays empty.
pub fn normalize_code(code: &str) -> String {
    if code.is_empty() {
        return String::new();
    }
    match code.trim_start_matches('0') {
        "" => "0".to_string(),
        rest => rest.to_string(),
    }
}

fn equals_ignore_case(value: &str, wanted: &str) -> bool {
    !value.is_empty() && value.to_lowercase() == wanted.to_lowercase()
}

/// Whether `article` passes the two equality filters.
pub fn matches_filters(article: &Article, filters: &FilterState) -> bool {
    if !filters.deposit_nature.is_empty()
        && !equals_ignore_case(&article.deposit_nature, &filters.deposit_nature)
    {
        return false;
    }
    if !filters.location.is_empty() && !equals_ignore_case(&article.location, &filters.location) {
        return false;
    }
    true
}

/// Whether `article` matches a free-text term. An empty term matches all.
pub fn matches_term(article: &Article, term: &str) -> bool {
    let needle = term.trim().to_lowercase();
    if needle.is_empty() {
        return true;
    }

    let fields = [
        &article.symbol,
        &article.designation,
        &article.rack,
        &article.level,
        &article.slot,
        &article.comment,
        &article.location,
        &article.deposit_nature,
    ];
    if fields.iter().any(|f| f.to_lowercase().contains(&needle)) {
        return true;
    }

    let symbol = normalize_code(&article.symbol.to_lowercase());
    !symbol.is_empty() && symbol.contains(&normalize_code(&needle))
}

/// Apply the equality filters, then the search term, keeping catalog order.
pub fn filter_articles<'a>(articles: &'a [Article], filters: &FilterState) -> Vec<&'a Article> {
    articles
        .iter()
        .filter(|a| matches_filters(a, filters))
        .filter(|a| matches_term(a, &filters.search_term))
        .collect()
}

/// `ceil(count / page_size)`; zero items means zero pages.
pub fn total_pages(count: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 0;
    }
    count.div_ceil(page_size)
}

/// Position of the page cursor over a filtered list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageInfo {
    /// 1-based page number.
    pub page: usize,
    pub total_pages: usize,
    pub total_items: usize,
    /// Index of the first item on the page, inclusive.
    pub start: usize,
    /// Index past the last item on the page.
    pub end: usize,
}

impl PageInfo {
    pub fn new(page: usize, total_items: usize, page_size: usize) -> Self {
        let page = page.max(1);
        let start = (page - 1).saturating_mul(page_size).min(total_items);
        let end = start.saturating_add(page_size).min(total_items);
        Self {
            page,
            total_pages: total_pages(total_items, page_size),
            total_items,
            start,
            end,
        }
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }
}

/// Slice of `items` shown on `page`.
pub fn paginate<T>(items: &[T], page: usize, page_size: usize) -> (&[T], PageInfo) {
    let info = PageInfo::new(page, items.len(), page_size);
    (&items[info.start..info.end], info)
}

/// Part of a field split around search matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub text: String,
    pub matched: bool,
}

/// Split `text` into matched and unmatched segments, case-insensitively.
///
/// Text whose characters do not lowercase one-to-one is returned as a single
/// unmatched segment.
pub fn highlight(text: &str, term: &str) -> Vec<Segment> {
    let plain = || {
        vec![Segment {
            text: text.to_string(),
            matched: false,
        }]
    };

    let needle: Vec<char> = term.trim().to_lowercase().chars().collect();
    if needle.is_empty() || text.is_empty() {
        return plain();
    }

    let mut chars = Vec::new();
    for c in text.chars() {
        let mut lower = c.to_lowercase();
        match (lower.next(), lower.next()) {
            (Some(l), None) => chars.push((c, l)),
            _ => return plain(),
        }
    }

    let mut segments: Vec<Segment> = Vec::new();
    let mut push = |s: String, matched: bool| {
        if s.is_empty() {
            return;
        }
        match segments.last_mut() {
            Some(last) if last.matched == matched => last.text.push_str(&s),
            _ => segments.push(Segment { text: s, matched }),
        }
    };

    let mut i = 0;
    while i < chars.len() {
        let hit = i + needle.len() <= chars.len()
            && chars[i..i + needle.len()]
                .iter()
                .zip(&needle)
                .all(|((_, l), n)| l == n);
        if hit {
            push(chars[i..i + needle.len()].iter().map(|(c, _)| c).collect(), true);
            i += needle.len();
        } else {
            push(chars[i].0.to_string(), false);
            i += 1;
        }
    }
    segments
}
