//! Counters and percentages over the catalog and the user directory.

use serde::{Deserialize, Serialize};

use crate::constants::{BAR_CHAR, BAR_STEP_PERCENT, FALLBACK_DEPOSIT_NATURES, FALLBACK_LOCATIONS};
use crate::types::{Article, Status, UserRecord};

/// Article count for one location or deposit nature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bucket {
    pub label: String,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statistics {
    pub total_articles: usize,
    pub total_users: usize,
    pub active_users: usize,
    pub blocked_users: usize,
    pub users_with_pin: usize,
    pub by_location: Vec<Bucket>,
    pub by_deposit_nature: Vec<Bucket>,
}

impl Statistics {
    /// Percentage of all articles held in `bucket`.
    pub fn share(&self, bucket: &Bucket) -> u32 {
        percentage(bucket.count, self.total_articles)
    }
}

fn distinct<'a>(values: impl Iterator<Item = &'a str>, fallback: &[&str]) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for v in values.filter(|v| !v.is_empty()) {
        if !seen.iter().any(|s| s == v) {
            seen.push(v.to_string());
        }
    }
    if seen.is_empty() {
        fallback.iter().map(|s| s.to_string()).collect()
    } else {
        seen
    }
}

/// Locations seen in the catalog, in first-seen order, or the fixed
/// fallback list when no article has one.
pub fn locations(articles: &[Article]) -> Vec<String> {
    distinct(articles.iter().map(|a| a.location.as_str()), &FALLBACK_LOCATIONS)
}

/// Deposit natures seen in the catalog, with the same fallback rule.
pub fn deposit_natures(articles: &[Article]) -> Vec<String> {
    distinct(
        articles.iter().map(|a| a.deposit_nature.as_str()),
        &FALLBACK_DEPOSIT_NATURES,
    )
}

/// `round(count / total * 100)`, with an empty total giving 0.
pub fn percentage(count: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    ((count as f64 / total as f64) * 100.0).round() as u32
}

/// One block per [`BAR_STEP_PERCENT`] points, rounded down.
pub fn bar(percent: u32) -> String {
    std::iter::repeat(BAR_CHAR)
        .take((percent / BAR_STEP_PERCENT) as usize)
        .collect()
}

/// Aggregate the catalog and the directory. Pass an empty directory for
/// users who cannot see it.
pub fn aggregate(articles: &[Article], users: &[UserRecord]) -> Statistics {
    let by_location = locations(articles)
        .into_iter()
        .map(|label| {
            let count = articles.iter().filter(|a| a.location == label).count();
            Bucket { label, count }
        })
        .collect();

    let by_deposit_nature = deposit_natures(articles)
        .into_iter()
        .map(|label| {
            let count = articles.iter().filter(|a| a.deposit_nature == label).count();
            Bucket { label, count }
        })
        .collect();

    Statistics {
        total_articles: articles.len(),
        total_users: users.len(),
        active_users: users.iter().filter(|u| u.status == Status::Actif).count(),
        blocked_users: users.iter().filter(|u| u.status == Status::Bloque).count(),
        users_with_pin: users.iter().filter(|u| u.has_pin).count(),
        by_location,
        by_deposit_nature,
    }
}
