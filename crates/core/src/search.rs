//! Catalog search and browse helpers.
//!
//! Pure predicates over a catalog snapshot, used by read-side views. They
//! never touch the live catalog, so callers take a snapshot first.

use crate::content::{ContentArtifact, ContentKind};

/// View count above which an item counts as featured.
pub const DEFAULT_FEATURED_MIN_VIEWS: u64 = 10_000;

/// Number of featured items shown on the landing view.
pub const DEFAULT_FEATURED_LIMIT: usize = 6;

/// Items whose title, description, or any tag contains `query`, ignoring
/// case. A blank query matches everything.
pub fn search(items: &[ContentArtifact], query: &str) -> Vec<ContentArtifact> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return items.to_vec();
    }
    items
        .iter()
        .filter(|item| {
            item.title.to_lowercase().contains(&needle)
                || item.description.to_lowercase().contains(&needle)
                || item.tags.iter().any(|t| t.to_lowercase().contains(&needle))
        })
        .cloned()
        .collect()
}

/// Items matching an optional kind and an optional genre (case-insensitive).
pub fn filter(
    items: &[ContentArtifact],
    kind: Option<ContentKind>,
    genre: Option<&str>,
) -> Vec<ContentArtifact> {
    items
        .iter()
        .filter(|item| kind.map_or(true, |k| item.kind == k))
        .filter(|item| genre.map_or(true, |g| item.genre.eq_ignore_ascii_case(g)))
        .cloned()
        .collect()
}

/// The first `limit` items with more than `min_views` views, in catalog order.
pub fn featured(items: &[ContentArtifact], min_views: u64, limit: usize) -> Vec<ContentArtifact> {
    items
        .iter()
        .filter(|item| item.views > min_views)
        .take(limit)
        .cloned()
        .collect()
}
