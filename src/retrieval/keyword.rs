//! Keyword-overlap scoring against catalog metadata fields
//!
//! Four independent weighted sub-checks against the lower-cased,
//! whitespace-tokenized query. The sub-checks are not mutually exclusive;
//! the maximum reachable score is 0.70.

use crate::catalog::CatalogItem;
use std::collections::HashSet;

/// Category exact-token membership (generic match, reduced weight)
pub const CATEGORY_WEIGHT: f32 = 0.20;
/// Any caption token present in the query (specific match, high weight)
pub const CAPTION_WEIGHT: f32 = 0.25;
/// Any material token present in the query (medium weight)
pub const MATERIAL_WEIGHT: f32 = 0.15;
/// Any style token present in the query (low weight)
pub const STYLE_WEIGHT: f32 = 0.10;

/// Lower-cased whitespace tokens of a query. Empty or whitespace-only
/// queries produce an empty set, which scores 0 for every item.
pub fn query_tokens(query: &str) -> HashSet<String> {
    query
        .to_lowercase()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

fn any_token_in_query(field: &str, tokens: &HashSet<String>) -> bool {
    field
        .to_lowercase()
        .split_whitespace()
        .any(|word| tokens.contains(word))
}

/// Additive keyword score of an item against pre-tokenized query tokens.
///
/// The category check matches the whole lower-cased category string as a
/// single query token; the other fields match on any shared token.
pub fn keyword_score(item: &CatalogItem, tokens: &HashSet<String>) -> f32 {
    let mut score = 0.0;

    if tokens.contains(&item.category.to_lowercase()) {
        score += CATEGORY_WEIGHT;
    }

    if any_token_in_query(&item.caption, tokens) {
        score += CAPTION_WEIGHT;
    }

    if any_token_in_query(&item.material, tokens) {
        score += MATERIAL_WEIGHT;
    }

    if any_token_in_query(&item.style, tokens) {
        score += STYLE_WEIGHT;
    }

    score
}
