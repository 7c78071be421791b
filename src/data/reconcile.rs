//! Key Reconciliation Module
//! Fuzzy-matches a source's key column against a reference key list, so that
//! tables naming the same entities slightly differently can still be joined.

use rayon::prelude::*;
use strsim::jaro_winkler;

use super::source::{SourceError, SourceTable};

/// Minimum Jaro-Winkler similarity for a key to be considered the same entity.
pub const DEFAULT_MATCH_THRESHOLD: f64 = 0.8;

/// Best reference key for `name`, with its similarity score.
/// Comparison is case-insensitive.
pub fn best_match<'a>(name: &str, reference: &'a [String]) -> Option<(&'a str, f64)> {
    let lowered = name.to_lowercase();
    reference
        .iter()
        .map(|r| (r.as_str(), jaro_winkler(&lowered, &r.to_lowercase())))
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
}

/// Rewrite the table's key column to the closest reference keys.
///
/// Keys scoring below `threshold` have no acceptable match; their rows are
/// dropped. Duplicate matches are resolved later by `dedup_keys`. Returns the
/// number of keys that matched.
pub fn reconcile_keys(
    table: &mut SourceTable,
    key_column: &str,
    reference: &[String],
    threshold: f64,
) -> Result<usize, SourceError> {
    let col = table.frame().column(key_column)?.str()?;
    let raw_keys: Vec<Option<String>> = col.into_iter().map(|k| k.map(str::to_string)).collect();

    // Scoring every key against every reference name is the expensive part;
    // fan it out across rows.
    let matched: Vec<Option<String>> = raw_keys
        .par_iter()
        .map(|key| {
            let key = key.as_deref()?;
            let (candidate, score) = best_match(key, reference)?;
            (score >= threshold).then(|| candidate.to_string())
        })
        .collect();

    let kept = matched.iter().filter(|m| m.is_some()).count();
    log::debug!(
        "reconciled keys for '{}': {}/{} matched",
        table.short_name(),
        kept,
        raw_keys.len()
    );

    table.replace_keys(key_column, matched)?;
    Ok(kept)
}
