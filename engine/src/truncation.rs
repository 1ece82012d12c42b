//! Truncation policy hook over the reconstructed chain (spec §4.7.1, open
//! question 3: `request.truncation` is a named-policy string; the default is
//! a no-op so no history is ever silently dropped unless a caller opts in).

use protocol::Item;

/// Applies `policy` (from `request.truncation`) to the chronologically
/// flattened chain before the first turn. `None` and `"none"` are the
/// identity policy. Any other name we don't recognize yet also passes
/// through unchanged rather than erroring, logging a warning so operators
/// notice a typo'd policy name instead of silently truncating nothing.
pub fn apply(items: Vec<Item>, policy: Option<&str>) -> Vec<Item> {
    match policy {
        None | Some("none") => items,
        Some("last_20_items") => {
            let len = items.len();
            if len <= 20 {
                items
            } else {
                items.into_iter().skip(len - 20).collect()
            }
        }
        Some(other) => {
            tracing::warn!(policy = other, "unknown truncation policy, falling back to no-op");
            items
        }
    }
}
