//! Mob Name Resolution
//!
//! Maps free-text mob names typed by players onto the canonical keys of a
//! group's tracked mobs.
//!
//! ## Rules
//! - **Normalization**: trim surrounding whitespace, lower-case
//! - **Exact first**: a normalized query that is already a key always wins
//! - **Fuzzy fallback**: Ratcliff/Obershelp similarity against every key,
//!   keeping at most [`MAX_CANDIDATES`] keys scoring at least [`SIMILARITY_CUTOFF`]
//! - **Ambiguity handling**: two or more fuzzy hits are returned for the caller to
//!   show; a single hit is treated like an exact match
//!
//! ## Examples
//! ```ignore
//! match resolve_mob_name("pumpkin head", group.mobs.keys()) {
//!     ResolveResult::Found(key) => { /* mutate group.mobs[key] */ }
//!     ResolveResult::Ambiguous(keys) => { /* list display names, abort */ }
//!     ResolveResult::NotFound => { /* create under normalize_name(input) */ }
//! }
//! ```

use std::collections::HashMap;

/// Minimum similarity ratio for a fuzzy candidate.
pub const SIMILARITY_CUTOFF: f64 = 0.6;
/// Maximum number of fuzzy candidates reported.
pub const MAX_CANDIDATES: usize = 3;

/// Result of mob name resolution
#[derive(Debug, Clone, PartialEq)]
pub enum ResolveResult {
    /// Exact key, or the only fuzzy candidate
    Found(String),

    /// Multiple fuzzy candidates, best first - user must clarify
    Ambiguous(Vec<String>),

    /// No candidates; the normalized input becomes a new key
    NotFound,
}

/// Canonical key form of a mob name: trimmed and lower-cased.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Longest common block of `a[alo..ahi]` and `b[blo..bhi]` as `(i, j, size)`.
///
/// Leftmost-longest, like difflib's `find_longest_match`: ties resolve to the
/// earliest start in `a`, then in `b`.
fn longest_match(
    a: &[char],
    b2j: &HashMap<char, Vec<usize>>,
    b: &[char],
    (alo, ahi, blo, bhi): (usize, usize, usize, usize),
) -> (usize, usize, usize) {
    let (mut besti, mut bestj, mut bestsize) = (alo, blo, 0usize);
    let mut j2len: HashMap<usize, usize> = HashMap::new();
    for (i, ch) in a.iter().enumerate().take(ahi).skip(alo) {
        let mut next: HashMap<usize, usize> = HashMap::new();
        if let Some(positions) = b2j.get(ch) {
            for &j in positions {
                if j < blo {
                    continue;
                }
                if j >= bhi {
                    break;
                }
                let k = j.checked_sub(1).and_then(|p| j2len.get(&p)).copied().unwrap_or(0) + 1;
                next.insert(j, k);
                if k > bestsize {
                    besti = i + 1 - k;
                    bestj = j + 1 - k;
                    bestsize = k;
                }
            }
        }
        j2len = next;
    }

    // Popular characters are left out of b2j; grow the block over equal neighbours.
    while besti > alo && bestj > blo && a[besti - 1] == b[bestj - 1] {
        besti -= 1;
        bestj -= 1;
        bestsize += 1;
    }
    while besti + bestsize < ahi && bestj + bestsize < bhi && a[besti + bestsize] == b[bestj + bestsize]
    {
        bestsize += 1;
    }
    (besti, bestj, bestsize)
}

/// Character index of `b`, with over-common characters dropped for long inputs.
fn index_chars(b: &[char]) -> HashMap<char, Vec<usize>> {
    let mut b2j: HashMap<char, Vec<usize>> = HashMap::new();
    for (j, ch) in b.iter().enumerate() {
        b2j.entry(*ch).or_default().push(j);
    }
    let n = b.len();
    if n >= 200 {
        let ntest = n / 100 + 1;
        b2j.retain(|_, positions| positions.len() <= ntest);
    }
    b2j
}

/// Total size of the matching blocks between `a` and `b`.
fn matched_chars(a: &[char], b: &[char]) -> usize {
    let b2j = index_chars(b);
    let mut queue = vec![(0, a.len(), 0, b.len())];
    let mut total = 0;
    while let Some(bounds) = queue.pop() {
        let (alo, ahi, blo, bhi) = bounds;
        let (i, j, k) = longest_match(a, &b2j, b, bounds);
        if k == 0 {
            continue;
        }
        total += k;
        if alo < i && blo < j {
            queue.push((alo, i, blo, j));
        }
        if i + k < ahi && j + k < bhi {
            queue.push((i + k, ahi, j + k, bhi));
        }
    }
    total
}

/// Similarity ratio in `[0, 1]`: `2 * matches / (len(a) + len(b))`.
pub fn similarity(candidate: &str, query: &str) -> f64 {
    let a: Vec<char> = candidate.chars().collect();
    let b: Vec<char> = query.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    2.0 * matched_chars(&a, &b) as f64 / total as f64
}

/// Keys scoring at least `cutoff` against `query`, best first, capped at `limit`.
/// Equal scores order by key, descending.
pub fn close_matches<'a, I>(query: &str, keys: I, limit: usize, cutoff: f64) -> Vec<String>
where
    I: IntoIterator<Item = &'a String>,
{
    let mut scored: Vec<(f64, &String)> = keys
        .into_iter()
        .map(|k| (similarity(k, query), k))
        .filter(|(score, _)| *score >= cutoff)
        .collect();
    scored.sort_by(|x, y| y.0.total_cmp(&x.0).then_with(|| y.1.cmp(x.1)));
    scored.into_iter().take(limit).map(|(_, k)| k.clone()).collect()
}

/// Resolve a free-text mob name against a group's keys.
pub fn resolve_mob_name<'a, I>(query: &str, keys: I) -> ResolveResult
where
    I: IntoIterator<Item = &'a String> + Clone,
{
    let normalized = normalize_name(query);
    if normalized.is_empty() {
        return ResolveResult::NotFound;
    }
    if keys.clone().into_iter().any(|k| *k == normalized) {
        return ResolveResult::Found(normalized);
    }

    let mut close = close_matches(&normalized, keys, MAX_CANDIDATES, SIMILARITY_CUTOFF);
    match close.len() {
        0 => ResolveResult::NotFound,
        1 => ResolveResult::Found(close.remove(0)),
        _ => ResolveResult::Ambiguous(close),
    }
}

/// Format a disambiguation prompt from candidate display names.
pub fn format_disambiguation_prompt(names: &[String]) -> String {
    let mut output = String::from("Mob name ambiguous. Did you mean:");
    for name in names {
        output.push_str("\n • ");
        output.push_str(name);
    }
    output
}
