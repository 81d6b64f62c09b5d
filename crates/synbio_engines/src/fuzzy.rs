#![forbid(unsafe_code)]

use std::cmp::Ordering;

use synbio_contracts::record::SearchCandidate;

/// Similarity distance above which a candidate is not offered. Lower is a
/// better match; 0.0 is an exact title hit.
pub const DISTANCE_THRESHOLD: f64 = 0.6;

/// At most this many ranked candidates survive into a disambiguation list.
pub const MAX_RANKED: usize = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct RankedCandidate {
    pub candidate: SearchCandidate,
    pub distance: f64,
}

/// Rank candidates by approximate similarity of the query to their titles,
/// best first, filtered to the distance threshold and capped at ten. Ties
/// break by original candidate order, so the ranking is reproducible for a
/// fixed input.
pub fn rank(query: &str, candidates: &[SearchCandidate]) -> Vec<RankedCandidate> {
    let needle = collapse_ws(&query.to_lowercase());
    if needle.is_empty() {
        return Vec::new();
    }

    let mut scored: Vec<(usize, f64)> = candidates
        .iter()
        .enumerate()
        .map(|(index, candidate)| (index, title_distance(&needle, &candidate.title)))
        .filter(|(_, distance)| *distance <= DISTANCE_THRESHOLD)
        .collect();

    scored.sort_by(|a, b| {
        a.1.partial_cmp(&b.1)
            .unwrap_or(Ordering::Equal)
            .then(a.0.cmp(&b.0))
    });
    scored.truncate(MAX_RANKED);

    scored
        .into_iter()
        .map(|(index, distance)| RankedCandidate {
            candidate: candidates[index].clone(),
            distance,
        })
        .collect()
}

/// Distance in [0, 1] between a spoken query and a title. Jaro-Winkler is
/// compared over equal-token-count windows on both sides, so a fragment like
/// "the cloning protocol" lines up against the matching span of
/// "Gibson Cloning Protocol v2" instead of the whole string.
fn title_distance(needle: &str, title: &str) -> f64 {
    let hay = collapse_ws(&title.to_lowercase());
    if hay.is_empty() {
        return 1.0;
    }
    if needle == hay {
        return 0.0;
    }

    let needle_tokens: Vec<&str> = needle.split(' ').collect();
    let hay_tokens: Vec<&str> = hay.split(' ').collect();

    let mut best = 0.0f64;
    for window in token_windows(&hay_tokens, needle_tokens.len()) {
        best = best.max(strsim::jaro_winkler(needle, &window));
    }
    for window in token_windows(&needle_tokens, hay_tokens.len()) {
        best = best.max(strsim::jaro_winkler(&window, &hay));
    }
    1.0 - best
}

/// All contiguous `size`-token windows, joined back to text. A side shorter
/// than `size` yields nothing; the opposite comparison covers that case.
fn token_windows(tokens: &[&str], size: usize) -> Vec<String> {
    if size == 0 || tokens.len() < size {
        return Vec::new();
    }
    tokens.windows(size).map(|w| w.join(" ")).collect()
}

fn collapse_ws(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}
