#![forbid(unsafe_code)]

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionResolution {
    Accepted,
    Rejected,
}

/// A selection turn is honored only for a candidate actually offered by the
/// most recent disambiguation list in this session. Anything else (stale
/// keys, replayed turns, platform re-matching gone wrong) is Rejected and
/// surfaces as an error turn with re-search suggestions.
pub fn resolve_selection(selected_id: u64, offered_ids: &[u64]) -> SelectionResolution {
    if offered_ids.contains(&selected_id) {
        SelectionResolution::Accepted
    } else {
        SelectionResolution::Rejected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offered_id_is_accepted() {
        assert_eq!(
            resolve_selection(3, &[1, 2, 3]),
            SelectionResolution::Accepted
        );
    }

    #[test]
    fn unoffered_id_is_rejected() {
        assert_eq!(
            resolve_selection(9, &[1, 2, 3]),
            SelectionResolution::Rejected
        );
        assert_eq!(resolve_selection(1, &[]), SelectionResolution::Rejected);
    }
}
