#![forbid(unsafe_code)]

use serde_json::Value;
use synbio_contracts::record::{PartRecord, ProtocolRecord, SearchCandidate};
use synbio_contracts::Validate;

/// The raw tree could not be shaped into a record at all. Missing optional
/// fields never produce this; only an unlocatable record root does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseError {
    pub field: &'static str,
}

impl ParseError {
    fn new(field: &'static str) -> Self {
        Self { field }
    }
}

/// Cleaning transform applied to every text field: strip markup tags, trim
/// surrounding whitespace, drop one trailing full stop so downstream sentence
/// composition never doubles it. Idempotent on already-clean text.
pub fn clean(input: &str) -> String {
    let stripped = strip_tags(input);
    let trimmed = stripped.trim();
    trimmed.strip_suffix('.').unwrap_or(trimmed).to_string()
}

fn strip_tags(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_tag = false;
    for c in input.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}

/// Text up to the first full stop, for one-sentence spoken summaries.
pub fn first_sentence(input: &str) -> String {
    input.split('.').next().unwrap_or("").trim().to_string()
}

/// Normalize the registry XML tree into a part record. The record root lives
/// at `rsbpml.part_list[0].part[0]`; every field under it is optional and an
/// empty or missing element maps to absence.
pub fn normalize_part(tree: &Value) -> Result<PartRecord, ParseError> {
    let part = tree
        .get("rsbpml")
        .and_then(|v| v.get("part_list"))
        .and_then(|v| v.get(0))
        .and_then(|v| v.get("part"))
        .and_then(|v| v.get(0))
        .ok_or(ParseError::new("rsbpml.part_list.part"))?;

    let name = part_field(part, "part_name").ok_or(ParseError::new("part_name"))?;
    let record = PartRecord {
        name,
        nickname: part_field(part, "part_nickname"),
        short_name: part_field(part, "part_short_name"),
        part_type: part_field(part, "part_type"),
        short_desc: part_field(part, "part_short_desc"),
        author: part_field(part, "part_author"),
        results: part_field(part, "part_results"),
        release_status: part_field(part, "release_status"),
        sample_status: part_field(part, "sample_status"),
        url: part_field(part, "part_url"),
    };
    record
        .validate()
        .map_err(|_| ParseError::new("part_record"))?;
    Ok(record)
}

fn part_field(part: &Value, key: &str) -> Option<String> {
    let text = part.get(key)?.get(0)?.as_str()?;
    non_empty(clean(text))
}

/// Normalize one protocol JSON object. `id` and a non-empty `title` are
/// required; everything else maps to absence when missing or empty. The
/// canonical page URL is constructed from `page_base` (ends with `/`).
pub fn normalize_protocol(tree: &Value, page_base: &str) -> Result<ProtocolRecord, ParseError> {
    if !tree.is_object() {
        return Err(ParseError::new("protocol"));
    }
    let id = tree
        .get("id")
        .and_then(Value::as_u64)
        .ok_or(ParseError::new("protocol.id"))?;
    let title = tree
        .get("title")
        .and_then(Value::as_str)
        .map(clean)
        .and_then(non_empty)
        .ok_or(ParseError::new("protocol.title"))?;

    let record = ProtocolRecord {
        id,
        title,
        description: optional_text(tree.get("description")),
        materials: optional_text(tree.get("materials")),
        steps: protocol_steps(tree.get("protocol_steps")),
        url: format!("{page_base}{id}/"),
    };
    record
        .validate()
        .map_err(|_| ParseError::new("protocol_record"))?;
    Ok(record)
}

fn optional_text(value: Option<&Value>) -> Option<String> {
    value.and_then(Value::as_str).map(clean).and_then(non_empty)
}

fn protocol_steps(value: Option<&Value>) -> Option<Vec<String>> {
    let rows = value?.as_array()?;
    let steps: Vec<String> = rows.iter().filter_map(step_text).collect();
    if steps.is_empty() {
        None
    } else {
        Some(steps)
    }
}

fn step_text(row: &Value) -> Option<String> {
    let raw = match row {
        Value::String(text) => text.as_str(),
        Value::Object(_) => row
            .get("description")
            .or_else(|| row.get("title"))
            .and_then(Value::as_str)?,
        _ => return None,
    };
    non_empty(clean(raw))
}

/// Project the protocol listing (JSON array of summaries) into ranking
/// candidates. Malformed rows are skipped; only a non-array top level fails.
pub fn candidates_from_tree(tree: &Value) -> Result<Vec<SearchCandidate>, ParseError> {
    let rows = tree.as_array().ok_or(ParseError::new("protocol_listing"))?;
    Ok(rows.iter().filter_map(candidate_from_row).collect())
}

fn candidate_from_row(row: &Value) -> Option<SearchCandidate> {
    let id = row.get("id")?.as_u64()?;
    let title = non_empty(clean(row.get("title")?.as_str()?))?;
    let short_desc = optional_text(row.get("description"));
    SearchCandidate::v1(id, title, short_desc).ok()
}

fn non_empty(text: String) -> Option<String> {
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::xml_to_tree;
    use serde_json::json;

    #[test]
    fn clean_strips_tags_trims_and_drops_one_trailing_stop() {
        assert_eq!(clean("  <b>A Student</b>. "), "A Student");
        assert_eq!(clean("Spans <i>multiple\nlines</i> fine."), "Spans multiple\nlines fine");
    }

    #[test]
    fn clean_is_idempotent_on_clean_text() {
        for text in ["A Student", "Gibson Assembly v2", "works well"] {
            assert_eq!(clean(&clean(text)), clean(text));
            assert_eq!(clean(text), text);
        }
    }

    #[test]
    fn first_sentence_stops_at_the_first_full_stop() {
        assert_eq!(
            first_sentence("Joins fragments. Then transforms cells."),
            "Joins fragments"
        );
        assert_eq!(first_sentence("No stop here"), "No stop here");
    }

    #[test]
    fn normalize_part_maps_empty_elements_to_absence() {
        let tree = xml_to_tree(
            "<rsbpml><part_list><part>\
             <part_name>BBa_K123000</part_name>\
             <part_nickname/>\
             <part_author>  A Student.  </part_author>\
             <release_status></release_status>\
             </part></part_list></rsbpml>",
        )
        .unwrap();
        let record = normalize_part(&tree).unwrap();
        assert_eq!(record.name, "BBa_K123000");
        assert_eq!(record.nickname, None);
        assert_eq!(record.release_status, None);
        assert_eq!(record.author.as_deref(), Some("A Student"));
    }

    #[test]
    fn normalize_part_fails_only_for_missing_record_root() {
        let tree = xml_to_tree("<rsbpml><part_list></part_list></rsbpml>").unwrap();
        let err = normalize_part(&tree).unwrap_err();
        assert_eq!(err.field, "rsbpml.part_list.part");
    }

    #[test]
    fn normalize_protocol_reads_steps_and_builds_page_url() {
        let tree = json!({
            "id": 42,
            "title": "Gibson Assembly.",
            "description": "<p>Joins fragments.</p>",
            "materials": "",
            "protocol_steps": [
                {"description": "Mix the master mix."},
                {"description": "Incubate at 50C."}
            ]
        });
        let record = normalize_protocol(&tree, "https://protocat.org/protocol/").unwrap();
        assert_eq!(record.title, "Gibson Assembly");
        assert_eq!(record.description.as_deref(), Some("Joins fragments"));
        assert_eq!(record.materials, None);
        assert_eq!(record.steps.as_ref().map(Vec::len), Some(2));
        assert_eq!(record.url, "https://protocat.org/protocol/42/");
    }

    #[test]
    fn normalize_protocol_requires_id_and_title() {
        let err = normalize_protocol(&json!({"title": "x"}), "base/").unwrap_err();
        assert_eq!(err.field, "protocol.id");
        let err = normalize_protocol(&json!({"id": 3}), "base/").unwrap_err();
        assert_eq!(err.field, "protocol.title");
    }

    #[test]
    fn candidates_skip_malformed_rows_without_failing() {
        let tree = json!([
            {"id": 1, "title": "Gibson Assembly", "description": "Joins fragments."},
            {"title": "missing id"},
            {"id": 3, "title": "   "}
        ]);
        let candidates = candidates_from_tree(&tree).unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].id, 1);
        assert_eq!(candidates[0].short_desc.as_deref(), Some("Joins fragments"));
    }

    #[test]
    fn candidates_require_an_array_listing() {
        assert!(candidates_from_tree(&json!({"detail": "not found"})).is_err());
    }
}
