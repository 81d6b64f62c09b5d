#![forbid(unsafe_code)]

use synbio_contracts::dialog::{DialogOutcome, DialogTurn, ErrorReason, IntentId, TurnRequest};
use synbio_contracts::record::{ExternalRecord, ProtocolRecord, SearchCandidate};
use synbio_contracts::session::SessionContext;
use synbio_engines::compose::{Composer, ComposerConfig};
use synbio_engines::fetch::{DataFetch, FetchError, WireFormat};
use synbio_engines::fuzzy;
use synbio_engines::normalize::{candidates_from_tree, normalize_part, normalize_protocol};

use crate::endpoints::Endpoints;
use crate::selection::{resolve_selection, SelectionResolution};

/// One composed dialog turn plus the session context the assistant runtime
/// should persist for the next turn.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnResult {
    pub turn: DialogTurn,
    pub session: SessionContext,
}

/// Per-turn orchestration: route the intent, run at most one outbound fetch,
/// narrow or normalize, compose. Stateless across turns; all continuity
/// rides in the session context passed in and handed back.
#[derive(Debug, Clone)]
pub struct TurnPipeline<F: DataFetch> {
    endpoints: Endpoints,
    composer: Composer,
    fetcher: F,
}

impl<F: DataFetch> TurnPipeline<F> {
    pub fn new(endpoints: Endpoints, fetcher: F) -> Self {
        let composer = Composer::new(ComposerConfig {
            part_page_base: endpoints.part_page_base().to_string(),
        });
        Self {
            endpoints,
            composer,
            fetcher,
        }
    }

    /// Run one dialog turn. Every failure path terminates in a composed,
    /// user-readable turn; nothing propagates out as a raw error.
    pub fn run_turn(&self, request: &TurnRequest, session: &SessionContext) -> TurnResult {
        let (outcome, next_session) = self.outcome_for(request, session);
        let turn = self
            .composer
            .compose(&outcome)
            .unwrap_or_else(|_| Composer::fallback_error_turn());
        TurnResult {
            turn,
            session: next_session,
        }
    }

    fn outcome_for(
        &self,
        request: &TurnRequest,
        session: &SessionContext,
    ) -> (DialogOutcome, SessionContext) {
        match request.intent {
            IntentId::GetPart => (
                self.get_part(request.part_name.as_deref()),
                SessionContext::default(),
            ),
            IntentId::ProtocolSearch => self.protocol_search(request.raw_query.as_deref()),
            IntentId::ProtocolSelect => {
                self.protocol_select(request.selected_key.as_deref(), session)
            }
            IntentId::ProtocolSteps => self.protocol_steps(session),
        }
    }

    fn get_part(&self, part_name: Option<&str>) -> DialogOutcome {
        let name = match trimmed(part_name) {
            Some(name) => name,
            None => return error(ErrorReason::MissingArgument),
        };
        let tree = match self
            .fetcher
            .fetch(&self.endpoints.part_url(&name), WireFormat::Xml)
        {
            Ok(tree) => tree,
            Err(err) => return error(reason_from_fetch(&err)),
        };
        match normalize_part(&tree) {
            Ok(record) => DialogOutcome::SingleResult(ExternalRecord::Part(record)),
            Err(_) => error(ErrorReason::Parse),
        }
    }

    fn protocol_search(&self, raw_query: Option<&str>) -> (DialogOutcome, SessionContext) {
        let query = match trimmed(raw_query) {
            Some(query) => query,
            None => {
                return (
                    error(ErrorReason::MissingArgument),
                    SessionContext::default(),
                )
            }
        };
        let tree = match self
            .fetcher
            .fetch(&self.endpoints.protocol_listing_url(), WireFormat::Json)
        {
            Ok(tree) => tree,
            Err(err) => return (error(reason_from_fetch(&err)), SessionContext::default()),
        };
        let candidates = match candidates_from_tree(&tree) {
            Ok(candidates) => candidates,
            Err(_) => return (error(ErrorReason::Parse), SessionContext::default()),
        };

        let ranked = fuzzy::rank(&query, &candidates);
        match ranked.len() {
            0 => (DialogOutcome::NoMatch { query }, SessionContext::default()),
            1 => self.show_protocol(ranked[0].candidate.id),
            _ => {
                let offered: Vec<SearchCandidate> =
                    ranked.into_iter().map(|r| r.candidate).collect();
                let offered_ids: Vec<u64> = offered.iter().map(|c| c.id).collect();
                match DialogOutcome::disambiguation(offered) {
                    Ok(outcome) => (outcome, SessionContext::offered(offered_ids)),
                    Err(_) => (error(ErrorReason::Parse), SessionContext::default()),
                }
            }
        }
    }

    fn protocol_select(
        &self,
        selected_key: Option<&str>,
        session: &SessionContext,
    ) -> (DialogOutcome, SessionContext) {
        let selected_id = match selected_key.and_then(|key| key.trim().parse::<u64>().ok()) {
            Some(id) => id,
            None => return (error(ErrorReason::SelectionMismatch), session.clone()),
        };
        match resolve_selection(selected_id, &session.offered_ids) {
            SelectionResolution::Rejected => {
                (error(ErrorReason::SelectionMismatch), session.clone())
            }
            SelectionResolution::Accepted => self.show_protocol(selected_id),
        }
    }

    /// Independent by-id re-fetch of the authoritative record. The cached
    /// list projection is never trusted as the record itself, and a backend
    /// answering with a different id degrades to the selection error.
    fn show_protocol(&self, id: u64) -> (DialogOutcome, SessionContext) {
        match self.fetch_protocol(id) {
            Ok(record) => (
                DialogOutcome::SingleResult(ExternalRecord::Protocol(record.clone())),
                SessionContext::showing(record),
            ),
            Err(reason) => (error(reason), SessionContext::default()),
        }
    }

    fn fetch_protocol(&self, id: u64) -> Result<ProtocolRecord, ErrorReason> {
        let tree = self
            .fetcher
            .fetch(&self.endpoints.protocol_url(id), WireFormat::Json)
            .map_err(|err| reason_from_fetch(&err))?;
        let record = normalize_protocol(&tree, self.endpoints.protocol_page_base())
            .map_err(|_| ErrorReason::Parse)?;
        if record.id != id {
            return Err(ErrorReason::SelectionMismatch);
        }
        Ok(record)
    }

    /// Re-display the stored protocol's steps without another fetch.
    fn protocol_steps(&self, session: &SessionContext) -> (DialogOutcome, SessionContext) {
        match &session.stored_protocol {
            Some(protocol) if protocol.steps.is_some() => (
                DialogOutcome::StepsGuide(protocol.clone()),
                session.clone(),
            ),
            _ => (error(ErrorReason::NoStoredProtocol), session.clone()),
        }
    }
}

fn error(reason: ErrorReason) -> DialogOutcome {
    DialogOutcome::Error { reason }
}

fn reason_from_fetch(err: &FetchError) -> ErrorReason {
    if err.is_parse() {
        ErrorReason::Parse
    } else {
        ErrorReason::Network
    }
}

fn trimmed(value: Option<&str>) -> Option<String> {
    let text = value?.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use synbio_engines::fetch::FixtureFetch;

    const LISTING_URL: &str = "https://protocat.org/api/protocol/?format=json";
    const GIBSON_URL: &str = "https://protocat.org/api/protocol/1/?format=json";
    const PART_URL: &str = "https://parts.igem.org/cgi/xml/part.cgi?part=BBa_K123000";

    const LISTING_JSON: &str = r#"[
        {"id": 1, "title": "Gibson Assembly", "description": "Joins fragments in one pot."},
        {"id": 2, "title": "Gel Electrophoresis", "description": "Separates DNA by size."},
        {"id": 3, "title": "PCR Cleanup", "description": "Removes leftover primers."}
    ]"#;

    const GIBSON_JSON: &str = r#"{
        "id": 1,
        "title": "Gibson Assembly",
        "description": "Joins fragments in one pot.",
        "materials": "Master mix, fragments",
        "protocol_steps": [
            {"description": "Mix the master mix."},
            {"description": "Incubate at 50C."}
        ]
    }"#;

    const PART_XML: &str = "<rsbpml><part_list><part>\
        <part_name>BBa_K123000</part_name>\
        <part_short_name>K123000</part_short_name>\
        <part_type>Coding</part_type>\
        <part_results>Works</part_results>\
        </part></part_list></rsbpml>";

    fn pipeline(fetcher: FixtureFetch) -> TurnPipeline<FixtureFetch> {
        TurnPipeline::new(
            Endpoints::new(
                "https://parts.igem.org/cgi/xml/part.cgi",
                "https://protocat.org/api/protocol",
                "https://protocat.org/protocol/",
                "https://parts.igem.org/Part:",
            )
            .unwrap(),
            fetcher,
        )
    }

    fn search_request(query: &str) -> TurnRequest {
        TurnRequest::v1(
            IntentId::ProtocolSearch,
            None,
            Some(query.to_string()),
            None,
        )
        .unwrap()
    }

    fn select_request(key: &str) -> TurnRequest {
        TurnRequest::v1(
            IntentId::ProtocolSelect,
            None,
            None,
            Some(key.to_string()),
        )
        .unwrap()
    }

    #[test]
    fn gibson_search_disambiguates_with_gibson_first() {
        let pipeline = pipeline(FixtureFetch::new().with_body(LISTING_URL, LISTING_JSON));
        let result = pipeline.run_turn(&search_request("gibson"), &SessionContext::default());

        let list = result.turn.list.expect("expected a selectable list");
        assert_eq!(list.items[0].key, "1");
        assert_eq!(list.items[0].title, "Gibson Assembly");
        assert!(result.session.offered_ids.contains(&1));
        assert_eq!(result.session.offered_ids[0], 1);
    }

    #[test]
    fn exact_single_match_skips_the_list() {
        let listing = r#"[
            {"id": 1, "title": "Gibson Assembly", "description": "Joins fragments."},
            {"id": 2, "title": "PCR", "description": "Amplifies DNA."}
        ]"#;
        let pipeline = pipeline(
            FixtureFetch::new()
                .with_body(LISTING_URL, listing)
                .with_body(GIBSON_URL, GIBSON_JSON),
        );
        let result = pipeline.run_turn(
            &search_request("gibson assembly"),
            &SessionContext::default(),
        );

        assert!(result.turn.list.is_none());
        assert!(result.turn.spoken_line.starts_with("Here's the Gibson Assembly."));
        assert_eq!(
            result.session.stored_protocol.as_ref().map(|p| p.id),
            Some(1)
        );
    }

    #[test]
    fn no_match_offers_fallback_suggestions() {
        let pipeline = pipeline(FixtureFetch::new().with_body(LISTING_URL, "[]"));
        let result = pipeline.run_turn(
            &search_request("underwater basket weaving"),
            &SessionContext::default(),
        );
        assert!(result
            .turn
            .spoken_line
            .starts_with("I couldn't find any protocols about"));
        assert_eq!(
            result.turn.suggestions,
            vec!["Search again", "Search the other source", "Exit"]
        );
        assert!(result.session.offered_ids.is_empty());
    }

    #[test]
    fn unoffered_selection_is_rejected_with_error_turn() {
        let pipeline = pipeline(FixtureFetch::new());
        let session = SessionContext::offered(vec![1, 2, 3]);
        let result = pipeline.run_turn(&select_request("9"), &session);

        assert_eq!(
            result.turn.spoken_line,
            "Sorry, I couldn't open that protocol. What should I do instead?"
        );
        assert_eq!(
            result.turn.suggestions,
            vec!["Search again", "Search the other source", "Exit"]
        );
        // The offer stays live so the user can pick again.
        assert_eq!(result.session.offered_ids, vec![1, 2, 3]);
    }

    #[test]
    fn accepted_selection_refetches_and_stores_the_protocol() {
        let pipeline = pipeline(FixtureFetch::new().with_body(GIBSON_URL, GIBSON_JSON));
        let session = SessionContext::offered(vec![1, 2]);
        let result = pipeline.run_turn(&select_request("1"), &session);

        assert!(result.turn.spoken_line.starts_with("Here's the Gibson Assembly."));
        assert_eq!(
            result.session.stored_protocol.as_ref().map(|p| p.id),
            Some(1)
        );
        assert!(result.session.offered_ids.is_empty());
    }

    #[test]
    fn refetched_record_with_wrong_id_degrades_to_error() {
        let wrong = r#"{"id": 7, "title": "Some Other Protocol"}"#;
        let pipeline = pipeline(FixtureFetch::new().with_body(GIBSON_URL, wrong));
        let session = SessionContext::offered(vec![1]);
        let result = pipeline.run_turn(&select_request("1"), &session);

        assert_eq!(
            result.turn.spoken_line,
            "Sorry, I couldn't open that protocol. What should I do instead?"
        );
        assert!(result.session.stored_protocol.is_none());
    }

    #[test]
    fn steps_turn_replays_the_stored_protocol_without_fetching() {
        let show = pipeline(FixtureFetch::new().with_body(GIBSON_URL, GIBSON_JSON));
        let session = SessionContext::offered(vec![1]);
        let shown = show.run_turn(&select_request("1"), &session);

        // No fixture bodies at all: a fetch attempt would fail the turn.
        let steps = pipeline(FixtureFetch::new());
        let request = TurnRequest::v1(IntentId::ProtocolSteps, None, None, None).unwrap();
        let result = steps.run_turn(&request, &shown.session);

        assert!(result.turn.spoken_line.contains("has 2 steps"));
        assert!(result.turn.card.unwrap().body.contains("1. Mix the master mix"));
        assert_eq!(result.session, shown.session);
    }

    #[test]
    fn steps_without_a_stored_protocol_is_an_error_turn() {
        let pipeline = pipeline(FixtureFetch::new());
        let request = TurnRequest::v1(IntentId::ProtocolSteps, None, None, None).unwrap();
        let result = pipeline.run_turn(&request, &SessionContext::default());
        assert_eq!(
            result.turn.spoken_line,
            "Sorry, I don't have a protocol open to walk through. What should I do instead?"
        );
    }

    #[test]
    fn part_lookup_normalizes_and_composes() {
        let pipeline = pipeline(FixtureFetch::new().with_body(PART_URL, PART_XML));
        let request = TurnRequest::v1(
            IntentId::GetPart,
            Some("BBa_K123000".to_string()),
            None,
            None,
        )
        .unwrap();
        let result = pipeline.run_turn(&request, &SessionContext::default());

        assert_eq!(
            result.turn.spoken_line,
            "Part K123000 is a Coding that works."
        );
        let card = result.turn.card.unwrap();
        assert_eq!(
            card.link_url,
            "https://parts.igem.org/Part:BBa_K123000"
        );
    }

    #[test]
    fn missing_part_argument_is_a_composed_error() {
        let pipeline = pipeline(FixtureFetch::new());
        let request = TurnRequest::v1(IntentId::GetPart, Some("   ".to_string()), None, None);
        // "   " fails contract validation; a genuinely absent slot routes to
        // the missing-argument error instead.
        assert!(request.is_err());

        let request = TurnRequest::v1(IntentId::GetPart, None, None, None).unwrap();
        let result = pipeline.run_turn(&request, &SessionContext::default());
        assert!(result.turn.spoken_line.starts_with("Sorry, I didn't catch"));
    }

    #[test]
    fn network_failure_surfaces_the_database_apology() {
        let pipeline = pipeline(FixtureFetch::new());
        let result = pipeline.run_turn(&search_request("gibson"), &SessionContext::default());
        assert!(result
            .turn
            .spoken_line
            .starts_with("There was an error connecting to the database."));
        assert_eq!(
            result.turn.suggestions,
            vec!["Search again", "Search the other source", "Exit"]
        );
    }
}
