#![forbid(unsafe_code)]

use synbio_contracts::dialog::{Card, DialogTurn, SelectionList, TurnRequest};
use synbio_contracts::session::SessionContext;
use synbio_contracts::Validate;
use synbio_engines::fetch::{DataFetch, FetchConfig, HttpFetcher};
use synbio_os::endpoints::Endpoints;
use synbio_os::pipeline::TurnPipeline;
use synbio_os::router;

/// One webhook call from the assistant platform: the routed intent's wire
/// name, its slot arguments, and the session context echoed back from the
/// previous response.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct WebhookTurnRequest {
    pub intent: String,
    pub part_name: Option<String>,
    pub query: Option<String>,
    pub selected_key: Option<String>,
    #[serde(default)]
    pub session: SessionContext,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct WebhookTurnResponse {
    pub status: String,
    pub spoken_line: String,
    pub card: Option<Card>,
    pub suggestions: Vec<String>,
    pub list: Option<SelectionList>,
    /// Updated session context the platform must echo back on the next call.
    pub session: SessionContext,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct WebhookHealthResponse {
    pub status: String,
    pub reason: Option<String>,
}

/// Per-process webhook runtime. Stateless across calls: every turn's
/// continuity travels in the request/response session field, so concurrent
/// requests need no shared mutable state.
#[derive(Debug, Clone)]
pub struct AdapterRuntime<F: DataFetch> {
    pipeline: TurnPipeline<F>,
}

impl AdapterRuntime<HttpFetcher> {
    pub fn default_from_env() -> Result<Self, String> {
        let endpoints = Endpoints::from_env()?;
        let mut config = FetchConfig::mvp_v1();
        config.timeout_ms = parse_fetch_timeout_ms_from_env(config.timeout_ms);
        let fetcher = HttpFetcher::new(config);
        Ok(Self::new(TurnPipeline::new(endpoints, fetcher)))
    }
}

fn parse_fetch_timeout_ms_from_env(default_ms: u32) -> u32 {
    std::env::var("SYNBIO_FETCH_TIMEOUT_MS")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .filter(|v| (100..=60_000).contains(v))
        .unwrap_or(default_ms)
}

impl<F: DataFetch> AdapterRuntime<F> {
    pub fn new(pipeline: TurnPipeline<F>) -> Self {
        Self { pipeline }
    }

    /// Run one webhook turn. `Err` covers malformed requests only; handler
    /// failures come back as `Ok` with a composed error turn inside.
    pub fn run_webhook_turn(
        &self,
        request: WebhookTurnRequest,
    ) -> Result<WebhookTurnResponse, String> {
        let intent = router::route(&request.intent)
            .ok_or_else(|| format!("unroutable intent '{}'", request.intent))?;
        let turn_request = TurnRequest::v1(
            intent,
            non_empty(request.part_name),
            non_empty(request.query),
            non_empty(request.selected_key),
        )
        .map_err(|violation| format!("invalid turn request: {violation:?}"))?;
        request
            .session
            .validate()
            .map_err(|violation| format!("invalid session context: {violation:?}"))?;

        let result = self.pipeline.run_turn(&turn_request, &request.session);
        Ok(webhook_response_from_turn(result.turn, result.session))
    }

    pub fn health_report(&self) -> WebhookHealthResponse {
        match router::startup_intent_map_check() {
            Ok(()) => WebhookHealthResponse {
                status: "ok".to_string(),
                reason: None,
            },
            Err(reason) => WebhookHealthResponse {
                status: "error".to_string(),
                reason: Some(reason),
            },
        }
    }
}

fn webhook_response_from_turn(turn: DialogTurn, session: SessionContext) -> WebhookTurnResponse {
    WebhookTurnResponse {
        status: "ok".to_string(),
        spoken_line: turn.spoken_line,
        card: turn.card,
        suggestions: turn.suggestions,
        list: turn.list,
        session,
    }
}

/// Assistant platforms send absent slots as empty strings as often as they
/// omit them; both mean "not filled".
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|text| !text.trim().is_empty())
}
