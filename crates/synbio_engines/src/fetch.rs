#![forbid(unsafe_code)]

use std::collections::BTreeMap;
use std::time::Duration;

use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireFormat {
    Json,
    Xml,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchConfig {
    pub timeout_ms: u32,
    pub user_agent: &'static str,
}

impl FetchConfig {
    pub fn mvp_v1() -> Self {
        Self {
            timeout_ms: 8_000,
            user_agent: "synbio_webhook/0.1",
        }
    }
}

/// Transport or body-decode failure for one outbound call. `kind` is a
/// stable classification; `is_parse` separates "body unrecognizable" from
/// "never got a body".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchError {
    pub kind: &'static str,
    pub http_status: Option<u16>,
}

impl FetchError {
    pub fn new(kind: &'static str, http_status: Option<u16>) -> Self {
        Self { kind, http_status }
    }

    pub fn is_parse(&self) -> bool {
        matches!(self.kind, "json_parse" | "xml_parse")
    }
}

/// Single-attempt fetch of one external document. Implementations issue at
/// most one outbound call per invocation and never retry; the caller turns a
/// failure into a composed error turn.
pub trait DataFetch {
    fn fetch(&self, url: &str, format: WireFormat) -> Result<Value, FetchError>;
}

#[derive(Debug, Clone)]
pub struct HttpFetcher {
    agent: ureq::Agent,
}

impl HttpFetcher {
    pub fn new(config: FetchConfig) -> Self {
        let timeout = Duration::from_millis(u64::from(config.timeout_ms).max(100));
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(timeout)
            .timeout_read(timeout)
            .timeout_write(timeout)
            .user_agent(config.user_agent)
            .build();
        Self { agent }
    }
}

impl DataFetch for HttpFetcher {
    fn fetch(&self, url: &str, format: WireFormat) -> Result<Value, FetchError> {
        let response = self
            .agent
            .get(url)
            .call()
            .map_err(fetch_error_from_ureq)?;
        let body = response
            .into_string()
            .map_err(|_| FetchError::new("transport", None))?;
        decode_body(&body, format)
    }
}

/// Decode a fetched body into the schema-less tree. Parsing is only ever
/// attempted on a successfully fetched body.
pub fn decode_body(body: &str, format: WireFormat) -> Result<Value, FetchError> {
    match format {
        WireFormat::Json => {
            serde_json::from_str(body).map_err(|_| FetchError::new("json_parse", None))
        }
        WireFormat::Xml => xml_to_tree(body),
    }
}

fn fetch_error_from_ureq(err: ureq::Error) -> FetchError {
    match err {
        ureq::Error::Status(status, _) => FetchError::new("http_status", Some(status as u16)),
        ureq::Error::Transport(transport) => {
            let combined = format!("{:?} {}", transport.kind(), transport);
            FetchError::new(classify_transport_error_kind(&combined), None)
        }
    }
}

fn classify_transport_error_kind(raw: &str) -> &'static str {
    let lower = raw.to_ascii_lowercase();
    if lower.contains("timeout") {
        "timeout"
    } else if lower.contains("tls") || lower.contains("ssl") {
        "tls"
    } else if lower.contains("dns") {
        "dns"
    } else if lower.contains("connection") || lower.contains("connect") {
        "connection"
    } else {
        "transport"
    }
}

/// Convert an XML document into the same keyed-array tree shape the protocol
/// JSON already has: each element becomes an object whose child elements are
/// arrays under the child name, and a text-only element becomes a string.
/// `<part_list><part>...</part></part_list>` therefore reads as
/// `tree["rsbpml"]["part_list"][0]["part"][0]`.
pub fn xml_to_tree(body: &str) -> Result<Value, FetchError> {
    use quick_xml::events::Event;
    use quick_xml::Reader;

    let mut reader = Reader::from_str(body);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<(String, Map<String, Value>, String)> = Vec::new();
    let mut root: Option<(String, Value)> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(start)) => {
                let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
                stack.push((name, Map::new(), String::new()));
            }
            Ok(Event::Empty(empty)) => {
                let name = String::from_utf8_lossy(empty.name().as_ref()).into_owned();
                attach_child(&mut stack, &mut root, name, Value::String(String::new()))?;
            }
            Ok(Event::Text(text)) => {
                let unescaped = text
                    .unescape()
                    .map_err(|_| FetchError::new("xml_parse", None))?;
                if let Some((_, _, buffer)) = stack.last_mut() {
                    buffer.push_str(&unescaped);
                }
            }
            Ok(Event::CData(cdata)) => {
                let raw = String::from_utf8_lossy(&cdata.into_inner()).into_owned();
                if let Some((_, _, buffer)) = stack.last_mut() {
                    buffer.push_str(&raw);
                }
            }
            Ok(Event::End(_)) => {
                let (name, children, text) =
                    stack.pop().ok_or(FetchError::new("xml_parse", None))?;
                let value = if children.is_empty() {
                    Value::String(text.trim().to_string())
                } else {
                    Value::Object(children)
                };
                attach_child(&mut stack, &mut root, name, value)?;
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(_) => return Err(FetchError::new("xml_parse", None)),
        }
    }

    if !stack.is_empty() {
        return Err(FetchError::new("xml_parse", None));
    }
    let (root_name, root_value) = root.ok_or(FetchError::new("xml_parse", None))?;
    let mut wrapper = Map::new();
    wrapper.insert(root_name, root_value);
    Ok(Value::Object(wrapper))
}

fn attach_child(
    stack: &mut [(String, Map<String, Value>, String)],
    root: &mut Option<(String, Value)>,
    name: String,
    value: Value,
) -> Result<(), FetchError> {
    match stack.last_mut() {
        Some((_, children, _)) => {
            let slot = children
                .entry(name)
                .or_insert_with(|| Value::Array(Vec::new()));
            match slot.as_array_mut() {
                Some(siblings) => siblings.push(value),
                None => return Err(FetchError::new("xml_parse", None)),
            }
            Ok(())
        }
        None => {
            // Document root. A second root element means the body is not XML.
            if root.is_some() {
                return Err(FetchError::new("xml_parse", None));
            }
            *root = Some((name, value));
            Ok(())
        }
    }
}

/// Canned-response fetcher for tests and offline runs, standing in for the
/// live transport the way engine fixtures do elsewhere in the codebase.
#[derive(Debug, Clone, Default)]
pub struct FixtureFetch {
    bodies: BTreeMap<String, String>,
}

impl FixtureFetch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_body(mut self, url: impl Into<String>, body: impl Into<String>) -> Self {
        self.bodies.insert(url.into(), body.into());
        self
    }
}

impl DataFetch for FixtureFetch {
    fn fetch(&self, url: &str, format: WireFormat) -> Result<Value, FetchError> {
        match self.bodies.get(url) {
            Some(body) => decode_body(body, format),
            None => Err(FetchError::new("connection", None)),
        }
    }
}
