#![forbid(unsafe_code)]

use synbio_contracts::dialog::{
    Card, DialogOutcome, DialogTurn, ErrorReason, ListItem, SelectionList,
};
use synbio_contracts::record::{ExternalRecord, PartRecord, ProtocolRecord, SearchCandidate};
use synbio_contracts::ContractViolation;

use crate::normalize::first_sentence;

/// Fixed fallback suggestion set for NoMatch and Error turns: re-search,
/// try the other data source, leave.
pub const FALLBACK_SUGGESTIONS: [&str; 3] = ["Search again", "Search the other source", "Exit"];

const DATABASE_ERROR_LINE: &str = "There was an error connecting to the database. \
     Please try again later. What would you like to do instead?";
const SELECTION_ERROR_LINE: &str =
    "Sorry, I couldn't open that protocol. What should I do instead?";
const MISSING_ARGUMENT_LINE: &str =
    "Sorry, I didn't catch what you were looking for. What should I do instead?";
const NO_STORED_PROTOCOL_LINE: &str =
    "Sorry, I don't have a protocol open to walk through. What should I do instead?";

/// Labeled card lines for a part, in display order. Absent fields contribute
/// nothing; adding a field means adding a row here, not new control flow.
const PART_CARD_FIELDS: &[(&str, fn(&PartRecord) -> Option<&str>)] = &[
    ("Type", |p| p.part_type.as_deref()),
    ("Desc", |p| p.short_desc.as_deref()),
    ("Results", |p| p.results.as_deref()),
    ("Release status", |p| p.release_status.as_deref()),
    ("Availability", |p| p.sample_status.as_deref()),
    ("Designed by", |p| p.author.as_deref()),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposerConfig {
    /// Prefix for the constructed part page URL used when the record
    /// supplies no canonical URL of its own.
    pub part_page_base: String,
}

impl ComposerConfig {
    pub fn live_v1() -> Self {
        Self {
            part_page_base: "https://parts.igem.org/Part:".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Composer {
    config: ComposerConfig,
}

impl Composer {
    pub fn new(config: ComposerConfig) -> Self {
        Self { config }
    }

    /// Render one handler outcome as the outbound dialog turn. Every arm
    /// produces a non-empty spoken line; `DialogTurn::v1` enforces it.
    pub fn compose(&self, outcome: &DialogOutcome) -> Result<DialogTurn, ContractViolation> {
        match outcome {
            DialogOutcome::SingleResult(ExternalRecord::Part(part)) => self.compose_part(part),
            DialogOutcome::SingleResult(ExternalRecord::Protocol(protocol)) => {
                compose_protocol(protocol)
            }
            DialogOutcome::StepsGuide(protocol) => compose_steps(protocol),
            DialogOutcome::Disambiguation { candidates } => compose_list(candidates),
            DialogOutcome::NoMatch { query } => compose_no_match(query),
            DialogOutcome::Error { reason } => compose_error(*reason),
        }
    }

    /// Last-resort turn when composition itself fails. Built from static
    /// text only.
    pub fn fallback_error_turn() -> DialogTurn {
        DialogTurn::v1(
            DATABASE_ERROR_LINE.to_string(),
            None,
            fallback_suggestions(),
            None,
        )
        .expect("static fallback turn must construct")
    }

    fn compose_part(&self, part: &PartRecord) -> Result<DialogTurn, ContractViolation> {
        let mut spoken = format!(
            "Part {}",
            part.short_name.as_deref().unwrap_or(&part.name)
        );
        if let Some(part_type) = &part.part_type {
            spoken.push_str(&format!(" is a {part_type}"));
        }
        if part.results.as_deref() == Some("Works") {
            spoken.push_str(" that works");
        }
        match &part.author {
            Some(author) => spoken.push_str(&format!(", designed by {author}.")),
            None => spoken.push('.'),
        }

        let mut title = format!("Part {}", part.name);
        if let Some(nickname) = &part.nickname {
            title.push_str(&format!(" ({nickname})"));
        }

        let mut lines: Vec<String> = PART_CARD_FIELDS
            .iter()
            .filter_map(|(label, field)| field(part).map(|value| format!("**{label}:** {value}")))
            .collect();
        lines.push("Data provided by the iGEM registry".to_string());

        let link_url = part
            .url
            .clone()
            .unwrap_or_else(|| format!("{}{}", self.config.part_page_base, part.name));
        let card = Card::v1(title, lines.join("\n"), "iGEM Registry".to_string(), link_url)?;

        DialogTurn::v1(
            spoken,
            Some(card),
            vec!["Search for another part".to_string(), "Exit".to_string()],
            None,
        )
    }
}

fn compose_protocol(protocol: &ProtocolRecord) -> Result<DialogTurn, ContractViolation> {
    let mut spoken = format!("Here's the {}. ", protocol.title);
    if let Some(description) = &protocol.description {
        let sentence = first_sentence(description);
        if !sentence.is_empty() {
            spoken.push_str(&format!("{sentence}. "));
        }
    }
    spoken.push_str("Do you want a step-by-step guide, to search ProtoCat again or exit?");

    let fields: [(&str, Option<String>); 3] = [
        ("Description", protocol.description.clone()),
        ("Materials", protocol.materials.clone()),
        (
            "# Steps",
            protocol.steps.as_ref().map(|steps| steps.len().to_string()),
        ),
    ];
    let mut lines: Vec<String> = fields
        .iter()
        .filter_map(|(label, value)| {
            value
                .as_deref()
                .map(|value| format!("**{label}:** {value}"))
        })
        .collect();
    lines.push("Data provided by ProtoCat".to_string());

    let card = Card::v1(
        protocol.title.clone(),
        lines.join("\n"),
        "View on ProtoCat".to_string(),
        protocol.url.clone(),
    )?;

    DialogTurn::v1(
        spoken,
        Some(card),
        vec![
            "Step-by-step guide".to_string(),
            "Search ProtoCat again".to_string(),
            "Exit".to_string(),
        ],
        None,
    )
}

fn compose_steps(protocol: &ProtocolRecord) -> Result<DialogTurn, ContractViolation> {
    let steps = protocol
        .steps
        .as_deref()
        .ok_or(ContractViolation::InvalidValue {
            field: "steps_guide.steps",
            reason: "steps guide needs a protocol with steps",
        })?;

    let noun = if steps.len() == 1 { "step" } else { "steps" };
    let spoken = format!(
        "The {} has {} {noun}. I've put the full list on your screen.",
        protocol.title,
        steps.len()
    );

    let mut lines: Vec<String> = steps
        .iter()
        .enumerate()
        .map(|(index, step)| format!("{}. {step}", index + 1))
        .collect();
    lines.push("Data provided by ProtoCat".to_string());

    let card = Card::v1(
        protocol.title.clone(),
        lines.join("\n"),
        "View on ProtoCat".to_string(),
        protocol.url.clone(),
    )?;

    DialogTurn::v1(
        spoken,
        Some(card),
        vec!["Search ProtoCat again".to_string(), "Exit".to_string()],
        None,
    )
}

fn compose_list(candidates: &[SearchCandidate]) -> Result<DialogTurn, ContractViolation> {
    let items = candidates
        .iter()
        .map(|candidate| {
            let description = candidate
                .short_desc
                .as_deref()
                .map(first_sentence)
                .filter(|sentence| !sentence.is_empty());
            ListItem::v1(
                candidate.id.to_string(),
                candidate.title.clone(),
                description,
                title_synonyms(&candidate.title),
            )
        })
        .collect::<Result<Vec<_>, _>>()?;

    DialogTurn::v1(
        "Which one of these looks right?".to_string(),
        None,
        Vec::new(),
        Some(SelectionList {
            title: "ProtoCat results".to_string(),
            items,
        }),
    )
}

fn compose_no_match(query: &str) -> Result<DialogTurn, ContractViolation> {
    DialogTurn::v1(
        format!(
            "I couldn't find any protocols about {query} on ProtoCat. \
             What would you like me to do instead?"
        ),
        None,
        fallback_suggestions(),
        None,
    )
}

fn compose_error(reason: ErrorReason) -> Result<DialogTurn, ContractViolation> {
    let spoken = match reason {
        ErrorReason::Network | ErrorReason::Parse => DATABASE_ERROR_LINE,
        ErrorReason::SelectionMismatch => SELECTION_ERROR_LINE,
        ErrorReason::MissingArgument => MISSING_ARGUMENT_LINE,
        ErrorReason::NoStoredProtocol => NO_STORED_PROTOCOL_LINE,
    };
    DialogTurn::v1(spoken.to_string(), None, fallback_suggestions(), None)
}

pub fn fallback_suggestions() -> Vec<String> {
    FALLBACK_SUGGESTIONS
        .iter()
        .map(|suggestion| suggestion.to_string())
        .collect()
}

/// Extra list-item search keys: the title's first word and first two words,
/// so a spoken partial selection still re-matches the chosen row.
fn title_synonyms(title: &str) -> Vec<String> {
    let words: Vec<&str> = title.split_whitespace().collect();
    let mut synonyms = Vec::new();
    if let Some(first) = words.first() {
        synonyms.push((*first).to_string());
    }
    if words.len() >= 2 {
        synonyms.push(words[..2].join(" "));
    }
    synonyms
}
