#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

use crate::common::{validate_bounded_text, validate_optional_text};
use crate::record::{ExternalRecord, ProtocolRecord, SearchCandidate};
use crate::{ContractViolation, SchemaVersion, Validate};

pub const DIALOG_CONTRACT_VERSION: SchemaVersion = SchemaVersion(1);

/// Hard cap on candidates offered in one disambiguation list.
pub const MAX_OFFERED_CANDIDATES: usize = 10;

/// Assistant-platform limit on quick-reply suggestions per turn.
pub const MAX_SUGGESTIONS: usize = 8;

/// Intents the assistant platform is configured to emit. The wire map must
/// cover every variant; an unmapped intent is a startup fault, not a
/// per-request branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntentId {
    GetPart,
    ProtocolSearch,
    ProtocolSelect,
    ProtocolSteps,
}

impl IntentId {
    pub const ALL: [IntentId; 4] = [
        IntentId::GetPart,
        IntentId::ProtocolSearch,
        IntentId::ProtocolSelect,
        IntentId::ProtocolSteps,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            IntentId::GetPart => "get_part",
            IntentId::ProtocolSearch => "protocol_search",
            IntentId::ProtocolSelect => "protocol_select",
            IntentId::ProtocolSteps => "protocol_steps",
        }
    }

    pub fn from_wire(wire: &str) -> Option<Self> {
        match wire {
            "get_part" => Some(IntentId::GetPart),
            "protocol_search" => Some(IntentId::ProtocolSearch),
            "protocol_select" => Some(IntentId::ProtocolSelect),
            "protocol_steps" => Some(IntentId::ProtocolSteps),
            _ => None,
        }
    }
}

/// One recognized turn as handed over by the assistant platform: the routed
/// intent plus its slot-filled arguments. Which argument is required depends
/// on the intent; handlers degrade a missing one into an Error outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnRequest {
    pub intent: IntentId,
    pub part_name: Option<String>,
    pub raw_query: Option<String>,
    pub selected_key: Option<String>,
}

impl TurnRequest {
    pub fn v1(
        intent: IntentId,
        part_name: Option<String>,
        raw_query: Option<String>,
        selected_key: Option<String>,
    ) -> Result<Self, ContractViolation> {
        let r = Self {
            intent,
            part_name,
            raw_query,
            selected_key,
        };
        r.validate()?;
        Ok(r)
    }
}

impl Validate for TurnRequest {
    fn validate(&self) -> Result<(), ContractViolation> {
        validate_optional_text("turn_request.part_name", &self.part_name, 256)?;
        validate_optional_text("turn_request.raw_query", &self.raw_query, 512)?;
        validate_optional_text("turn_request.selected_key", &self.selected_key, 64)?;
        Ok(())
    }
}

/// Failure classes that still end in a composed, user-readable turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorReason {
    Network,
    Parse,
    SelectionMismatch,
    MissingArgument,
    NoStoredProtocol,
}

impl ErrorReason {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorReason::Network => "network",
            ErrorReason::Parse => "parse",
            ErrorReason::SelectionMismatch => "selection_mismatch",
            ErrorReason::MissingArgument => "missing_argument",
            ErrorReason::NoStoredProtocol => "no_stored_protocol",
        }
    }
}

/// Result of one handler invocation, before composition.
#[derive(Debug, Clone, PartialEq)]
pub enum DialogOutcome {
    SingleResult(ExternalRecord),
    Disambiguation { candidates: Vec<SearchCandidate> },
    StepsGuide(ProtocolRecord),
    NoMatch { query: String },
    Error { reason: ErrorReason },
}

impl DialogOutcome {
    pub fn disambiguation(candidates: Vec<SearchCandidate>) -> Result<Self, ContractViolation> {
        let o = DialogOutcome::Disambiguation { candidates };
        o.validate()?;
        Ok(o)
    }
}

impl Validate for DialogOutcome {
    fn validate(&self) -> Result<(), ContractViolation> {
        match self {
            DialogOutcome::SingleResult(record) => record.validate(),
            DialogOutcome::Disambiguation { candidates } => {
                if candidates.len() < 2 {
                    return Err(ContractViolation::InvalidValue {
                        field: "dialog_outcome.candidates",
                        reason: "disambiguation needs at least 2 candidates",
                    });
                }
                if candidates.len() > MAX_OFFERED_CANDIDATES {
                    return Err(ContractViolation::InvalidValue {
                        field: "dialog_outcome.candidates",
                        reason: "must not offer more than 10 candidates",
                    });
                }
                for candidate in candidates {
                    candidate.validate()?;
                }
                Ok(())
            }
            DialogOutcome::StepsGuide(protocol) => {
                protocol.validate()?;
                if protocol.steps.is_none() {
                    return Err(ContractViolation::InvalidValue {
                        field: "dialog_outcome.steps_guide",
                        reason: "steps guide needs a protocol with steps",
                    });
                }
                Ok(())
            }
            DialogOutcome::NoMatch { query } => {
                validate_bounded_text("dialog_outcome.no_match_query", query, 512)
            }
            DialogOutcome::Error { .. } => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub title: String,
    pub body: String,
    pub link_label: String,
    pub link_url: String,
}

impl Card {
    pub fn v1(
        title: String,
        body: String,
        link_label: String,
        link_url: String,
    ) -> Result<Self, ContractViolation> {
        let c = Self {
            title,
            body,
            link_label,
            link_url,
        };
        c.validate()?;
        Ok(c)
    }
}

impl Validate for Card {
    fn validate(&self) -> Result<(), ContractViolation> {
        validate_bounded_text("card.title", &self.title, 512)?;
        validate_bounded_text("card.body", &self.body, 16_384)?;
        validate_bounded_text("card.link_label", &self.link_label, 128)?;
        validate_bounded_text("card.link_url", &self.link_url, 1_024)?;
        Ok(())
    }
}

/// One row of a selectable list. Synonyms are extra search keys the platform
/// re-matches spoken selections against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListItem {
    pub key: String,
    pub title: String,
    pub description: Option<String>,
    pub synonyms: Vec<String>,
}

impl ListItem {
    pub fn v1(
        key: String,
        title: String,
        description: Option<String>,
        synonyms: Vec<String>,
    ) -> Result<Self, ContractViolation> {
        let i = Self {
            key,
            title,
            description,
            synonyms,
        };
        i.validate()?;
        Ok(i)
    }
}

impl Validate for ListItem {
    fn validate(&self) -> Result<(), ContractViolation> {
        validate_bounded_text("list_item.key", &self.key, 64)?;
        validate_bounded_text("list_item.title", &self.title, 512)?;
        validate_optional_text("list_item.description", &self.description, 2_048)?;
        for synonym in &self.synonyms {
            validate_bounded_text("list_item.synonyms", synonym, 512)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionList {
    pub title: String,
    pub items: Vec<ListItem>,
}

impl Validate for SelectionList {
    fn validate(&self) -> Result<(), ContractViolation> {
        validate_bounded_text("selection_list.title", &self.title, 256)?;
        if self.items.len() < 2 {
            return Err(ContractViolation::InvalidValue {
                field: "selection_list.items",
                reason: "selectable list needs at least 2 items",
            });
        }
        if self.items.len() > MAX_OFFERED_CANDIDATES {
            return Err(ContractViolation::InvalidValue {
                field: "selection_list.items",
                reason: "must not list more than 10 items",
            });
        }
        for item in &self.items {
            item.validate()?;
        }
        Ok(())
    }
}

/// The outbound dialog turn handed back to the assistant platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogTurn {
    pub spoken_line: String,
    pub card: Option<Card>,
    pub suggestions: Vec<String>,
    pub list: Option<SelectionList>,
}

impl DialogTurn {
    pub fn v1(
        spoken_line: String,
        card: Option<Card>,
        suggestions: Vec<String>,
        list: Option<SelectionList>,
    ) -> Result<Self, ContractViolation> {
        let t = Self {
            spoken_line,
            card,
            suggestions,
            list,
        };
        t.validate()?;
        Ok(t)
    }
}

impl Validate for DialogTurn {
    fn validate(&self) -> Result<(), ContractViolation> {
        validate_bounded_text("dialog_turn.spoken_line", &self.spoken_line, 2_048)?;
        if let Some(card) = &self.card {
            card.validate()?;
        }
        if self.suggestions.len() > MAX_SUGGESTIONS {
            return Err(ContractViolation::InvalidValue {
                field: "dialog_turn.suggestions",
                reason: "exceeds platform suggestion limit",
            });
        }
        for suggestion in &self.suggestions {
            validate_bounded_text("dialog_turn.suggestions", suggestion, 64)?;
        }
        if let Some(list) = &self.list {
            list.validate()?;
        }
        Ok(())
    }
}
