#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

use crate::record::ProtocolRecord;
use crate::{ContractViolation, Validate};

/// Cross-turn continuity for one list → selection exchange. The assistant
/// runtime owns and persists this between turns; the core receives the prior
/// turn's value by reference and returns the replacement to store. Nothing
/// here outlives the dialog session, and nothing is shared across sessions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionContext {
    /// Candidate ids offered by the most recent disambiguation list. A
    /// selection turn is only honored for one of these.
    pub offered_ids: Vec<u64>,
    /// Full protocol shown last turn, kept so a step-by-step request can
    /// re-display it without another fetch.
    pub stored_protocol: Option<ProtocolRecord>,
}

impl SessionContext {
    pub fn offered(ids: Vec<u64>) -> Self {
        Self {
            offered_ids: ids,
            stored_protocol: None,
        }
    }

    pub fn showing(protocol: ProtocolRecord) -> Self {
        Self {
            offered_ids: Vec::new(),
            stored_protocol: Some(protocol),
        }
    }
}

impl Validate for SessionContext {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.offered_ids.len() > crate::dialog::MAX_OFFERED_CANDIDATES {
            return Err(ContractViolation::InvalidValue {
                field: "session_context.offered_ids",
                reason: "must not exceed the offered-candidate cap",
            });
        }
        if let Some(protocol) = &self.stored_protocol {
            protocol.validate()?;
        }
        Ok(())
    }
}
