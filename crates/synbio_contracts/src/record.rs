#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

use crate::common::{validate_bounded_text, validate_optional_text};
use crate::{ContractViolation, SchemaVersion, Validate};

pub const RECORD_CONTRACT_VERSION: SchemaVersion = SchemaVersion(1);

const MAX_TEXT_LEN: usize = 8_192;
const MAX_STEPS: usize = 256;

/// Normalized view of one registry part. Every optional field was either
/// present with non-empty cleaned text in the source XML, or absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartRecord {
    pub name: String,
    pub nickname: Option<String>,
    pub short_name: Option<String>,
    pub part_type: Option<String>,
    pub short_desc: Option<String>,
    pub author: Option<String>,
    pub results: Option<String>,
    pub release_status: Option<String>,
    pub sample_status: Option<String>,
    pub url: Option<String>,
}

impl Validate for PartRecord {
    fn validate(&self) -> Result<(), ContractViolation> {
        validate_bounded_text("part_record.name", &self.name, 256)?;
        validate_optional_text("part_record.nickname", &self.nickname, 256)?;
        validate_optional_text("part_record.short_name", &self.short_name, 256)?;
        validate_optional_text("part_record.part_type", &self.part_type, 256)?;
        validate_optional_text("part_record.short_desc", &self.short_desc, MAX_TEXT_LEN)?;
        validate_optional_text("part_record.author", &self.author, 512)?;
        validate_optional_text("part_record.results", &self.results, 128)?;
        validate_optional_text("part_record.release_status", &self.release_status, 128)?;
        validate_optional_text("part_record.sample_status", &self.sample_status, 128)?;
        validate_optional_text("part_record.url", &self.url, 1_024)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolRecord {
    pub id: u64,
    pub title: String,
    pub description: Option<String>,
    pub materials: Option<String>,
    pub steps: Option<Vec<String>>,
    pub url: String,
}

impl ProtocolRecord {
    pub fn v1(
        id: u64,
        title: String,
        description: Option<String>,
        materials: Option<String>,
        steps: Option<Vec<String>>,
        url: String,
    ) -> Result<Self, ContractViolation> {
        let r = Self {
            id,
            title,
            description,
            materials,
            steps,
            url,
        };
        r.validate()?;
        Ok(r)
    }
}

impl Validate for ProtocolRecord {
    fn validate(&self) -> Result<(), ContractViolation> {
        validate_bounded_text("protocol_record.title", &self.title, 512)?;
        validate_optional_text("protocol_record.description", &self.description, MAX_TEXT_LEN)?;
        validate_optional_text("protocol_record.materials", &self.materials, MAX_TEXT_LEN)?;
        if let Some(steps) = &self.steps {
            if steps.is_empty() {
                return Err(ContractViolation::InvalidValue {
                    field: "protocol_record.steps",
                    reason: "present steps must not be empty",
                });
            }
            if steps.len() > MAX_STEPS {
                return Err(ContractViolation::InvalidValue {
                    field: "protocol_record.steps",
                    reason: "exceeds max step count",
                });
            }
            for step in steps {
                validate_bounded_text("protocol_record.steps", step, MAX_TEXT_LEN)?;
            }
        }
        validate_bounded_text("protocol_record.url", &self.url, 1_024)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExternalRecord {
    Part(PartRecord),
    Protocol(ProtocolRecord),
}

impl Validate for ExternalRecord {
    fn validate(&self) -> Result<(), ContractViolation> {
        match self {
            ExternalRecord::Part(p) => p.validate(),
            ExternalRecord::Protocol(p) => p.validate(),
        }
    }
}

/// Per-turn projection of a protocol summary used for ranking. Built for one
/// search turn and discarded once disambiguation resolves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchCandidate {
    pub id: u64,
    pub title: String,
    pub short_desc: Option<String>,
}

impl SearchCandidate {
    pub fn v1(
        id: u64,
        title: String,
        short_desc: Option<String>,
    ) -> Result<Self, ContractViolation> {
        let c = Self {
            id,
            title,
            short_desc,
        };
        c.validate()?;
        Ok(c)
    }
}

impl Validate for SearchCandidate {
    fn validate(&self) -> Result<(), ContractViolation> {
        validate_bounded_text("search_candidate.title", &self.title, 512)?;
        validate_optional_text("search_candidate.short_desc", &self.short_desc, MAX_TEXT_LEN)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn part() -> PartRecord {
        PartRecord {
            name: "BBa_K123000".to_string(),
            nickname: None,
            short_name: Some("K123000".to_string()),
            part_type: Some("Coding".to_string()),
            short_desc: None,
            author: Some("A Student".to_string()),
            results: Some("Works".to_string()),
            release_status: None,
            sample_status: None,
            url: None,
        }
    }

    #[test]
    fn part_record_accepts_absent_optionals() {
        assert!(part().validate().is_ok());
    }

    #[test]
    fn part_record_rejects_present_but_empty_field() {
        let mut p = part();
        p.part_type = Some("   ".to_string());
        assert!(p.validate().is_err());
    }

    #[test]
    fn protocol_record_rejects_empty_step_list() {
        let r = ProtocolRecord::v1(
            7,
            "Gibson Assembly".to_string(),
            None,
            None,
            Some(vec![]),
            "https://protocat.org/protocol/7/".to_string(),
        );
        assert!(r.is_err());
    }

    #[test]
    fn search_candidate_rejects_empty_title() {
        assert!(SearchCandidate::v1(1, "  ".to_string(), None).is_err());
    }
}
