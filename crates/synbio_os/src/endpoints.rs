#![forbid(unsafe_code)]

use std::env;

use url::Url;

pub const DEFAULT_REGISTRY_BASE: &str = "https://parts.igem.org/cgi/xml/part.cgi";
pub const DEFAULT_PROTOCOL_BASE: &str = "https://protocat.org/api/protocol";
pub const DEFAULT_PROTOCOL_PAGE_BASE: &str = "https://protocat.org/protocol/";
pub const DEFAULT_PART_PAGE_BASE: &str = "https://parts.igem.org/Part:";

/// Outbound URL construction for the two external data sources. Bases are
/// validated once at construction; builders never fail afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    registry_base: Url,
    protocol_base: String,
    protocol_page_base: String,
    part_page_base: String,
}

impl Endpoints {
    pub fn new(
        registry_base: &str,
        protocol_base: &str,
        protocol_page_base: &str,
        part_page_base: &str,
    ) -> Result<Self, String> {
        let registry_base = Url::parse(registry_base)
            .map_err(|_| format!("invalid registry base url: {registry_base}"))?;
        Url::parse(protocol_base)
            .map_err(|_| format!("invalid protocol base url: {protocol_base}"))?;
        Url::parse(protocol_page_base)
            .map_err(|_| format!("invalid protocol page base url: {protocol_page_base}"))?;
        Url::parse(part_page_base)
            .map_err(|_| format!("invalid part page base url: {part_page_base}"))?;
        Ok(Self {
            registry_base,
            protocol_base: protocol_base.trim_end_matches('/').to_string(),
            protocol_page_base: with_trailing_slash(protocol_page_base),
            part_page_base: part_page_base.to_string(),
        })
    }

    pub fn from_env() -> Result<Self, String> {
        Self::new(
            &env_or("SYNBIO_REGISTRY_BASE", DEFAULT_REGISTRY_BASE),
            &env_or("SYNBIO_PROTOCOL_BASE", DEFAULT_PROTOCOL_BASE),
            &env_or("SYNBIO_PROTOCOL_PAGE_BASE", DEFAULT_PROTOCOL_PAGE_BASE),
            &env_or("SYNBIO_PART_PAGE_BASE", DEFAULT_PART_PAGE_BASE),
        )
    }

    /// `GET {registryBase}?part={name}`, one part per request.
    pub fn part_url(&self, part_name: &str) -> String {
        let mut url = self.registry_base.clone();
        url.query_pairs_mut().append_pair("part", part_name);
        url.to_string()
    }

    /// `GET {protocolBase}/?format=json`, the full summary listing.
    pub fn protocol_listing_url(&self) -> String {
        format!("{}/?format=json", self.protocol_base)
    }

    /// `GET {protocolBase}/{id}/?format=json`, one protocol by id.
    pub fn protocol_url(&self, id: u64) -> String {
        format!("{}/{id}/?format=json", self.protocol_base)
    }

    /// Human-facing protocol page prefix, with trailing slash.
    pub fn protocol_page_base(&self) -> &str {
        &self.protocol_page_base
    }

    /// Human-facing part page prefix; the part name is appended verbatim.
    pub fn part_page_base(&self) -> &str {
        &self.part_page_base
    }
}

fn env_or(key: &str, default: &str) -> String {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => value,
        _ => default.to_string(),
    }
}

fn with_trailing_slash(base: &str) -> String {
    let trimmed = base.trim_end_matches('/');
    format!("{trimmed}/")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoints() -> Endpoints {
        Endpoints::new(
            DEFAULT_REGISTRY_BASE,
            DEFAULT_PROTOCOL_BASE,
            DEFAULT_PROTOCOL_PAGE_BASE,
            DEFAULT_PART_PAGE_BASE,
        )
        .unwrap()
    }

    #[test]
    fn part_url_percent_encodes_the_name() {
        let url = endpoints().part_url("BBa K123000");
        assert_eq!(
            url,
            "https://parts.igem.org/cgi/xml/part.cgi?part=BBa+K123000"
        );
    }

    #[test]
    fn protocol_urls_follow_the_api_shape() {
        let e = endpoints();
        assert_eq!(
            e.protocol_listing_url(),
            "https://protocat.org/api/protocol/?format=json"
        );
        assert_eq!(
            e.protocol_url(42),
            "https://protocat.org/api/protocol/42/?format=json"
        );
        assert_eq!(e.protocol_page_base(), "https://protocat.org/protocol/");
    }

    #[test]
    fn invalid_base_url_is_rejected_at_construction() {
        assert!(Endpoints::new("not a url", DEFAULT_PROTOCOL_BASE, "x:/", "y:/").is_err());
    }
}
