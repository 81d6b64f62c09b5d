#![forbid(unsafe_code)]

use synbio_contracts::dialog::IntentId;

/// Intent names the assistant platform is configured to emit. Must stay in
/// lockstep with the platform-side agent configuration.
pub const PLATFORM_INTENTS: [&str; 4] = [
    "get_part",
    "protocol_search",
    "protocol_select",
    "protocol_steps",
];

/// Map an incoming wire intent to its handler id. `None` means the platform
/// sent something the startup check should have caught.
pub fn route(wire_intent: &str) -> Option<IntentId> {
    IntentId::from_wire(wire_intent)
}

/// Startup-time validation of the intent map: every platform-configured
/// intent must have a handler, and every handler id must round-trip through
/// its wire name. An unroutable intent is a deployment fault, not a
/// per-request condition, so the adapter refuses to start on failure.
pub fn startup_intent_map_check() -> Result<(), String> {
    for wire in PLATFORM_INTENTS {
        if route(wire).is_none() {
            return Err(format!("platform intent '{wire}' has no handler"));
        }
    }
    for intent in IntentId::ALL {
        match IntentId::from_wire(intent.as_str()) {
            Some(mapped) if mapped == intent => {}
            _ => {
                return Err(format!(
                    "intent map does not round-trip for '{}'",
                    intent.as_str()
                ))
            }
        }
    }
    Ok(())
}
