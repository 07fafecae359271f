//! Invite-code encoding for QR exchange.
//!
//! Invite tokens are opaque server-issued strings. For display as a scannable
//! code they are wrapped in a fixed `INVITE:` marker; decoding a scanned
//! payload strips that marker, falls back to a `token=` query parameter for
//! URL payloads, and otherwise treats the raw payload as the token itself.

/// Marker prefixed to invite tokens when encoded into a scannable code.
pub const INVITE_PREFIX: &str = "INVITE:";

/// Wraps an invite token for QR display.
pub fn encode_invite(token: &str) -> String {
    format!("{INVITE_PREFIX}{token}")
}

/// Extracts the invite token from a scanned payload.
///
/// Accepts `INVITE:<token>`, any URL carrying a `token=<token>` query
/// parameter, or a bare token. Returns `None` only for payloads that carry
/// nothing at all.
pub fn decode_invite(payload: &str) -> Option<String> {
    if payload.is_empty() {
        return None;
    }

    if let Some(token) = payload.strip_prefix(INVITE_PREFIX) {
        if token.is_empty() {
            return None;
        }
        return Some(token.to_string());
    }

    for marker in ["?token=", "&token="] {
        if let Some(at) = payload.find(marker) {
            let value = payload[at + marker.len()..]
                .split('&')
                .next()
                .unwrap_or_default();
            if !value.is_empty() {
                return Some(value.to_string());
            }
        }
    }

    Some(payload.to_string())
}
