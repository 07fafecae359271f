use serde_json::Value;
use thiserror::Error;

/// Meeple API errors.
#[derive(Debug, Error)]
pub enum MeepleError {
    /// The base URL provided is not a valid absolute URL.
    #[error("Invalid base URL. Must be an absolute http(s) URL.")]
    InvalidBaseUrl,

    /// Failed to send a request to the Meeple API.
    /// No response reached the client at all.
    #[error("Failed to send a request to the Meeple API.")]
    RequestFailed,

    /// Failed to decode a Meeple API response.
    /// The server answered 2xx but the body did not match the expected shape.
    #[error("Failed to decode Meeple API response.")]
    FailedToDecode,

    /// The Meeple API returned a 401: Unauthorized status code.
    /// The bearer token is missing, expired, or revoked.
    #[error("Accès refusé. Connecte-toi.")]
    Unauthorized,

    /// The Meeple API rejected the request with a non-2xx status code.
    /// `message` carries the normalized, user-facing reason.
    #[error("{message}")]
    Rejected { status: u16, message: String },

    /// Failed to read or write the persisted session token.
    #[error("Failed to access the session token store.")]
    StorageFailed,
}

/// Maps a server reason code to its fixed user-facing string.
///
/// Codes outside this table render as the generic message; free-form server
/// messages pass through verbatim (see `normalize_error`).
pub fn user_message(code: &str) -> Option<&'static str> {
    Some(match code {
        "INVALID_BODY" => "Données invalides.",
        "USER_NOT_FOUND" => "Utilisateur introuvable.",
        "WRONG_PASSWORD" => "Mot de passe incorrect.",
        "USERNAME_TAKEN" | "USER_EXISTS" => "Ce nom d’utilisateur est déjà utilisé.",
        "UNAUTHORIZED" => "Accès refusé. Connecte-toi.",
        "SERVER_ERROR" => "Erreur serveur.",
        _ => return None,
    })
}

/// Extracts the reason from an error payload and normalizes it.
///
/// Checks `error`, then `code`, then `message`. Known codes map through
/// [`user_message`]; unknown ALL_CAPS codes collapse to the generic message;
/// anything else passes through verbatim. Falls back to `HTTP <status>` when
/// the payload carries no reason at all.
pub(crate) fn normalize_error(payload: &Value, status: u16) -> String {
    let raw = ["error", "code", "message"]
        .iter()
        .find_map(|key| payload.get(*key).and_then(|v| v.as_str()));

    match raw {
        Some(reason) => {
            if let Some(message) = user_message(reason) {
                return message.to_string();
            }
            let looks_like_code = !reason.is_empty()
                && reason
                    .chars()
                    .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_');
            if looks_like_code {
                return "Une erreur est survenue.".to_string();
            }
            reason.to_string()
        }
        None => format!("HTTP {status}"),
    }
}
