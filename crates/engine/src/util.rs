//! Input normalization and id parsing shared by the ops.

use unicode_normalization::UnicodeNormalization;
use uuid::Uuid;

use crate::{EngineError, ResultEngine, balance_history::SHOP_ACCOUNT};

/// Parse a UUID from storage and return a labeled error on failure.
///
/// Ids are written by the engine itself, so a parse failure means corrupt
/// data rather than bad input.
pub(crate) fn parse_uuid(value: &str, label: &str) -> ResultEngine<Uuid> {
    Uuid::parse_str(value).map_err(|_| EngineError::Internal(format!("invalid {label} id")))
}

/// Canonical form of a username: trimmed and NFC-normalized, so visually
/// identical names map to the same row.
pub(crate) fn normalize_username(value: &str) -> ResultEngine<String> {
    let normalized: String = value.trim().nfc().collect();
    if normalized.is_empty() {
        return Err(EngineError::InvalidCredentials(
            "username must not be empty".to_string(),
        ));
    }
    Ok(normalized)
}

/// Like [`normalize_username`], but also refuses the reserved shop sink.
pub(crate) fn normalize_new_username(value: &str) -> ResultEngine<String> {
    let normalized = normalize_username(value)?;
    if normalized.eq_ignore_ascii_case(SHOP_ACCOUNT) {
        return Err(EngineError::InvalidUsername(format!(
            "\"{normalized}\" is reserved"
        )));
    }
    Ok(normalized)
}

/// Catalog names are matched exactly after trimming.
pub(crate) fn normalize_item_name(value: &str) -> ResultEngine<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EngineError::ItemNotFound(String::new()));
    }
    Ok(trimmed.to_string())
}
