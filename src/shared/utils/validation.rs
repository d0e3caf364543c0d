use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

use crate::shared::errors::{AppError, AppResult};

/// Longest id accepted when ids are treated as opaque strings.
pub const MAX_ENTITY_ID_LEN: usize = 128;

static BASE58_ADDRESS: OnceLock<Regex> = OnceLock::new();

fn base58_address() -> AppResult<&'static Regex> {
    if let Some(re) = BASE58_ADDRESS.get() {
        return Ok(re);
    }
    let re = Regex::new(r"^[1-9A-HJ-NP-Za-km-z]{32,44}$")
        .map_err(|e| AppError::InternalError(format!("Invalid base58 pattern: {}", e)))?;
    Ok(BASE58_ADDRESS.get_or_init(|| re))
}

pub struct Validator;

impl Validator {
    pub fn validate_entity_id(id: &str, require_base58: bool) -> AppResult<()> {
        if id.is_empty() {
            return Err(AppError::config("Entity id cannot be empty"));
        }
        if id.len() > MAX_ENTITY_ID_LEN {
            return Err(AppError::config(format!(
                "Entity id too long (max {} characters)",
                MAX_ENTITY_ID_LEN
            )));
        }
        if id.chars().any(char::is_whitespace) {
            return Err(AppError::config(format!(
                "Entity id '{}' contains whitespace",
                id
            )));
        }
        if require_base58 && !base58_address()?.is_match(id) {
            return Err(AppError::config(format!(
                "Entity id '{}' is not a base58 address",
                id
            )));
        }
        Ok(())
    }

    /// Ids must be present, individually well-formed and unique.
    pub fn validate_entity_ids<S: AsRef<str>>(ids: &[S], require_base58: bool) -> AppResult<()> {
        if ids.is_empty() {
            return Err(AppError::config("At least one entity id is required"));
        }

        let mut seen = HashSet::with_capacity(ids.len());
        for id in ids {
            let id = id.as_ref();
            Self::validate_entity_id(id, require_base58)?;
            if !seen.insert(id) {
                return Err(AppError::config(format!("Duplicate entity id '{}'", id)));
            }
        }
        Ok(())
    }

    pub fn validate_concurrency(concurrency: usize) -> AppResult<()> {
        if concurrency == 0 {
            return Err(AppError::config("Concurrency must be a positive integer"));
        }
        Ok(())
    }

    pub fn validate_min_amount(min_amount: f64) -> AppResult<()> {
        if !min_amount.is_finite() || min_amount < 0.0 {
            return Err(AppError::config("Minimum amount must be a non-negative number"));
        }
        Ok(())
    }
}
