//! Request and response bodies, and their validation rules.

use crate::api::error::ApiError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Optional `+`, a non-zero first digit, then 1 to 14 more digits.
///
/// A loose approximation of E.164: it does not check country codes. One
/// trailing newline is tolerated.
pub const PHONE_PATTERN: &str = r"^\+?[1-9]\d{1,14}\n?$";

/// Minimum address length, in characters.
pub const MIN_ADDRESS_LEN: usize = 5;

static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(PHONE_PATTERN).expect("phone pattern compiles"));

/// Checks `phone` against [`PHONE_PATTERN`].
pub fn validate_phone(phone: &str) -> Result<(), ApiError> {
    if PHONE_RE.is_match(phone) {
        Ok(())
    } else {
        Err(ApiError::InvalidInput(
            "phone: The phone number must be in international format (e.g. +79990000000)"
                .to_string(),
        ))
    }
}

/// Checks that `address` has at least [`MIN_ADDRESS_LEN`] characters.
pub fn validate_address(address: &str) -> Result<(), ApiError> {
    if address.chars().count() >= MIN_ADDRESS_LEN {
        Ok(())
    } else {
        Err(ApiError::InvalidInput(format!(
            "address: String should have at least {} characters",
            MIN_ADDRESS_LEN
        )))
    }
}

/// A stored record, as returned by every successful read or write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhoneRecord {
    pub phone: String,
    pub address: String,
}

/// `POST /phones` body.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateRecord {
    pub phone: String,
    pub address: String,
}

impl CreateRecord {
    pub fn validate(&self) -> Result<(), ApiError> {
        validate_phone(&self.phone)?;
        validate_address(&self.address)
    }
}

/// `PUT /phones/{phone}` body.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateRecord {
    pub address: String,
}

impl UpdateRecord {
    pub fn validate(&self) -> Result<(), ApiError> {
        validate_address(&self.address)
    }
}
