//! Typed access to the preferences pagebrain persists.

use crate::agent::ApiKey;
use crate::prompt::{LengthPreference, UnknownLength};
use crate::storage::{PreferenceStore, StorageError};
use thiserror::Error;

pub const API_KEY: &str = "apiKey";
pub const SUMMARY_LENGTH: &str = "summaryLength";

#[derive(Error, Debug)]
pub enum PreferenceError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("stored summaryLength is invalid: {0}")]
    InvalidLength(#[from] UnknownLength),
    #[error("Please enter a valid API key.")]
    EmptyApiKey,
}

/// The stored summary length; `Medium` when none was ever chosen
pub fn summary_length<S: PreferenceStore + ?Sized>(
    store: &S,
) -> Result<LengthPreference, PreferenceError> {
    match store.get_preference(SUMMARY_LENGTH)? {
        Some(value) => Ok(value.parse()?),
        None => Ok(LengthPreference::default()),
    }
}

pub fn set_summary_length<S: PreferenceStore + ?Sized>(
    store: &S,
    length: LengthPreference,
) -> Result<(), PreferenceError> {
    store.set_preference(SUMMARY_LENGTH, length.as_str())?;
    Ok(())
}

pub fn api_key<S: PreferenceStore + ?Sized>(store: &S) -> Result<Option<ApiKey>, PreferenceError> {
    Ok(store.get_preference(API_KEY)?.and_then(ApiKey::new))
}

/// Trim and persist a key, refusing blank input
pub fn save_api_key<S: PreferenceStore + ?Sized>(
    store: &S,
    key: &str,
) -> Result<ApiKey, PreferenceError> {
    let key = ApiKey::new(key).ok_or(PreferenceError::EmptyApiKey)?;
    store.set_preference(API_KEY, key.expose())?;
    Ok(key)
}

pub fn remove_api_key<S: PreferenceStore + ?Sized>(store: &S) -> Result<bool, PreferenceError> {
    Ok(store.remove_preference(API_KEY)?)
}
