//! Embeddable in-process API over a process-wide default cache.
//!
//! The default cache is an explicit singleton: [`init`] installs it,
//! [`teardown`] drops it, and the item functions lazily fall back to an
//! unbounded instance when nothing was installed. Structured values are
//! JSON-serialized on entry and deserialized on exit; the `*_bytes`
//! functions round-trip raw byte strings untouched.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::cache::{Cache, CacheError, CacheLimit};

static DEFAULT_CACHE: Mutex<Option<Arc<Cache>>> = Mutex::new(None);

/// Installs a fresh default cache with the given bound, replacing any
/// existing one, and returns a handle to it.
pub fn init(limit: CacheLimit) -> Arc<Cache> {
    let cache = Arc::new(Cache::new(limit));
    *DEFAULT_CACHE.lock() = Some(Arc::clone(&cache));
    cache
}

/// Drops the default cache. Handles returned earlier stay alive.
pub fn teardown() {
    *DEFAULT_CACHE.lock() = None;
}

/// Returns the default cache, installing an unbounded one on first use.
pub fn handle() -> Arc<Cache> {
    let mut slot = DEFAULT_CACHE.lock();
    if let Some(cache) = slot.as_ref() {
        return Arc::clone(cache);
    }
    let cache = Arc::new(Cache::new(CacheLimit::Unbounded));
    *slot = Some(Arc::clone(&cache));
    cache
}

/// Stores a structured value under `key` as its JSON serialization.
///
/// # Errors
///
/// Returns the serialization error when `value` cannot be encoded.
pub fn set_item<T: Serialize>(
    key: &str,
    value: &T,
    expiration_secs: i64,
) -> Result<(), serde_json::Error> {
    let cache = handle();
    cache.set(key, serde_json::to_vec(value)?, expiration_secs, 0);
    cache.purge();
    Ok(())
}

/// Retrieves the value stored under `key`, decoded via [`decode_item`].
///
/// Returns `Ok(None)` when the key is absent or expired. Values written by
/// [`set_item`] decode back to their structured form; raw byte strings
/// written by [`set_bytes`] (or over the wire) come back as their text.
///
/// # Errors
///
/// Returns the decode error when the payload fits neither `T` nor raw text.
pub fn get_item<T: DeserializeOwned>(key: &str) -> Result<Option<T>, serde_json::Error> {
    match handle().get(key) {
        None => Ok(None),
        Some(bytes) => decode_item(&bytes).map(Some),
    }
}

/// Returns `true` when a payload is shaped like a JSON object.
fn looks_like_json(bytes: &[u8]) -> bool {
    bytes.first() == Some(&b'{') && bytes.last() == Some(&b'}')
}

/// Surfaces a payload as its raw text, decoded into `T` (succeeds for
/// string-shaped targets such as `String` or `serde_json::Value`).
fn raw_text<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, serde_json::Error> {
    serde_json::from_value(serde_json::Value::String(
        String::from_utf8_lossy(bytes).into_owned(),
    ))
}

/// Decodes a fetched payload opportunistically.
///
/// A payload that looks like a JSON object (starts with `{` and ends with
/// `}`) is parsed as JSON; when that parse fails, the raw text stands as
/// the value instead of an error. Any other payload is surfaced as raw
/// text first, so byte strings written with raw `set`/`append` read back
/// verbatim, while scalar JSON written by [`set_item`] (numbers, booleans,
/// arrays) still decodes when the target type is not a string.
///
/// # Errors
///
/// Returns the decode error only when the payload can represent neither a
/// `T` nor raw text (e.g. a non-JSON payload read into a struct target).
pub fn decode_item<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, serde_json::Error> {
    if looks_like_json(bytes) {
        match serde_json::from_slice(bytes) {
            Ok(value) => Ok(value),
            Err(_) => raw_text(bytes),
        }
    } else {
        match raw_text(bytes) {
            Ok(value) => Ok(value),
            Err(_) => serde_json::from_slice(bytes),
        }
    }
}

/// Stores a structured value only if `key` is absent. Returns whether stored.
///
/// # Errors
///
/// Returns the serialization error when `value` cannot be encoded.
pub fn add_item<T: Serialize>(
    key: &str,
    value: &T,
    expiration_secs: i64,
) -> Result<bool, serde_json::Error> {
    let cache = handle();
    let stored = cache.add(key, serde_json::to_vec(value)?, expiration_secs, 0);
    cache.purge();
    Ok(stored)
}

/// Stores a structured value only if `key` is present. Returns whether
/// stored.
///
/// # Errors
///
/// Returns the serialization error when `value` cannot be encoded.
pub fn replace_item<T: Serialize>(
    key: &str,
    value: &T,
    expiration_secs: i64,
) -> Result<bool, serde_json::Error> {
    let cache = handle();
    let stored = cache.replace(key, serde_json::to_vec(value)?, expiration_secs, 0);
    cache.purge();
    Ok(stored)
}

/// Stores a raw byte string, returned byte-identical by [`get_bytes`].
pub fn set_bytes(key: &str, value: Vec<u8>, expiration_secs: i64) {
    let cache = handle();
    cache.set(key, value, expiration_secs, 0);
    cache.purge();
}

/// Retrieves the raw byte string stored under `key`.
#[must_use]
pub fn get_bytes(key: &str) -> Option<Vec<u8>> {
    handle().get(key)
}

/// Removes `key`. Returns `true` when a live record was deleted.
pub fn delete_item(key: &str) -> bool {
    let cache = handle();
    let deleted = cache.delete(key);
    cache.purge();
    deleted
}

/// Replaces the expiration of `key`. Returns `false` when absent.
pub fn touch_item(key: &str, expiration_secs: i64) -> bool {
    let cache = handle();
    let touched = cache.touch(key, expiration_secs);
    cache.purge();
    touched
}

/// Increments the numeric value at `key`, clamping at zero.
///
/// # Errors
///
/// Returns [`CacheError::NonNumeric`] when the stored value is not a
/// decimal integer.
pub fn incr_item(key: &str, delta: i64) -> Result<Option<i64>, CacheError> {
    handle().incr(key, delta)
}

/// Decrements the numeric value at `key`, clamping at zero.
///
/// # Errors
///
/// Returns [`CacheError::NonNumeric`] when the stored value is not a
/// decimal integer.
pub fn decr_item(key: &str, delta: i64) -> Result<Option<i64>, CacheError> {
    handle().decr(key, delta)
}

/// Empties the default cache.
pub fn flush() {
    handle().flush();
}
