//! Keyed-store driver family (hash / set style stores).
//!
//! Every request addresses one key derived from the schema identifier and
//! the request's key column (column 0):
//!
//! - `session` + `1` → `session:1`
//! - `user:{}:tags` + `7` → `user:7:tags`

mod hash;
mod set;

pub use hash::KeyedHashDriver;
pub use set::KeyedSetDriver;

use crate::core::value::Value;
use crate::error::{BatchError, Result};

/// Placeholder replaced by the key value inside an identifier.
const KEY_PLACEHOLDER: &str = "{}";

/// Build the store key for one request.
///
/// A `{}` placeholder in `identifier` is replaced by the rendered key value;
/// otherwise the value is appended after a `:` separator.
pub fn format_key(identifier: &str, key: &Value) -> Result<String> {
    if key.is_null() {
        return Err(BatchError::synthesis(format!(
            "key column for '{}' is NULL",
            identifier
        )));
    }

    let rendered = key.render();
    if identifier.contains(KEY_PLACEHOLDER) {
        Ok(identifier.replace(KEY_PLACEHOLDER, &rendered))
    } else {
        Ok(format!("{}:{}", identifier, rendered))
    }
}
