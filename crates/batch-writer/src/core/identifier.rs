//! Identifier validation and quoting for synthesized SQL.
//!
//! Table and column names cannot be bound as statement parameters, so every
//! identifier that reaches SQL text goes through [`validate_identifier`] and a
//! dialect-specific quoting function. Values are always bound as parameters.

use crate::error::{BatchError, Result};

/// Maximum identifier length (conservative limit across databases).
/// - PostgreSQL: 63 bytes
/// - MySQL: 64 characters
/// - SQLite: unbounded
const MAX_IDENTIFIER_LENGTH: usize = 128;

/// Validate an identifier for security issues.
///
/// Rejects empty identifiers, identifiers containing null bytes and
/// identifiers exceeding the maximum length.
pub fn validate_identifier(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(BatchError::validation("identifier cannot be empty"));
    }

    if name.contains('\0') {
        return Err(BatchError::validation(format!(
            "SECURITY: identifier contains null byte (possible injection attempt): {:?}",
            name
        )));
    }

    if name.len() > MAX_IDENTIFIER_LENGTH {
        return Err(BatchError::validation(format!(
            "SECURITY: identifier exceeds maximum length of {} bytes (got {} bytes): {:?}",
            MAX_IDENTIFIER_LENGTH,
            name.len(),
            name
        )));
    }

    Ok(())
}

/// Wrap an identifier in double quotes, doubling embedded quotes.
///
/// Used by PostgreSQL and SQLite.
pub fn quote_double(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Wrap an identifier in backticks, doubling embedded backticks.
///
/// Used by MySQL/MariaDB.
pub fn quote_backtick(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Quote a possibly schema-qualified name (`schema.table`), part by part.
pub fn quote_qualified(name: &str, quote: impl Fn(&str) -> String) -> Result<String> {
    let parts = name
        .split('.')
        .map(|part| {
            validate_identifier(part)?;
            Ok(quote(part))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(parts.join("."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_identifier() {
        assert!(validate_identifier("users").is_ok());
        assert!(validate_identifier("").is_err());
        assert!(validate_identifier("bad\0name").is_err());
        assert!(validate_identifier(&"x".repeat(129)).is_err());
        assert!(validate_identifier(&"x".repeat(128)).is_ok());
    }

    #[test]
    fn test_quote_double() {
        assert_eq!(quote_double("users"), "\"users\"");
        assert_eq!(quote_double("table\"name"), "\"table\"\"name\"");
    }

    #[test]
    fn test_quote_backtick() {
        assert_eq!(quote_backtick("users"), "`users`");
        assert_eq!(quote_backtick("table`name"), "`table``name`");
    }

    #[test]
    fn test_quote_qualified() {
        assert_eq!(
            quote_qualified("public.users", quote_double).unwrap(),
            "\"public\".\"users\""
        );
        assert_eq!(quote_qualified("users", quote_backtick).unwrap(), "`users`");
        assert!(quote_qualified("public..users", quote_double).is_err());
    }
}
