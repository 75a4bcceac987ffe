//! SQL statement validator.
//!
//! Guards the ad-hoc query endpoint and quotes identifiers that have to be
//! spliced into statements (table and column names cannot be bound).

use crate::errors::{AppError, AppResult};

/// Validates SQL statements and identifiers.
pub struct SqlValidator;

impl SqlValidator {
    /// Checks if the SQL is a SELECT query (leading whitespace ignored, case-insensitive).
    pub fn is_select(sql: &str) -> bool {
        sql.trim_start()
            .get(..6)
            .is_some_and(|head| head.eq_ignore_ascii_case("select"))
    }

    /// Rejects anything but a SELECT statement.
    ///
    /// # Errors
    /// Returns `AppError::Validation` for missing or non-SELECT statements.
    pub fn require_select(sql: Option<&str>) -> AppResult<&str> {
        match sql {
            Some(sql) if Self::is_select(sql) => Ok(sql),
            _ => Err(AppError::Validation(
                "Only SELECT queries are allowed".to_string(),
            )),
        }
    }

    /// Quotes a MySQL identifier with backticks, doubling embedded backticks.
    ///
    /// # Errors
    /// Returns `AppError::Validation` for empty identifiers or ones containing NUL.
    pub fn quote_identifier(ident: &str) -> AppResult<String> {
        if ident.is_empty() || ident.contains('\0') {
            return Err(AppError::Validation(format!(
                "invalid identifier: {:?}",
                ident
            )));
        }
        Ok(format!("`{}`", ident.replace('`', "``")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_select() {
        assert!(SqlValidator::is_select("SELECT * FROM users"));
        assert!(SqlValidator::is_select("   select id from t"));
        assert!(SqlValidator::is_select("\n\tSeLeCt 1"));
        assert!(!SqlValidator::is_select("INSERT INTO users VALUES (1)"));
        assert!(!SqlValidator::is_select("sel"));
        assert!(!SqlValidator::is_select(""));
        assert!(!SqlValidator::is_select("-- comment\nSELECT 1"));
    }

    #[test]
    fn test_multibyte_prefix_does_not_panic() {
        assert!(!SqlValidator::is_select("sélect 1"));
        assert!(!SqlValidator::is_select("查询所有用户"));
    }

    #[test]
    fn test_require_select() {
        assert!(SqlValidator::require_select(Some("select 1")).is_ok());
        assert!(SqlValidator::require_select(Some("DELETE FROM users")).is_err());
        assert!(SqlValidator::require_select(None).is_err());
    }

    #[test]
    fn test_quote_identifier() {
        assert_eq!(SqlValidator::quote_identifier("orders").unwrap(), "`orders`");
        assert_eq!(
            SqlValidator::quote_identifier("we`ird").unwrap(),
            "`we``ird`"
        );
        assert_eq!(
            SqlValidator::quote_identifier("orders; DROP TABLE x").unwrap(),
            "`orders; DROP TABLE x`"
        );
        assert!(SqlValidator::quote_identifier("").is_err());
    }
}
