//! Common validation helpers used by request DTOs.

use validator::ValidationError;

/// Validates a 3-letter uppercase ISO 4217 currency code.
pub fn validate_currency_code(code: &str) -> Result<(), ValidationError> {
    if code.len() == 3 && code.chars().all(|c| c.is_ascii_uppercase()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("currency_code");
        err.message = Some("Currency must be a 3-letter uppercase code".into());
        Err(err)
    }
}

/// Validates that a string is not blank (non-empty after trimming).
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("not_blank");
        err.message = Some("Value must not be blank".into());
        Err(err)
    } else {
        Ok(())
    }
}

/// Minimum password length for invited-user account creation.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Validates password strength: at least 8 characters with a letter and a digit.
pub fn validate_password_strength(password: &str) -> Result<(), ValidationError> {
    let long_enough = password.chars().count() >= MIN_PASSWORD_LENGTH;
    let has_letter = password.chars().any(|c| c.is_alphabetic());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());

    if long_enough && has_letter && has_digit {
        Ok(())
    } else {
        let mut err = ValidationError::new("password_strength");
        err.message =
            Some("Password must be at least 8 characters with a letter and a digit".into());
        Err(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_currency_code_valid() {
        assert!(validate_currency_code("EUR").is_ok());
        assert!(validate_currency_code("USD").is_ok());
    }

    #[test]
    fn test_currency_code_invalid() {
        assert!(validate_currency_code("eur").is_err());
        assert!(validate_currency_code("EURO").is_err());
        assert!(validate_currency_code("E1").is_err());
        assert!(validate_currency_code("").is_err());
    }

    #[test]
    fn test_not_blank() {
        assert!(validate_not_blank("x").is_ok());
        assert!(validate_not_blank("  padded  ").is_ok());
        assert!(validate_not_blank("").is_err());
        assert!(validate_not_blank("   ").is_err());
    }

    #[test]
    fn test_password_strength() {
        assert!(validate_password_strength("abcdefg1").is_ok());
        assert!(validate_password_strength("s3cure-enough").is_ok());
        assert!(validate_password_strength("short1").is_err());
        assert!(validate_password_strength("nodigitshere").is_err());
        assert!(validate_password_strength("12345678").is_err());
    }
}
