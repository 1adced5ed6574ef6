//! Common validation utilities.

use validator::ValidationError;

lazy_static::lazy_static! {
    /// E.164 phone numbers: leading '+', 8 to 15 digits, no leading zero.
    static ref PHONE_REGEX: regex::Regex = regex::Regex::new(r"^\+[1-9][0-9]{7,14}$").unwrap();

    /// Invitation codes in XXX-XXX-XXX format.
    pub static ref INVITATION_CODE_REGEX: regex::Regex =
        regex::Regex::new(r"^[A-Z0-9]{3}-[A-Z0-9]{3}-[A-Z0-9]{3}$").unwrap();
}

/// Validates that a latitude value is within valid range (-90 to 90).
pub fn validate_latitude(lat: f64) -> Result<(), ValidationError> {
    if (-90.0..=90.0).contains(&lat) {
        Ok(())
    } else {
        let mut err = ValidationError::new("latitude_range");
        err.message = Some("Latitude must be between -90 and 90".into());
        Err(err)
    }
}

/// Validates that a longitude value is within valid range (-180 to 180).
pub fn validate_longitude(lon: f64) -> Result<(), ValidationError> {
    if (-180.0..=180.0).contains(&lon) {
        Ok(())
    } else {
        let mut err = ValidationError::new("longitude_range");
        err.message = Some("Longitude must be between -180 and 180".into());
        Err(err)
    }
}

/// Validates an E.164 formatted phone number.
pub fn validate_phone_number(phone: &str) -> Result<(), ValidationError> {
    if PHONE_REGEX.is_match(phone) {
        Ok(())
    } else {
        let mut err = ValidationError::new("phone_format");
        err.message = Some("Phone number must be in E.164 format".into());
        Err(err)
    }
}

/// Validates that a point cost is non-negative.
pub fn validate_match_cost(cost: i64) -> Result<(), ValidationError> {
    if cost >= 0 {
        Ok(())
    } else {
        let mut err = ValidationError::new("match_cost_range");
        err.message = Some("Match cost must be non-negative".into());
        Err(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fake::faker::phone_number::raw::CellNumber;
    use fake::locales::EN;
    use fake::Fake;

    #[test]
    fn test_validate_latitude() {
        assert!(validate_latitude(0.0).is_ok());
        assert!(validate_latitude(90.0).is_ok());
        assert!(validate_latitude(-90.0).is_ok());
        assert!(validate_latitude(90.1).is_err());
        assert!(validate_latitude(-90.1).is_err());
    }

    #[test]
    fn test_validate_latitude_error_message() {
        let err = validate_latitude(100.0).unwrap_err();
        assert_eq!(
            err.message.unwrap().to_string(),
            "Latitude must be between -90 and 90"
        );
    }

    #[test]
    fn test_validate_longitude() {
        assert!(validate_longitude(0.0).is_ok());
        assert!(validate_longitude(180.0).is_ok());
        assert!(validate_longitude(-180.0).is_ok());
        assert!(validate_longitude(180.1).is_err());
        assert!(validate_longitude(-180.1).is_err());
    }

    #[test]
    fn test_validate_phone_number() {
        assert!(validate_phone_number("+821012345678").is_ok());
        assert!(validate_phone_number("+14155550123").is_ok());
        assert!(validate_phone_number("01012345678").is_err());
        assert!(validate_phone_number("+0123456789").is_err());
        assert!(validate_phone_number("+12").is_err());
        assert!(validate_phone_number("").is_err());
    }

    #[test]
    fn test_validate_phone_number_rejects_formatted_numbers() {
        // Faker output carries separators and no country prefix
        let raw: String = CellNumber(EN).fake();
        if raw.contains(['-', ' ', '(', '.']) {
            assert!(validate_phone_number(&raw).is_err());
        }
    }

    #[test]
    fn test_validate_match_cost() {
        assert!(validate_match_cost(0).is_ok());
        assert!(validate_match_cost(10).is_ok());
        assert!(validate_match_cost(-1).is_err());
    }

    #[test]
    fn test_invitation_code_regex() {
        assert!(INVITATION_CODE_REGEX.is_match("ABC-234-XYZ"));
        assert!(!INVITATION_CODE_REGEX.is_match("abc-234-xyz"));
        assert!(!INVITATION_CODE_REGEX.is_match("ABC234XYZ"));
    }
}
