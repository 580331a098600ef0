/// Validates a local mobile number as the user types it.
///
/// A valid mobile number is:
/// - Exactly 10 digits
/// - All characters are ASCII digits
#[must_use]
pub fn is_valid_mobile(s: &str) -> bool {
    s.len() == 10 && s.chars().all(|c| c.is_ascii_digit())
}

/// Normalizes a mobile number for the wire.
///
/// Local 10-digit numbers gain the `+91` country prefix; numbers that
/// already carry a `+` pass through unchanged.
#[must_use]
pub fn normalize(s: &str) -> String {
    if s.starts_with('+') {
        s.to_owned()
    } else {
        format!("+91{s}")
    }
}

/// Validates a one-time code.
///
/// A valid code is exactly 6 ASCII digits.
#[must_use]
pub fn is_valid_otp(s: &str) -> bool {
    s.len() == 6 && s.chars().all(|c| c.is_ascii_digit())
}
