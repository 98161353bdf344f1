//! Password hashing and one-time password generation

use crate::{Error, Result};
use rand::Rng;
use tracing::warn;

/// Minimum accepted password length
pub const MIN_PASSWORD_LEN: usize = 6;

/// Lifetime of an emailed OTP
pub const OTP_VALIDITY_MINUTES: i64 = 10;

/// Wrong guesses an OTP tolerates before it is burned
pub const MAX_OTP_ATTEMPTS: i64 = 5;

/// Hash a password with bcrypt at the given cost
pub fn hash_password(plain: &str, cost: u32) -> Result<String> {
    Ok(bcrypt::hash(plain, cost)?)
}

/// Check a password against a stored bcrypt hash.
///
/// A malformed stored hash counts as a mismatch.
pub fn verify_password(plain: &str, hash: &str) -> bool {
    match bcrypt::verify(plain, hash) {
        Ok(matches) => matches,
        Err(e) => {
            warn!("Stored password hash could not be verified: {}", e);
            false
        }
    }
}

/// Reject passwords shorter than [`MIN_PASSWORD_LEN`]
pub fn check_password_length(plain: &str) -> Result<()> {
    if plain.chars().count() < MIN_PASSWORD_LEN {
        return Err(Error::InvalidInput(format!(
            "Password harus minimal {} karakter",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

/// Six-digit numeric OTP in 100000..=999999
pub fn generate_otp() -> String {
    rand::thread_rng().gen_range(100_000..1_000_000).to_string()
}

/// Six ASCII digits
pub fn is_otp_format(otp: &str) -> bool {
    otp.len() == 6 && otp.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() {
        let hash = hash_password("rahasia123", 4).unwrap();
        assert!(verify_password("rahasia123", &hash));
        assert!(!verify_password("salah", &hash));
    }

    #[test]
    fn malformed_hash_never_verifies() {
        assert!(!verify_password("anything", "not-a-bcrypt-hash"));
    }

    #[test]
    fn otp_is_six_digits() {
        for _ in 0..200 {
            let otp = generate_otp();
            assert!(is_otp_format(&otp), "bad otp {}", otp);
            let value: u32 = otp.parse().unwrap();
            assert!((100_000..=999_999).contains(&value));
        }
    }

    #[test]
    fn short_passwords_rejected() {
        assert!(check_password_length("12345").is_err());
        assert!(check_password_length("123456").is_ok());
    }

    #[test]
    fn otp_format_rejects_non_digits() {
        assert!(!is_otp_format("12345a"));
        assert!(!is_otp_format("1234567"));
        assert!(is_otp_format("000123"));
    }
}
