use crate::error::{AuthError, Result};
use base32::Alphabet;
use image::Luma;
use qrcode::QrCode;
use rand::Rng;
use totp_lite::{totp_custom, Sha1};

/// TOTP digit count and step length. Tenants enroll users under the default
/// policy today; the knob exists so a future tenant capability can widen the
/// step for SMS-adjacent authenticator apps without touching call sites.
#[derive(Debug, Clone, Copy)]
pub struct TotpPolicy {
    pub digits: u32,
    pub step_seconds: u64,
}

impl Default for TotpPolicy {
    fn default() -> Self {
        Self { digits: 6, step_seconds: 30 }
    }
}

/// Random 160-bit secret, base32-encoded for display in enrollment QR codes.
pub fn generate_secret() -> String {
    let mut rng = rand::thread_rng();
    let secret_bytes: Vec<u8> = (0..20).map(|_| rng.gen()).collect();
    base32::encode(Alphabet::Rfc4648 { padding: false }, &secret_bytes)
}

pub fn generate_totp(secret: &str) -> Result<String> {
    generate_totp_with_policy(secret, &TotpPolicy::default())
}

pub fn generate_totp_with_policy(secret: &str, policy: &TotpPolicy) -> Result<String> {
    let secret_bytes = base32::decode(Alphabet::Rfc4648 { padding: false }, secret).ok_or(AuthError::InvalidRequest)?;

    let time = current_unix_time()?;
    let totp_value = totp_custom::<Sha1>(policy.step_seconds, policy.digits, &secret_bytes, time);
    Ok(format!("{:0width$}", totp_value, width = policy.digits as usize))
}

/// Verifies a code within a ±1 step window to tolerate clock drift between
/// the server and the authenticator app.
pub fn verify_totp(secret: &str, code: &str) -> Result<bool> {
    verify_totp_with_policy(secret, code, &TotpPolicy::default())
}

pub fn verify_totp_with_policy(secret: &str, code: &str, policy: &TotpPolicy) -> Result<bool> {
    let secret_bytes = base32::decode(Alphabet::Rfc4648 { padding: false }, secret).ok_or(AuthError::InvalidRequest)?;

    let time = current_unix_time()?;

    for step_offset in [-1i64, 0, 1] {
        let check_time = (time as i64 + (step_offset * policy.step_seconds as i64)) as u64;
        let totp_value = totp_custom::<Sha1>(policy.step_seconds, policy.digits, &secret_bytes, check_time);
        let expected_code = format!("{:0width$}", totp_value, width = policy.digits as usize);

        if constant_time_compare(&expected_code, code) {
            return Ok(true);
        }
    }

    Ok(false)
}

fn current_unix_time() -> Result<u64> {
    Ok(std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_err(|e| AuthError::Internal(format!("clock error: {e}")))?
        .as_secs())
}

/// Builds the `otpauth://totp/...` URI an authenticator app scans from the
/// enrollment QR code.
pub fn generate_totp_uri(secret: &str, account_name: &str, issuer: &str) -> String {
    generate_totp_uri_with_policy(secret, account_name, issuer, &TotpPolicy::default())
}

pub fn generate_totp_uri_with_policy(secret: &str, account_name: &str, issuer: &str, policy: &TotpPolicy) -> String {
    format!(
        "otpauth://totp/{}:{}?secret={}&issuer={}&algorithm=SHA1&digits={}&period={}",
        urlencoding::encode(issuer),
        urlencoding::encode(account_name),
        secret,
        urlencoding::encode(issuer),
        policy.digits,
        policy.step_seconds
    )
}

/// PNG bytes for a QR code encoding the given TOTP enrollment URI.
pub fn generate_qr_code(totp_uri: &str) -> Result<Vec<u8>> {
    let qr = QrCode::new(totp_uri.as_bytes()).map_err(|e| AuthError::Internal(format!("QR code generation failed: {e}")))?;

    let image = qr.render::<Luma<u8>>().min_dimensions(256, 256).build();

    let mut png_bytes = Vec::new();
    image::DynamicImage::ImageLuma8(image)
        .write_to(&mut std::io::Cursor::new(&mut png_bytes), image::ImageFormat::Png)
        .map_err(|e| AuthError::Internal(format!("PNG encoding failed: {e}")))?;

    Ok(png_bytes)
}

fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let a_bytes = a.as_bytes();
    let b_bytes = b.as_bytes();

    let mut result = 0u8;
    for i in 0..a_bytes.len() {
        result |= a_bytes[i] ^ b_bytes[i];
    }

    result == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secret_is_long_enough_for_160_bits() {
        let secret = generate_secret();
        assert!(!secret.is_empty());
        assert!(secret.len() >= 32);
    }

    #[test]
    fn generated_code_matches_default_policy_digit_count() {
        let secret = generate_secret();
        let code = generate_totp(&secret).unwrap();
        assert_eq!(code.len(), 6);
        assert!(code.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn code_round_trips_through_verification() {
        let secret = generate_secret();
        let code = generate_totp(&secret).unwrap();
        assert!(verify_totp(&secret, &code).unwrap());
    }

    #[test]
    fn eight_digit_policy_produces_eight_digit_codes_and_verifies() {
        let policy = TotpPolicy { digits: 8, step_seconds: 30 };
        let secret = generate_secret();
        let code = generate_totp_with_policy(&secret, &policy).unwrap();
        assert_eq!(code.len(), 8);
        assert!(verify_totp_with_policy(&secret, &code, &policy).unwrap());
        // A code minted under the default 6-digit policy won't satisfy an
        // 8-digit verification even if it happens to share a prefix.
        let default_code = generate_totp(&secret).unwrap();
        assert!(!verify_totp_with_policy(&secret, &default_code, &policy).unwrap());
    }

    #[test]
    fn enrollment_uri_carries_issuer_and_secret() {
        let secret = "JBSWY3DPEHPK3PXP";
        let uri = generate_totp_uri(secret, "user@example.com", "iam-kernel");
        assert!(uri.starts_with("otpauth://totp/"));
        assert!(uri.contains("secret=JBSWY3DPEHPK3PXP"));
        assert!(uri.contains("issuer=iam-kernel"));
    }

    #[test]
    fn constant_time_compare_rejects_mismatched_length_and_content() {
        assert!(constant_time_compare("123456", "123456"));
        assert!(!constant_time_compare("123456", "123457"));
        assert!(!constant_time_compare("123456", "12345"));
    }
}
