use crate::error::Result;
use argon2::{
    password_hash::{PasswordHasher, SaltString},
    Argon2,
};
use rand::{distributions::Alphanumeric, Rng};

/// Recovery-code shape a tenant enrolls under. Codes render as `XXXX-XXXX`
/// regardless of `code_length`, split evenly down the middle.
#[derive(Debug, Clone, Copy)]
pub struct BackupCodePolicy {
    pub code_length: usize,
    pub code_count: usize,
}

impl Default for BackupCodePolicy {
    fn default() -> Self {
        Self { code_length: 8, code_count: 10 }
    }
}

/// Plaintext one-time recovery codes to display to the user exactly once —
/// only their Argon2 hashes are ever persisted.
pub fn generate_backup_codes() -> Vec<String> {
    generate_backup_codes_with_policy(&BackupCodePolicy::default())
}

pub fn generate_backup_codes_with_policy(policy: &BackupCodePolicy) -> Vec<String> {
    let mut rng = rand::thread_rng();
    let half = policy.code_length / 2;
    (0..policy.code_count)
        .map(|_| {
            let code: String = (0..policy.code_length).map(|_| rng.sample(Alphanumeric) as char).collect();
            format!("{}-{}", &code[..half], &code[half..])
        })
        .collect()
}

/// Hashes a recovery code with Argon2 after stripping its display hyphen.
pub fn hash_backup_code(code: &str) -> Result<String> {
    let salt = SaltString::generate(&mut rand::thread_rng());
    let argon2 = Argon2::default();

    let code_clean = code.replace('-', "");

    let password_hash = argon2.hash_password(code_clean.as_bytes(), &salt).map_err(crate::error::AuthError::from)?;

    Ok(password_hash.to_string())
}

/// Verifies a recovery code against its stored hash; accepts the code with
/// or without its display hyphen so redemption is forgiving of copy-paste.
pub fn verify_backup_code(code: &str, hash: &str) -> Result<bool> {
    use argon2::password_hash::{PasswordHash, PasswordVerifier};

    let code_clean = code.replace('-', "");

    let parsed_hash = PasswordHash::new(hash).map_err(crate::error::AuthError::from)?;

    Ok(Argon2::default().verify_password(code_clean.as_bytes(), &parsed_hash).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_yields_ten_hyphenated_codes() {
        let codes = generate_backup_codes();
        assert_eq!(codes.len(), BackupCodePolicy::default().code_count);

        for code in &codes {
            assert_eq!(code.len(), 9);
            assert_eq!(code.chars().nth(4), Some('-'));
            assert!(code.chars().all(|c| c.is_alphanumeric() || c == '-'));
        }
    }

    #[test]
    fn a_tighter_policy_shrinks_the_code_set() {
        let policy = BackupCodePolicy { code_length: 6, code_count: 4 };
        let codes = generate_backup_codes_with_policy(&policy);
        assert_eq!(codes.len(), 4);
        for code in &codes {
            assert_eq!(code.len(), 7); // 6 chars + 1 hyphen
        }
    }

    #[test]
    fn redemption_succeeds_against_its_own_hash_and_rejects_others() {
        let code = "ABCD-EFGH";
        let hash = hash_backup_code(code).unwrap();

        assert!(verify_backup_code(code, &hash).unwrap());
        assert!(!verify_backup_code("ABCD-EFGI", &hash).unwrap());
    }

    #[test]
    fn redemption_is_hyphen_agnostic() {
        let code = "ABCD-EFGH";
        let hash = hash_backup_code(code).unwrap();

        assert!(verify_backup_code("ABCDEFGH", &hash).unwrap());
        assert!(verify_backup_code("ABCD-EFGH", &hash).unwrap());
    }
}
