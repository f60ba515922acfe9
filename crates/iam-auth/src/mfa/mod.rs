pub mod backup_codes;
pub mod session;
pub mod totp;

pub use backup_codes::{generate_backup_codes, hash_backup_code, verify_backup_code};
pub use session::MfaSessionEngine;
pub use totp::{generate_qr_code, generate_secret, generate_totp, generate_totp_uri, verify_totp};
