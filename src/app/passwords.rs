//! Django-compatible `pbkdf2_sha256` password hashes.
//!
//! Encoded form: `pbkdf2_sha256$<iterations>$<salt>$<base64 digest>`.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rand::distributions::Alphanumeric;
use rand::Rng;
use sha2::Sha256;
use subtle::ConstantTimeEq;

pub const ALGORITHM: &str = "pbkdf2_sha256";
const SEPARATOR: char = '$';
const SALT_LEN: usize = 22;
const DIGEST_LEN: usize = 32;

/// Returns `true` only when `encoded` is a well-formed `pbkdf2_sha256` hash of
/// `password`. Malformed input of any kind is a mismatch.
pub fn verify_django_password(password: &str, encoded: &str) -> bool {
    if encoded.is_empty() {
        return false;
    }

    let fields: Vec<&str> = encoded.split(SEPARATOR).collect();
    let [algorithm, iterations, salt, digest] = fields.as_slice() else {
        return false;
    };

    if *algorithm != ALGORITHM {
        return false;
    }

    let iterations = match iterations.parse::<u32>() {
        Ok(iterations) if iterations > 0 => iterations,
        _ => return false,
    };

    let computed = derive_digest(password, salt, iterations);
    computed.as_bytes().ct_eq(digest.as_bytes()).into()
}

/// Hashes `password` with a fresh random salt.
pub fn make_django_password(password: &str, iterations: u32) -> String {
    let salt: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SALT_LEN)
        .map(char::from)
        .collect();
    encode_django_password(password, &salt, iterations)
}

pub fn encode_django_password(password: &str, salt: &str, iterations: u32) -> String {
    format!(
        "{ALGORITHM}{SEPARATOR}{iterations}{SEPARATOR}{salt}{SEPARATOR}{}",
        derive_digest(password, salt, iterations)
    )
}

fn derive_digest(password: &str, salt: &str, iterations: u32) -> String {
    let mut derived = [0u8; DIGEST_LEN];
    pbkdf2::pbkdf2_hmac::<Sha256>(password.as_bytes(), salt.as_bytes(), iterations, &mut derived);
    STANDARD.encode(derived).trim_end().to_string()
}
