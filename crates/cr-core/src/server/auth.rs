//! Sentinel credential checks.
//!
//! The simulator is a test fixture, not a security boundary: it accepts one
//! fixed username/password pair or one fixed public key. Over the line
//! protocol a key is offered at the password prompt as an OpenSSH public
//! key line (`ssh-ed25519 AAAA... comment`).

use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD};
use base64::Engine;
use cr_config::ServerConfig;
use sha2::{Digest, Sha256};

/// OpenSSH-style fingerprint of a public key blob: `SHA256:<base64>`.
pub fn key_fingerprint(key_blob: &[u8]) -> String {
    let digest = Sha256::digest(key_blob);
    format!("SHA256:{}", STANDARD_NO_PAD.encode(digest))
}

/// Key blob of an OpenSSH public key line, `None` for anything else.
pub fn parse_public_key_line(line: &str) -> Option<Vec<u8>> {
    let mut fields = line.split_whitespace();
    let key_type = fields.next()?;
    if !(key_type.starts_with("ssh-")
        || key_type.starts_with("ecdsa-")
        || key_type.starts_with("sk-"))
    {
        return None;
    }
    STANDARD.decode(fields.next()?).ok()
}

#[derive(Debug, Clone)]
pub struct Authenticator {
    username: String,
    password: String,
    fingerprint: String,
    max_attempts: u32,
}

impl Authenticator {
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        fingerprint: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            fingerprint: fingerprint.into(),
            max_attempts: 3,
        }
    }

    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            username: config.username.clone(),
            password: config.password.clone(),
            fingerprint: config.key_fingerprint.clone(),
            max_attempts: config.max_auth_attempts,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn validate_password(&self, username: &str, password: &str) -> bool {
        username == self.username && password == self.password
    }

    pub fn validate_public_key(&self, username: &str, key_blob: &[u8]) -> bool {
        username == self.username && key_fingerprint(key_blob) == self.fingerprint
    }

    /// Check a password-prompt answer, which is either the password or a
    /// public key line.
    pub fn validate_secret(&self, username: &str, secret: &str) -> bool {
        match parse_public_key_line(secret) {
            Some(blob) => self.validate_public_key(username, &blob),
            None => self.validate_password(username, secret),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_matches_openssh_format() {
        assert_eq!(
            key_fingerprint(b""),
            "SHA256:47DEQpj8HBSa+/TImW+5JCeuQeRkm5NMpJWZG3hSuFU"
        );
    }

    #[test]
    fn sentinel_password_is_required() {
        let auth = Authenticator::from_config(&ServerConfig::default());
        assert!(auth.validate_password("chanreplay", "chanreplay"));
        assert!(!auth.validate_password("chanreplay", "admin"));
        assert!(!auth.validate_password("admin", "chanreplay"));
        assert_eq!(auth.max_attempts(), 3);
    }

    #[test]
    fn public_key_is_checked_by_fingerprint() {
        let auth = Authenticator::new(
            "chanreplay",
            "chanreplay",
            "SHA256:GeotElsLtwTAXWimW0r3Rz4wNwXHjpeHJ3puj06ZLmc",
        );
        assert!(auth.validate_public_key("chanreplay", b"chanreplay-test-key"));
        assert!(!auth.validate_public_key("chanreplay", b"another-key"));
        assert!(!auth.validate_public_key("someone", b"chanreplay-test-key"));
    }

    #[test]
    fn secret_may_be_a_public_key_line() {
        let auth = Authenticator::new(
            "chanreplay",
            "chanreplay",
            key_fingerprint(b"chanreplay-test-key"),
        );
        assert!(auth.validate_secret(
            "chanreplay",
            "ssh-ed25519 Y2hhbnJlcGxheS10ZXN0LWtleQ== ci@host"
        ));
        assert!(auth.validate_secret("chanreplay", "chanreplay"));
        assert!(!auth.validate_secret("chanreplay", "ssh-ed25519 YW5vdGhlci1rZXk="));
        assert!(!auth.validate_secret("chanreplay", "ssh-ed25519 not*base64"));
        assert_eq!(parse_public_key_line("hunter2"), None);
        assert_eq!(
            parse_public_key_line("ecdsa-sha2-nistp256 YWJj").as_deref(),
            Some(&b"abc"[..])
        );
    }
}
