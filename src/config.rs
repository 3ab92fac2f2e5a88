//! Receiver configuration: license key and callback secret.
//!
//! Configuration is injected into the verifier and coordinator through the
//! [`ConfigProvider`] trait rather than read from ambient global state. The
//! callback secret is generated lazily on first use (32 high-entropy
//! alphanumeric characters) and persisted by the provider; if it is absent
//! at verification time that is a hard failure, never a silent bypass.

use std::sync::Mutex;

use rand::Rng;
use rand::distributions::Alphanumeric;

/// Length of a generated callback secret, in characters.
pub const CALLBACK_SECRET_LEN: usize = 32;

/// Access to the receiver's configured license key and callback secret.
pub trait ConfigProvider: Send + Sync {
    /// The license key this receiver accepts callbacks for, if configured.
    fn license_key(&self) -> Option<String>;

    /// The shared callback secret, if one has been configured or generated.
    fn callback_secret(&self) -> Option<String>;

    /// Returns the callback secret, generating and persisting one first if
    /// none exists. Used when registering this receiver with the producer,
    /// never during verification.
    fn get_or_create_callback_secret(&self) -> String;
}

/// Generates a fresh high-entropy callback secret.
pub fn generate_callback_secret() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(CALLBACK_SECRET_LEN)
        .map(char::from)
        .collect()
}

/// In-memory configuration provider.
///
/// Backs tests and the bundled binary, which seeds it from the environment.
pub struct MemoryConfig {
    license_key: Option<String>,
    callback_secret: Mutex<Option<String>>,
}

impl MemoryConfig {
    pub fn new(license_key: Option<String>, callback_secret: Option<String>) -> Self {
        MemoryConfig {
            license_key,
            callback_secret: Mutex::new(callback_secret),
        }
    }
}

impl ConfigProvider for MemoryConfig {
    fn license_key(&self) -> Option<String> {
        self.license_key.clone()
    }

    fn callback_secret(&self) -> Option<String> {
        self.callback_secret.lock().expect("config poisoned").clone()
    }

    fn get_or_create_callback_secret(&self) -> String {
        let mut secret = self.callback_secret.lock().expect("config poisoned");
        secret
            .get_or_insert_with(generate_callback_secret)
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_secret_shape() {
        let secret = generate_callback_secret();
        assert_eq!(secret.len(), CALLBACK_SECRET_LEN);
        assert!(secret.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn generated_secrets_differ() {
        // Collisions over 32 alphanumeric characters are astronomically
        // unlikely; equality here would indicate a broken RNG seed.
        assert_ne!(generate_callback_secret(), generate_callback_secret());
    }

    #[test]
    fn secret_created_once_then_stable() {
        let config = MemoryConfig::new(None, None);
        assert_eq!(config.callback_secret(), None);

        let first = config.get_or_create_callback_secret();
        let second = config.get_or_create_callback_secret();
        assert_eq!(first, second);
        assert_eq!(config.callback_secret(), Some(first));
    }

    #[test]
    fn preconfigured_secret_is_not_replaced() {
        let config = MemoryConfig::new(None, Some("configured-secret".to_string()));
        assert_eq!(
            config.get_or_create_callback_secret(),
            "configured-secret".to_string()
        );
    }

    #[test]
    fn license_key_passthrough() {
        let config = MemoryConfig::new(Some("ABC123".to_string()), None);
        assert_eq!(config.license_key(), Some("ABC123".to_string()));
        assert_eq!(MemoryConfig::new(None, None).license_key(), None);
    }
}
