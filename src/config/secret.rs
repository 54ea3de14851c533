//! Credential handling for lookup passwords, tokens and storage keys
//!
//! Secrets are wrapped in `secrecy::Secret`, zeroed on drop and redacted in
//! `Debug` output. Reading one takes an explicit `expose_secret()`.

use secrecy::{CloneableSecret, DebugSecret, Secret, SerializableSecret};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use zeroize::Zeroize;

/// Credential text that can live inside a [`Secret`]
#[derive(Clone, Debug, Zeroize)]
#[zeroize(drop)]
pub struct SecretValue(String);

impl CloneableSecret for SecretValue {}
impl DebugSecret for SecretValue {}
impl SerializableSecret for SecretValue {}

impl PartialEq<str> for SecretValue {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl std::fmt::Display for SecretValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for SecretValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for SecretValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(SecretValue)
    }
}

pub type SecretString = Secret<SecretValue>;

/// Wrap a credential read from configuration or the environment
pub fn secret_string(value: String) -> SecretString {
    Secret::new(SecretValue(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_expose_and_redact() {
        let secret = secret_string("okapi-token".to_string());
        assert_eq!(secret.expose_secret(), "okapi-token");
        assert_eq!(secret.expose_secret().to_string(), "okapi-token");
        assert!(!format!("{secret:?}").contains("okapi-token"));
    }

    #[test]
    fn test_password_survives_config_round_trip() {
        #[derive(Serialize, Deserialize)]
        struct Credentials {
            password: SecretString,
        }

        let toml_text = "password = \"s3cret\"\n";
        let parsed: Credentials = toml::from_str(toml_text).unwrap();
        assert_eq!(parsed.password.expose_secret(), "s3cret");
        assert_eq!(toml::to_string(&parsed).unwrap(), toml_text);
    }
}
