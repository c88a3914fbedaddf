//! JSON documents exchanged during the handshake.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Client name announced when none is configured.
pub const DEFAULT_CLIENT_NAME: &str = "natsline";
/// Language tag announced in the CONNECT document.
pub const DEFAULT_LANG: &str = "rust";

/// Options sent to the broker in the `CONNECT` command.
///
/// Authentication fields are passed through opaquely and omitted from the
/// document when unset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectOptions {
    /// Ask the broker to acknowledge every command with `+OK`/`-ERR`.
    pub verbose: bool,
    /// Ask the broker to apply strict subject checking.
    pub pedantic: bool,
    /// Whether the client requires TLS.
    pub ssl_required: bool,
    /// Client name reported to the broker.
    pub name: String,
    /// Implementation language tag.
    pub lang: String,
    /// Client protocol/library version.
    pub version: String,
    /// Opaque authentication token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
    /// User name for credential authentication.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    /// Password for credential authentication.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pass: Option<String>,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            verbose: false,
            pedantic: false,
            ssl_required: false,
            name: DEFAULT_CLIENT_NAME.to_owned(),
            lang: DEFAULT_LANG.to_owned(),
            version: env!("CARGO_PKG_VERSION").to_owned(),
            auth_token: None,
            user: None,
            pass: None,
        }
    }
}

/// Document announced by the broker in its `INFO` frame.
///
/// The document is stored as received. Nothing beyond JSON decodability is
/// validated, and an undecodable announcement leaves the info empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServerInfo {
    fields: Map<String, Value>,
}

impl ServerInfo {
    /// Decodes an `INFO` payload.
    ///
    /// # Errors
    ///
    /// Returns the JSON error when `json` is not a JSON object.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Decodes an `INFO` payload, falling back to an empty document.
    #[must_use]
    pub fn from_json_lossy(json: &str) -> Self {
        Self::from_json(json).unwrap_or_default()
    }

    /// Looks up a raw field.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Server identifier, when announced.
    #[must_use]
    pub fn server_id(&self) -> Option<&str> {
        self.get("server_id").and_then(Value::as_str)
    }

    /// Maximum payload size the broker accepts, when announced.
    #[must_use]
    pub fn max_payload(&self) -> Option<u64> {
        self.get("max_payload").and_then(Value::as_u64)
    }

    /// Returns `true` when nothing was announced or decoding failed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Borrows every announced field.
    #[must_use]
    pub const fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_omit_unset_credentials() {
        let json = serde_json::to_value(ConnectOptions::default()).expect("serialise options");
        let object = json.as_object().expect("options serialise to an object");
        assert_eq!(object.get("verbose"), Some(&Value::Bool(false)));
        assert_eq!(object.get("lang"), Some(&Value::from("rust")));
        assert!(!object.contains_key("auth_token"));
        assert!(!object.contains_key("user"));
        assert!(!object.contains_key("pass"));
    }

    #[test]
    fn credentials_are_passed_through() {
        let options = ConnectOptions {
            user: Some(String::from("alice")),
            pass: Some(String::from("s3cret")),
            ..ConnectOptions::default()
        };
        let json = serde_json::to_value(&options).expect("serialise options");
        assert_eq!(json.get("user"), Some(&Value::from("alice")));
        assert_eq!(json.get("pass"), Some(&Value::from("s3cret")));
    }

    #[test]
    fn server_info_exposes_announced_fields() {
        let info = ServerInfo::from_json(r#"{"server_id":"x","max_payload":1048576}"#)
            .expect("decode info");
        assert_eq!(info.server_id(), Some("x"));
        assert_eq!(info.max_payload(), Some(1_048_576));
    }

    #[test]
    fn undecodable_info_is_empty() {
        assert!(ServerInfo::from_json_lossy("not json").is_empty());
        assert!(ServerInfo::from_json_lossy("[1, 2]").is_empty());
    }
}
