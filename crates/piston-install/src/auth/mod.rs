//! Player credentials.
//!
//! The installer never performs a login itself. Whatever produced the token
//! hands it over as [`Credentials`]; it is only forwarded as a bearer header to
//! endpoints that require an authenticated request.

use std::fmt;
use uuid::Uuid;

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    access_token: String,
    pub player_name: String,
    pub player_uuid: Uuid,
}

impl Credentials {
    pub fn new(access_token: impl Into<String>, player_name: impl Into<String>, player_uuid: Uuid) -> Self {
        Self {
            access_token: access_token.into(),
            player_name: player_name.into(),
            player_uuid,
        }
    }

    /// Credentials for offline play. The UUID is derived from the name, so the
    /// same name always maps to the same player.
    pub fn offline(player_name: impl Into<String>) -> Self {
        let player_name = player_name.into();
        let player_uuid = Uuid::new_v3(
            &Uuid::NAMESPACE_OID,
            format!("OfflinePlayer:{}", player_name).as_bytes(),
        );
        Self {
            access_token: "0".to_string(),
            player_name,
            player_uuid,
        }
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    /// Attach the bearer token to an outgoing request.
    pub fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request.bearer_auth(&self.access_token)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_token", &"<redacted>")
            .field("player_name", &self.player_name)
            .field("player_uuid", &self.player_uuid)
            .finish()
    }
}
