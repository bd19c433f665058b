//! auth type taxonomy
use std::fmt::Formatter;
use std::str::FromStr;

/// Supported authentication schemes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthType {
    Basic,
    BasicEmail,
    BasicToken,
    BasicEmailToken,
    Bearer,
    BearerOauth,
    BearerJwt,
    BearerUsernameToken,
    BearerUsernamePassword,
    BearerEmailToken,
    BearerEmailPassword,
    XApiKey,
    Custom,
    CustomHeader,
    Hmac,
    EdgeGrid,
    ConnectionString,
    None,
}

pub const API_KEY_HEADER: &str = "X-API-Key";
pub const AUTHORIZATION_HEADER: &str = "Authorization";

impl AuthType {
    pub const ALL: [AuthType; 18] = [
        AuthType::Basic,
        AuthType::BasicEmail,
        AuthType::BasicToken,
        AuthType::BasicEmailToken,
        AuthType::Bearer,
        AuthType::BearerOauth,
        AuthType::BearerJwt,
        AuthType::BearerUsernameToken,
        AuthType::BearerUsernamePassword,
        AuthType::BearerEmailToken,
        AuthType::BearerEmailPassword,
        AuthType::XApiKey,
        AuthType::Custom,
        AuthType::CustomHeader,
        AuthType::Hmac,
        AuthType::EdgeGrid,
        AuthType::ConnectionString,
        AuthType::None,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AuthType::Basic => "basic",
            AuthType::BasicEmail => "basic_email",
            AuthType::BasicToken => "basic_token",
            AuthType::BasicEmailToken => "basic_email_token",
            AuthType::Bearer => "bearer",
            AuthType::BearerOauth => "bearer_oauth",
            AuthType::BearerJwt => "bearer_jwt",
            AuthType::BearerUsernameToken => "bearer_username_token",
            AuthType::BearerUsernamePassword => "bearer_username_password",
            AuthType::BearerEmailToken => "bearer_email_token",
            AuthType::BearerEmailPassword => "bearer_email_password",
            AuthType::XApiKey => "x-api-key",
            AuthType::Custom => "custom",
            AuthType::CustomHeader => "custom_header",
            AuthType::Hmac => "hmac",
            AuthType::EdgeGrid => "edgegrid",
            AuthType::ConnectionString => "connection_string",
            AuthType::None => "none",
        }
    }

    /// Credentials that must resolve for this scheme
    pub fn required_fields(&self) -> &'static [CredentialField] {
        use CredentialField::*;

        match self {
            AuthType::Basic | AuthType::BearerUsernamePassword => &[Username, Password],
            AuthType::BasicEmail | AuthType::BearerEmailPassword => &[Email, Password],
            AuthType::BasicToken | AuthType::BearerUsernameToken => &[Username, Token],
            AuthType::BasicEmailToken | AuthType::BearerEmailToken => &[Email, Token],
            AuthType::Bearer
            | AuthType::BearerOauth
            | AuthType::BearerJwt
            | AuthType::XApiKey
            | AuthType::Custom
            | AuthType::CustomHeader => &[Token],
            AuthType::Hmac | AuthType::EdgeGrid => &[ClientToken, ClientSecret, AccessToken],
            AuthType::ConnectionString => &[ConnectionString],
            AuthType::None => &[],
        }
    }

    /// Header carrying the credential. `None` for custom schemes, which name their own header, and for schemes
    /// that are not sent as a header.
    pub fn default_header_name(&self) -> Option<&'static str> {
        match self {
            AuthType::XApiKey => Some(API_KEY_HEADER),
            AuthType::Custom | AuthType::CustomHeader => None,
            AuthType::ConnectionString | AuthType::None => None,
            _ => Some(AUTHORIZATION_HEADER),
        }
    }

    pub fn requires_header_name(&self) -> bool {
        matches!(self, AuthType::Custom | AuthType::CustomHeader)
    }
}

impl std::fmt::Display for AuthType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[error("unknown auth type '{0}'")]
pub struct UnknownAuthType(pub String);

impl FromStr for AuthType {
    type Err = UnknownAuthType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        AuthType::ALL
            .into_iter()
            .find(|auth_type| auth_type.as_str() == normalized)
            .ok_or_else(|| UnknownAuthType(s.to_string()))
    }
}

impl serde::Serialize for AuthType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// A single credential value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialField {
    Username,
    Password,
    Email,
    Token,
    ClientToken,
    ClientSecret,
    AccessToken,
    ConnectionString,
}

impl CredentialField {
    pub fn as_str(&self) -> &'static str {
        match self {
            CredentialField::Username => "username",
            CredentialField::Password => "password",
            CredentialField::Email => "email",
            CredentialField::Token => "token",
            CredentialField::ClientToken => "client_token",
            CredentialField::ClientSecret => "client_secret",
            CredentialField::AccessToken => "access_token",
            CredentialField::ConnectionString => "connection_string",
        }
    }

    /// Item key naming the primary variable
    pub fn primary_key(&self) -> &'static str {
        match self {
            CredentialField::Token => "endpoint_api_key",
            CredentialField::Username => "env_username",
            CredentialField::Password => "env_password",
            CredentialField::Email => "env_email",
            CredentialField::ClientToken => "env_client_token",
            CredentialField::ClientSecret => "env_client_secret",
            CredentialField::AccessToken => "env_access_token",
            CredentialField::ConnectionString => "env_connection_string",
        }
    }

    /// Key inside `overwrite_from_env` holding the override chain
    pub fn overwrite_key(&self) -> &'static str {
        match self {
            CredentialField::Token => "endpoint_api_key",
            other => other.as_str(),
        }
    }

    /// Holds a secret that must not show up in output
    pub fn is_secret(&self) -> bool {
        !matches!(self, CredentialField::Username | CredentialField::Email)
    }
}

impl std::fmt::Display for CredentialField {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn names_round_trip() {
        for auth_type in AuthType::ALL {
            assert_eq!(auth_type.as_str().parse::<AuthType>(), Ok(auth_type));
        }
        assert_eq!(" Bearer ".parse::<AuthType>(), Ok(AuthType::Bearer));
        assert_eq!(
            "kerberos".parse::<AuthType>(),
            Err(UnknownAuthType("kerberos".into()))
        );
    }

    #[test]
    fn headers() {
        assert_eq!(AuthType::XApiKey.default_header_name(), Some("X-API-Key"));
        assert_eq!(AuthType::BearerJwt.default_header_name(), Some("Authorization"));
        assert_eq!(AuthType::Custom.default_header_name(), None);
        assert!(AuthType::CustomHeader.requires_header_name());
        assert!(AuthType::None.required_fields().is_empty());
    }
}
