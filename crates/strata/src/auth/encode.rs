//! HTTP header encoding of auth descriptors
use super::{AuthDescriptor, AuthError, AuthType, CredentialField, API_KEY_HEADER, AUTHORIZATION_HEADER};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use indexmap::IndexMap;

fn credential<'d>(
    descriptor: &'d AuthDescriptor,
    fields: &[CredentialField],
) -> Result<&'d str, AuthError> {
    fields
        .iter()
        .find_map(|field| descriptor.credentials.get(*field))
        .ok_or_else(|| AuthError::MissingCredential {
            provider: descriptor.provider_name.clone(),
            field: fields[0],
            tried: Vec::new(),
        })
}

/// `identity:secret`, base64 encoded
fn pair(descriptor: &AuthDescriptor) -> Result<String, AuthError> {
    let identity = credential(descriptor, &[CredentialField::Username, CredentialField::Email])?;
    let secret = credential(descriptor, &[CredentialField::Password, CredentialField::Token])?;
    Ok(STANDARD.encode(format!("{identity}:{secret}")))
}

/// Headers that authenticate a request as described
///
/// Signing schemes (`hmac`, `edgegrid`) need the request itself and are not supported here.
pub fn encode_headers(descriptor: &AuthDescriptor) -> Result<IndexMap<String, String>, AuthError> {
    let single = |name: &str, value: String| IndexMap::from([(name.to_string(), value)]);

    let headers = match descriptor.auth_type {
        AuthType::Basic | AuthType::BasicEmail | AuthType::BasicToken | AuthType::BasicEmailToken => {
            single(AUTHORIZATION_HEADER, format!("Basic {}", pair(descriptor)?))
        }
        AuthType::Bearer | AuthType::BearerOauth | AuthType::BearerJwt => {
            let token = credential(descriptor, &[CredentialField::Token, CredentialField::Password])?;
            single(AUTHORIZATION_HEADER, format!("Bearer {token}"))
        }
        AuthType::BearerUsernameToken
        | AuthType::BearerUsernamePassword
        | AuthType::BearerEmailToken
        | AuthType::BearerEmailPassword => {
            single(AUTHORIZATION_HEADER, format!("Bearer {}", pair(descriptor)?))
        }
        AuthType::XApiKey => {
            let token = credential(descriptor, &[CredentialField::Token])?;
            single(API_KEY_HEADER, token.to_string())
        }
        AuthType::Custom | AuthType::CustomHeader => {
            let name = descriptor
                .credentials
                .header_name
                .as_deref()
                .ok_or_else(|| AuthError::MissingHeaderName {
                    provider: descriptor.provider_name.clone(),
                })?;
            let value = match &descriptor.credentials.header_value {
                Some(value) => value.clone(),
                None => credential(descriptor, &[CredentialField::Token])?.to_string(),
            };
            single(name, value)
        }
        AuthType::ConnectionString | AuthType::None => IndexMap::new(),
        AuthType::Hmac | AuthType::EdgeGrid => {
            return Err(AuthError::EncodingUnsupported(descriptor.auth_type))
        }
    };

    Ok(headers)
}
