//! authentication descriptors for providers
//!
//! A provider item declares its scheme and where its credentials come from:
//!
//! ```yaml
//! providers:
//!   github:
//!     endpoint_auth_type: basic_token          # default: bearer
//!     endpoint_auth_token_resolver: static     # static | startup | request
//!     env_username: GITHUB_USER
//!     endpoint_api_key: GITHUB_TOKEN
//!     overwrite_from_env:
//!       endpoint_api_key: [GH_TOKEN_OVERRIDE]
//! ```
//!
//! With `static` timing every required credential is read from the environment: the overwrite chain first, then
//! the primary variable. With `startup` or `request` timing the token is produced by a function registered in
//! [AuthComputeRegistry] instead. Startup tokens are computed once and kept, request tokens are computed on every
//! call and never kept.
mod compute;
mod encode;
mod kind;

pub use compute::{AuthComputeRegistry, RequestCompute, StartupCompute};
pub use encode::encode_headers;
pub use kind::{AuthType, CredentialField, UnknownAuthType, API_KEY_HEADER, AUTHORIZATION_HEADER};

use crate::context::RequestContext;
use crate::documents::DocumentStore;
use crate::env::{chain_names, ChainOutcome, EnvChainResolver};
use crate::section::{SectionResolver, OVERWRITE_KEY};
use crate::util::OnceSlots;
use crate::value::Value;
use futures::FutureExt;
use indexmap::IndexMap;
use serde::ser::SerializeMap;
use std::str::FromStr;
use std::sync::Arc;

pub const AUTH_TYPE_KEY: &str = "endpoint_auth_type";
pub const TIMING_KEY: &str = "endpoint_auth_token_resolver";
pub const HEADER_NAME_KEY: &str = "api_auth_header_name";

const REDACTED: &str = "***";

#[derive(thiserror::Error, Debug, Clone)]
pub enum AuthError {
    #[error("invalid auth type '{auth_type}' for provider '{provider}'")]
    InvalidAuthType { provider: String, auth_type: String },
    #[error("invalid token resolver '{value}' for provider '{provider}'")]
    InvalidTiming { provider: String, value: String },
    #[error("missing credential '{field}' for provider '{provider}', tried: [{}]", .tried.join(", "))]
    MissingCredential {
        provider: String,
        field: CredentialField,
        tried: Vec<String>,
    },
    #[error("provider '{provider}' uses a custom auth header but sets no 'api_auth_header_name'")]
    MissingHeaderName { provider: String },
    #[error("no {timing} compute function registered for provider '{provider}'")]
    ComputeFunctionNotFound {
        provider: String,
        timing: ResolutionTiming,
    },
    #[error("compute function failed for provider '{provider}': {cause:#}")]
    ComputeFunctionFailed {
        provider: String,
        cause: Arc<anyhow::Error>,
    },
    #[error("provider '{provider}' resolves its token per request, but no request context was given")]
    RequestContextRequired { provider: String },
    #[error("auth type '{0}' can not be encoded as headers")]
    EncodingUnsupported(AuthType),
}

/// When a provider's token is produced
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionTiming {
    #[default]
    Static,
    Startup,
    Request,
}

impl ResolutionTiming {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionTiming::Static => "static",
            ResolutionTiming::Startup => "startup",
            ResolutionTiming::Request => "request",
        }
    }
}

impl std::fmt::Display for ResolutionTiming {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResolutionTiming {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "static" => Ok(ResolutionTiming::Static),
            "startup" => Ok(ResolutionTiming::Startup),
            "request" => Ok(ResolutionTiming::Request),
            _ => Err(()),
        }
    }
}

/// Resolved credential values
///
/// Serializing replaces secret values with `***`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub username: Option<String>,
    pub password: Option<String>,
    pub email: Option<String>,
    pub token: Option<String>,
    pub client_token: Option<String>,
    pub client_secret: Option<String>,
    pub access_token: Option<String>,
    pub connection_string: Option<String>,
    pub header_name: Option<String>,
    pub header_value: Option<String>,
}

impl Credentials {
    pub fn get(&self, field: CredentialField) -> Option<&str> {
        match field {
            CredentialField::Username => self.username.as_deref(),
            CredentialField::Password => self.password.as_deref(),
            CredentialField::Email => self.email.as_deref(),
            CredentialField::Token => self.token.as_deref(),
            CredentialField::ClientToken => self.client_token.as_deref(),
            CredentialField::ClientSecret => self.client_secret.as_deref(),
            CredentialField::AccessToken => self.access_token.as_deref(),
            CredentialField::ConnectionString => self.connection_string.as_deref(),
        }
    }

    pub fn set(&mut self, field: CredentialField, value: String) {
        let slot = match field {
            CredentialField::Username => &mut self.username,
            CredentialField::Password => &mut self.password,
            CredentialField::Email => &mut self.email,
            CredentialField::Token => &mut self.token,
            CredentialField::ClientToken => &mut self.client_token,
            CredentialField::ClientSecret => &mut self.client_secret,
            CredentialField::AccessToken => &mut self.access_token,
            CredentialField::ConnectionString => &mut self.connection_string,
        };
        *slot = Some(value);
    }
}

impl serde::Serialize for Credentials {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        for field in [
            CredentialField::Username,
            CredentialField::Email,
            CredentialField::Password,
            CredentialField::Token,
            CredentialField::ClientToken,
            CredentialField::ClientSecret,
            CredentialField::AccessToken,
            CredentialField::ConnectionString,
        ] {
            if let Some(value) = self.get(field) {
                let shown = if field.is_secret() { REDACTED } else { value };
                map.serialize_entry(field.as_str(), shown)?;
            }
        }
        if let Some(header_name) = &self.header_name {
            map.serialize_entry("header_name", header_name)?;
        }
        if self.header_value.is_some() {
            map.serialize_entry("header_value", REDACTED)?;
        }
        map.end()
    }
}

/// Where a credential value came from
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldSource {
    Env { variable: String },
    Startup,
    Request,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct AuthResolution {
    pub timing: ResolutionTiming,
    pub sources: IndexMap<CredentialField, FieldSource>,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct AuthDescriptor {
    pub auth_type: AuthType,
    pub provider_name: String,
    pub credentials: Credentials,
    pub resolution: AuthResolution,
}

impl AuthDescriptor {
    pub fn headers(&self) -> Result<IndexMap<String, String>, AuthError> {
        encode_headers(self)
    }
}

/// Turns provider items into [AuthDescriptor]s
pub struct AuthResolver {
    env: EnvChainResolver,
    compute: AuthComputeRegistry,
    startup_tokens: OnceSlots<String, AuthError>,
}

impl std::fmt::Debug for AuthResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthResolver")
            .field("compute", &self.compute)
            .finish_non_exhaustive()
    }
}

impl AuthResolver {
    pub fn new(env: EnvChainResolver, compute: AuthComputeRegistry) -> Self {
        Self {
            env,
            compute,
            startup_tokens: OnceSlots::default(),
        }
    }

    #[tracing::instrument(level = "debug", skip_all, fields(provider = provider))]
    pub async fn resolve(
        &self,
        provider: &str,
        item: &Value,
        request: Option<&RequestContext>,
    ) -> Result<AuthDescriptor, AuthError> {
        let auth_type = auth_type_of(provider, item)?;
        let timing = timing_of(provider, item)?;
        tracing::debug!(auth_type = auth_type.as_str(), timing = timing.as_str(), "resolving auth");

        if timing == ResolutionTiming::Request && request.is_none() {
            return Err(AuthError::RequestContextRequired {
                provider: provider.to_string(),
            });
        }

        let computed_field = computed_field(auth_type);
        let mut credentials = Credentials::default();
        let mut sources = IndexMap::new();

        for &field in auth_type.required_fields() {
            let (value, source) = match (timing, request) {
                (ResolutionTiming::Startup, _) if Some(field) == computed_field => {
                    (self.startup_token(provider, item).await?, FieldSource::Startup)
                }
                (ResolutionTiming::Request, Some(request)) if Some(field) == computed_field => {
                    (self.request_token(provider, request).await?, FieldSource::Request)
                }
                _ => self.static_credential(provider, item, field)?,
            };

            credentials.set(field, value);
            sources.insert(field, source);
        }

        if auth_type.requires_header_name() {
            let header_name = item
                .get_present(HEADER_NAME_KEY)
                .and_then(Value::as_str)
                .filter(|name| !name.trim().is_empty())
                .ok_or_else(|| AuthError::MissingHeaderName {
                    provider: provider.to_string(),
                })?;
            credentials.header_name = Some(header_name.to_string());
            credentials.header_value = credentials.token.clone();
        } else {
            credentials.header_name = auth_type.default_header_name().map(str::to_string);
        }

        Ok(AuthDescriptor {
            auth_type,
            provider_name: provider.to_string(),
            credentials,
            resolution: AuthResolution { timing, sources },
        })
    }

    /// Computes the token of every startup-timed provider once
    ///
    /// Returns the names of the providers that were warmed.
    pub async fn warm_startup(&self, store: &DocumentStore) -> Result<Vec<String>, AuthError> {
        let providers = SectionResolver::providers(store, self.env.clone());
        let mut warmed = Vec::new();

        for name in providers.list() {
            let Some(item) = providers.raw(&name) else {
                continue;
            };
            if timing_of(&name, item)? != ResolutionTiming::Startup {
                continue;
            }
            self.startup_token(&name, item).await?;
            warmed.push(name);
        }

        tracing::info!(count = warmed.len(), "startup tokens computed");
        Ok(warmed)
    }

    /// Overwrite chain, then the primary variable. Empty values count as missing.
    fn static_credential(
        &self,
        provider: &str,
        item: &Value,
        field: CredentialField,
    ) -> Result<(String, FieldSource), AuthError> {
        let mut names = item
            .get_present(OVERWRITE_KEY)
            .and_then(|overwrites| overwrites.get(field.overwrite_key()))
            .map(chain_names)
            .unwrap_or_default();
        if let Some(primary) = item.get_present(field.primary_key()).and_then(Value::as_str) {
            names.push(primary.to_string());
        }

        match self.env.try_chain(&names) {
            ChainOutcome::Matched { value, name } if !value.is_empty() => {
                tracing::trace!(field = field.as_str(), variable = name.as_str(), "credential resolved");
                Ok((value, FieldSource::Env { variable: name }))
            }
            _ => Err(AuthError::MissingCredential {
                provider: provider.to_string(),
                field,
                tried: names,
            }),
        }
    }

    async fn startup_token(&self, provider: &str, item: &Value) -> Result<String, AuthError> {
        let function = self.compute.startup(provider);
        let owned_provider = provider.to_string();
        let item = item.clone();

        self.startup_tokens
            .get_or_init(provider, move || {
                async move {
                    let function = function.ok_or_else(|| AuthError::ComputeFunctionNotFound {
                        provider: owned_provider.clone(),
                        timing: ResolutionTiming::Startup,
                    })?;
                    let token = function(item).await.map_err(|cause| {
                        AuthError::ComputeFunctionFailed {
                            provider: owned_provider.clone(),
                            cause: Arc::new(cause),
                        }
                    })?;
                    non_empty(&owned_provider, ResolutionTiming::Startup, token)
                }
                .boxed()
            })
            .await
    }

    async fn request_token(
        &self,
        provider: &str,
        request: &RequestContext,
    ) -> Result<String, AuthError> {
        let function =
            self.compute
                .request(provider)
                .ok_or_else(|| AuthError::ComputeFunctionNotFound {
                    provider: provider.to_string(),
                    timing: ResolutionTiming::Request,
                })?;

        let token = function(request.clone())
            .await
            .map_err(|cause| AuthError::ComputeFunctionFailed {
                provider: provider.to_string(),
                cause: Arc::new(cause),
            })?;
        non_empty(provider, ResolutionTiming::Request, token)
    }
}

fn non_empty(provider: &str, timing: ResolutionTiming, token: String) -> Result<String, AuthError> {
    if token.is_empty() {
        return Err(AuthError::ComputeFunctionFailed {
            provider: provider.to_string(),
            cause: Arc::new(anyhow::anyhow!(
                "{timing} compute function returned an empty token"
            )),
        });
    }
    Ok(token)
}

fn auth_type_of(provider: &str, item: &Value) -> Result<AuthType, AuthError> {
    match item.get_present(AUTH_TYPE_KEY) {
        None => Ok(AuthType::Bearer),
        Some(Value::String(name)) => name.parse().map_err(|_| AuthError::InvalidAuthType {
            provider: provider.to_string(),
            auth_type: name.clone(),
        }),
        Some(other) => Err(AuthError::InvalidAuthType {
            provider: provider.to_string(),
            auth_type: other.to_template_string(),
        }),
    }
}

fn timing_of(provider: &str, item: &Value) -> Result<ResolutionTiming, AuthError> {
    match item.get_present(TIMING_KEY) {
        None => Ok(ResolutionTiming::Static),
        Some(value) => {
            let value = value.to_template_string();
            value.parse().map_err(|_| AuthError::InvalidTiming {
                provider: provider.to_string(),
                value,
            })
        }
    }
}

/// The credential a startup or request function produces: the token, or the first secret the scheme needs
fn computed_field(auth_type: AuthType) -> Option<CredentialField> {
    let required = auth_type.required_fields();
    required
        .iter()
        .find(|field| **field == CredentialField::Token)
        .or_else(|| required.iter().find(|field| field.is_secret()))
        .copied()
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn item(yaml: &str) -> Value {
        Value::from_yaml_str(yaml).unwrap()
    }

    fn resolver(vars: &[(&str, &str)]) -> AuthResolver {
        AuthResolver::new(
            EnvChainResolver::from_vars(vars.iter().copied()),
            AuthComputeRegistry::new(),
        )
    }

    #[tokio::test]
    async fn bearer_from_primary_variable() {
        let auth = resolver(&[("TOKEN_X", "t0k")])
            .resolve("api", &item("endpoint_api_key: TOKEN_X"), None)
            .await
            .unwrap();

        assert_eq!(auth.auth_type, AuthType::Bearer);
        assert_eq!(auth.credentials.token.as_deref(), Some("t0k"));
        assert_eq!(auth.credentials.header_name.as_deref(), Some("Authorization"));
        assert_eq!(
            auth.resolution.sources.get(&CredentialField::Token),
            Some(&FieldSource::Env {
                variable: "TOKEN_X".into()
            })
        );
    }

    #[tokio::test]
    async fn missing_bearer_token_lists_tried_variables() {
        let error = resolver(&[])
            .resolve("api", &item("endpoint_api_key: TOKEN_X"), None)
            .await
            .unwrap_err();

        match error {
            AuthError::MissingCredential {
                provider,
                field,
                tried,
            } => {
                assert_eq!(provider, "api");
                assert_eq!(field.as_str(), "token");
                assert_eq!(tried, ["TOKEN_X"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn overwrite_chain_precedes_primary() {
        let provider = item(
            r#"
            endpoint_auth_type: basic_token
            env_username: GH_USER
            endpoint_api_key: GH_TOKEN
            overwrite_from_env:
              endpoint_api_key: [GH_TOKEN_CI, GH_TOKEN_LOCAL]
            "#,
        );

        let auth = resolver(&[
            ("GH_USER", "ada"),
            ("GH_TOKEN", "primary"),
            ("GH_TOKEN_LOCAL", "local"),
        ])
        .resolve("github", &provider, None)
        .await
        .unwrap();

        assert_eq!(auth.credentials.username.as_deref(), Some("ada"));
        assert_eq!(auth.credentials.token.as_deref(), Some("local"));
        assert_eq!(
            auth.resolution.sources.get(&CredentialField::Token),
            Some(&FieldSource::Env {
                variable: "GH_TOKEN_LOCAL".into()
            })
        );
    }

    #[tokio::test]
    async fn empty_value_is_missing() {
        let error = resolver(&[("PW", "")])
            .resolve(
                "db",
                &item("{ endpoint_auth_type: basic, env_username: U, env_password: PW }"),
                None,
            )
            .await
            .unwrap_err();

        // username is checked first
        assert!(matches!(
            error,
            AuthError::MissingCredential { field: CredentialField::Username, .. }
        ));

        let error = resolver(&[("U", "u"), ("PW", "")])
            .resolve(
                "db",
                &item("{ endpoint_auth_type: basic, env_username: U, env_password: PW }"),
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(
            error,
            AuthError::MissingCredential { field: CredentialField::Password, tried, .. } if tried == ["PW"]
        ));
    }

    #[tokio::test]
    async fn invalid_declarations() {
        let auth = resolver(&[]);

        assert!(matches!(
            auth.resolve("x", &item("endpoint_auth_type: kerberos"), None).await,
            Err(AuthError::InvalidAuthType { auth_type, .. }) if auth_type == "kerberos"
        ));
        assert!(matches!(
            auth.resolve("x", &item("endpoint_auth_token_resolver: sometimes"), None).await,
            Err(AuthError::InvalidTiming { value, .. }) if value == "sometimes"
        ));
        assert!(matches!(
            auth.resolve("x", &item("endpoint_auth_type: none"), None).await,
            Ok(AuthDescriptor { auth_type: AuthType::None, .. })
        ));
    }

    #[tokio::test]
    async fn custom_header_needs_a_name() {
        let auth = resolver(&[("KEY", "k")]);

        assert!(matches!(
            auth.resolve("x", &item("{ endpoint_auth_type: custom, endpoint_api_key: KEY }"), None)
                .await,
            Err(AuthError::MissingHeaderName { .. })
        ));

        let descriptor = auth
            .resolve(
                "x",
                &item("{ endpoint_auth_type: custom_header, endpoint_api_key: KEY, api_auth_header_name: X-Token }"),
                None,
            )
            .await
            .unwrap();
        assert_eq!(descriptor.credentials.header_name.as_deref(), Some("X-Token"));
        assert_eq!(descriptor.credentials.header_value.as_deref(), Some("k"));
    }

    #[tokio::test]
    async fn startup_tokens_are_computed_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let mut compute = AuthComputeRegistry::new();
        compute.register_startup("vault", move |item: Value| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                anyhow::Ok(format!(
                    "token-for-{}",
                    item.get("role").and_then(Value::as_str).unwrap_or("none")
                ))
            }
        });
        let auth = AuthResolver::new(EnvChainResolver::from_vars([("A", "a")]), compute);
        let provider = item("{ endpoint_auth_token_resolver: startup, role: reader }");

        for _ in 0..3 {
            let descriptor = auth.resolve("vault", &provider, None).await.unwrap();
            assert_eq!(descriptor.credentials.token.as_deref(), Some("token-for-reader"));
            assert_eq!(descriptor.resolution.timing, ResolutionTiming::Startup);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn startup_failures() {
        let mut compute = AuthComputeRegistry::new();
        compute.register_startup("broken", |_| async {
            Err::<String, _>(anyhow::anyhow!("vault sealed"))
        });
        let auth = AuthResolver::new(EnvChainResolver::from_vars([("A", "a")]), compute);
        let provider = item("endpoint_auth_token_resolver: startup");

        assert!(matches!(
            auth.resolve("unknown", &provider, None).await,
            Err(AuthError::ComputeFunctionNotFound { timing: ResolutionTiming::Startup, .. })
        ));
        let error = auth.resolve("broken", &provider, None).await.unwrap_err();
        assert!(matches!(error, AuthError::ComputeFunctionFailed { .. }));
        assert!(error.to_string().contains("vault sealed"));
    }

    #[tokio::test]
    async fn empty_computed_tokens_name_the_function() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let mut compute = AuthComputeRegistry::new();
        compute.register_startup("vault", move |_| {
            let counter = counter.clone();
            async move {
                match counter.fetch_add(1, Ordering::SeqCst) {
                    0 => anyhow::Ok(String::new()),
                    _ => anyhow::Ok("late".to_string()),
                }
            }
        });
        compute.register_request("session", |_| async { anyhow::Ok(String::new()) });
        let auth = AuthResolver::new(EnvChainResolver::from_vars([("A", "a")]), compute);

        let startup = item("endpoint_auth_token_resolver: startup");
        let error = auth.resolve("vault", &startup, None).await.unwrap_err();
        assert!(matches!(&error, AuthError::ComputeFunctionFailed { provider, .. } if provider == "vault"));
        assert_eq!(
            error.to_string(),
            "compute function failed for provider 'vault': startup compute function returned an empty token"
        );

        // the empty result was not cached
        let descriptor = auth.resolve("vault", &startup, None).await.unwrap();
        assert_eq!(descriptor.credentials.token.as_deref(), Some("late"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        let request = RequestContext::new();
        let error = auth
            .resolve("session", &item("endpoint_auth_token_resolver: request"), Some(&request))
            .await
            .unwrap_err();
        assert!(error.to_string().ends_with("request compute function returned an empty token"));
    }

    #[tokio::test]
    async fn request_tokens_are_never_cached() {
        let mut compute = AuthComputeRegistry::new();
        compute.register_request("session", |request: RequestContext| async move {
            request
                .get_header("x-session")
                .map(str::to_string)
                .ok_or_else(|| anyhow::anyhow!("no session header"))
        });
        let auth = AuthResolver::new(EnvChainResolver::from_vars([("A", "a")]), compute);
        let provider = item("endpoint_auth_token_resolver: request");

        for session in ["one", "two"] {
            let request = RequestContext::new().header("X-Session", session);
            let descriptor = auth.resolve("session", &provider, Some(&request)).await.unwrap();
            assert_eq!(descriptor.credentials.token.as_deref(), Some(session));
            assert_eq!(
                descriptor.resolution.sources.get(&CredentialField::Token),
                Some(&FieldSource::Request)
            );
        }

        assert!(matches!(
            auth.resolve("session", &provider, None).await,
            Err(AuthError::RequestContextRequired { .. })
        ));
    }

    #[tokio::test]
    async fn warm_startup_visits_startup_providers() {
        let store = crate::documents! {
            "providers.yaml" => r#"
                providers:
                  vault: { endpoint_auth_token_resolver: startup }
                  plain: { endpoint_api_key: TOKEN }
            "#
        };
        let mut compute = AuthComputeRegistry::new();
        compute.register_startup("vault", |_| async { anyhow::Ok("v".to_string()) });
        let auth = AuthResolver::new(EnvChainResolver::from_vars([("A", "a")]), compute);

        assert_eq!(auth.warm_startup(&store).await.unwrap(), ["vault"]);
    }

    #[tokio::test]
    async fn serialized_descriptor_redacts_secrets() {
        let descriptor = resolver(&[("U", "ada"), ("P", "hunter2")])
            .resolve(
                "db",
                &item("{ endpoint_auth_type: basic, env_username: U, env_password: P }"),
                None,
            )
            .await
            .unwrap();

        insta::assert_json_snapshot!(descriptor, @r###"
        {
          "auth_type": "basic",
          "provider_name": "db",
          "credentials": {
            "username": "ada",
            "password": "***",
            "header_name": "Authorization"
          },
          "resolution": {
            "timing": "static",
            "sources": {
              "username": {
                "kind": "env",
                "variable": "U"
              },
              "password": {
                "kind": "env",
                "variable": "P"
              }
            }
          }
        }
        "###);
    }
}
