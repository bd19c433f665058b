//! runtime configuration for a single item
//!
//! [ConfigFactory] combines the resolvers for one item addressed as `<type>.<name>`, where type is one of
//! `providers`, `services` or `storages` (the latter reads the `storage` section):
//!
//! - the auth descriptor and, optionally, its headers
//! - the proxy resolution
//! - the network settings
//! - the resolved item, with its `overwrite_from_context` templates applied on top
use crate::auth::{encode_headers, AuthComputeRegistry, AuthDescriptor, AuthError, AuthResolver};
use crate::computed::ComputedRegistry;
use crate::context::{ContextFunctions, RequestContext, TemplateContext};
use crate::documents::{DocumentStore, DEFAULT_ENVIRONMENT};
use crate::env::EnvChainResolver;
use crate::proxy::{NetworkConfig, ProxyOverride, ProxyResolution, ProxyResolver};
use crate::section::{SectionError, SectionResolver, SectionSpec, CONTEXT_OVERWRITE_KEY};
use crate::template::{self, TemplateError};
use crate::value::Value;
use indexmap::IndexMap;
use std::sync::Arc;

/// Top-level map listing the items whose auth is exposed as computed values
pub const EXPOSE_AUTH_KEY: &str = "expose_yaml_config_compute_auth";

#[derive(thiserror::Error, Debug, Clone)]
pub enum FactoryError {
    #[error("invalid config path '{path}': {reason}")]
    InvalidPath { path: String, reason: &'static str },
    #[error(transparent)]
    Section(#[from] SectionError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Template(#[from] TemplateError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigKind {
    Providers,
    Services,
    #[serde(rename = "storage")]
    Storages,
}

impl ConfigKind {
    pub const ALL: [ConfigKind; 3] = [ConfigKind::Providers, ConfigKind::Services, ConfigKind::Storages];

    /// Name used in paths
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigKind::Providers => "providers",
            ConfigKind::Services => "services",
            ConfigKind::Storages => "storages",
        }
    }

    pub fn spec(&self) -> SectionSpec {
        match self {
            ConfigKind::Providers => SectionSpec::providers(),
            ConfigKind::Services => SectionSpec::services(),
            ConfigKind::Storages => SectionSpec::storage(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigPath {
    pub kind: ConfigKind,
    pub name: String,
}

impl ConfigPath {
    pub fn parse(path: &str) -> Result<Self, FactoryError> {
        let invalid = |reason| FactoryError::InvalidPath {
            path: path.to_string(),
            reason,
        };

        if path.is_empty() {
            return Err(invalid("path is empty"));
        }
        let Some((kind, name)) = path.split_once('.') else {
            return Err(invalid("expected '<type>.<name>'"));
        };
        if name.is_empty() || name.contains('.') {
            return Err(invalid("expected '<type>.<name>'"));
        }
        let kind = ConfigKind::ALL
            .into_iter()
            .find(|candidate| candidate.as_str() == kind)
            .ok_or_else(|| invalid("type must be providers, services or storages"))?;

        Ok(Self {
            kind,
            name: name.to_string(),
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct ComputeOptions {
    pub include_headers: bool,
    pub include_proxy: bool,
    pub include_network: bool,
    pub include_config: bool,
    /// Record auth failures in [ComputeResult::auth_error] instead of failing
    pub suppress_auth_errors: bool,
    /// Environment for the proxy lookup, defaults to the active one
    pub environment: Option<String>,
    pub proxy_override: Option<ProxyOverride>,
}

impl ComputeOptions {
    /// Everything included, auth errors suppressed
    pub fn all() -> Self {
        Self {
            include_headers: true,
            include_proxy: true,
            include_network: true,
            include_config: true,
            suppress_auth_errors: true,
            environment: None,
            proxy_override: None,
        }
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ComputeResult {
    pub config_type: ConfigKind,
    pub config_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth: Option<AuthDescriptor>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_error"
    )]
    pub auth_error: Option<AuthError>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_redacted_headers"
    )]
    pub headers: Option<IndexMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy: Option<ProxyResolution>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network: Option<NetworkConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<Value>,
}

fn serialize_error<S: serde::Serializer>(
    error: &Option<AuthError>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match error {
        Some(error) => serializer.serialize_str(&error.to_string()),
        None => serializer.serialize_none(),
    }
}

fn serialize_redacted_headers<S: serde::Serializer>(
    headers: &Option<IndexMap<String, String>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    use serde::ser::SerializeMap;

    match headers {
        Some(headers) => {
            let mut map = serializer.serialize_map(Some(headers.len()))?;
            for name in headers.keys() {
                map.serialize_entry(name, "***")?;
            }
            map.end()
        }
        None => serializer.serialize_none(),
    }
}

pub struct ConfigFactory {
    store: Arc<DocumentStore>,
    env: EnvChainResolver,
    auth: AuthResolver,
    proxy: ProxyResolver,
    functions: ContextFunctions,
    startup_context: TemplateContext,
}

impl ConfigFactory {
    pub fn new(store: Arc<DocumentStore>, env: EnvChainResolver) -> Self {
        Self {
            auth: AuthResolver::new(env.clone(), AuthComputeRegistry::new()),
            proxy: ProxyResolver::new(env.clone()),
            functions: ContextFunctions::new(),
            startup_context: TemplateContext::startup(&store, &env),
            store,
            env,
        }
    }

    pub fn with_auth_compute(mut self, compute: AuthComputeRegistry) -> Self {
        self.auth = AuthResolver::new(self.env.clone(), compute);
        self
    }

    pub fn with_functions(mut self, functions: ContextFunctions) -> Self {
        self.functions = functions;
        self
    }

    pub fn store(&self) -> &Arc<DocumentStore> {
        &self.store
    }

    pub fn auth(&self) -> &AuthResolver {
        &self.auth
    }

    pub fn section(&self, kind: ConfigKind) -> SectionResolver<'_> {
        SectionResolver::new(self.store.as_ref(), self.env.clone(), kind.spec())
    }

    fn raw_item(&self, path: &ConfigPath) -> Result<&Value, FactoryError> {
        if !self.store.is_initialized() {
            return Err(SectionError::NotInitialized.into());
        }
        let section = self.section(path.kind);
        section
            .raw(&path.name)
            .ok_or_else(|| (section.spec().not_found)(&path.name).into())
    }

    #[tracing::instrument(level = "debug", skip_all, fields(path = path))]
    pub async fn compute(
        &self,
        path: &str,
        options: &ComputeOptions,
        request: Option<&RequestContext>,
    ) -> Result<ComputeResult, FactoryError> {
        let parsed = ConfigPath::parse(path)?;
        let item = self.raw_item(&parsed)?;

        let auth = match self.compute_auth(&parsed.name, item, options.include_headers, request).await {
            Ok(auth) => Ok(auth),
            Err(error) if options.suppress_auth_errors => {
                tracing::warn!(error = %error, "auth resolution failed");
                Err(error)
            }
            Err(error) => return Err(error.into()),
        };
        let (auth, headers, auth_error) = match auth {
            Ok((descriptor, headers)) => (Some(descriptor), headers, None),
            Err(error) => (None, None, Some(error)),
        };

        let proxy = match options.include_proxy {
            true => Some(self.compute_proxy(
                path,
                options.environment.as_deref(),
                options.proxy_override.as_ref(),
            )?),
            false => None,
        };
        let network = options.include_network.then(|| self.compute_network());
        let config = match options.include_config {
            true => Some(self.compute_config(path, request)?),
            false => None,
        };

        Ok(ComputeResult {
            config_type: parsed.kind,
            config_name: parsed.name,
            auth,
            auth_error,
            headers,
            proxy,
            network,
            config,
        })
    }

    pub async fn compute_all(
        &self,
        path: &str,
        environment: Option<&str>,
        request: Option<&RequestContext>,
    ) -> Result<ComputeResult, FactoryError> {
        let options = ComputeOptions {
            environment: environment.map(str::to_string),
            ..ComputeOptions::all()
        };
        self.compute(path, &options, request).await
    }

    async fn compute_auth(
        &self,
        name: &str,
        item: &Value,
        include_headers: bool,
        request: Option<&RequestContext>,
    ) -> Result<(AuthDescriptor, Option<IndexMap<String, String>>), AuthError> {
        let descriptor = self.auth.resolve(name, item, request).await?;
        let headers = match include_headers {
            true => Some(encode_headers(&descriptor)?),
            false => None,
        };
        Ok((descriptor, headers))
    }

    /// Proxy for the item, read with its meta keys intact
    pub fn compute_proxy(
        &self,
        path: &str,
        environment: Option<&str>,
        proxy_override: Option<&ProxyOverride>,
    ) -> Result<ProxyResolution, FactoryError> {
        let parsed = ConfigPath::parse(path)?;
        let item = self.raw_item(&parsed)?;
        let environment = environment
            .or(self.store.active_environment())
            .unwrap_or(DEFAULT_ENVIRONMENT);

        Ok(self
            .proxy
            .resolve(item, &self.compute_network(), environment, proxy_override))
    }

    pub fn compute_network(&self) -> NetworkConfig {
        NetworkConfig::from_store(&self.store)
    }

    /// Resolved item with `overwrite_from_context` merged on top
    pub fn compute_config(
        &self,
        path: &str,
        request: Option<&RequestContext>,
    ) -> Result<Value, FactoryError> {
        let parsed = ConfigPath::parse(path)?;
        let section = self.section(parsed.kind);
        let mut config = section.get(&parsed.name, None)?.config;

        let overrides = section
            .raw(&parsed.name)
            .and_then(|item| item.get_present(CONTEXT_OVERWRITE_KEY));
        if let Some(overrides) = overrides {
            let mut overrides = overrides.clone();
            let context = self.startup_context.to_value(request);
            template::resolve_deep(&mut overrides, &context, &self.functions, request)?;
            config.deep_merge(overrides);
        }

        Ok(config)
    }

    /// Resolves placeholders in `text` against the template context
    pub fn render(
        &self,
        text: &str,
        request: Option<&RequestContext>,
    ) -> Result<String, FactoryError> {
        let context = self.startup_context.to_value(request);
        Ok(template::resolve(text, &context)?)
    }

    /// Registers `auth:<type>.<name>` for every item listed under `expose_yaml_config_compute_auth`
    ///
    /// ```yaml
    /// expose_yaml_config_compute_auth:
    ///   providers: [github, slack]
    /// ```
    ///
    /// Returns the registered keys.
    pub fn register_exposed_auth(self: &Arc<Self>, registry: &ComputedRegistry) -> Vec<String> {
        let Some(exposed) = self.store.get(EXPOSE_AUTH_KEY).and_then(Value::as_object) else {
            return Vec::new();
        };

        let mut keys = Vec::new();
        for kind in ConfigKind::ALL {
            let names = exposed
                .get(kind.as_str())
                .and_then(Value::as_array)
                .map(|names| {
                    names
                        .iter()
                        .filter_map(Value::as_str)
                        .map(str::to_string)
                        .collect::<Vec<_>>()
                })
                .unwrap_or_default();

            for name in names {
                let path = format!("{}.{}", kind.as_str(), name);
                let key = format!("auth:{path}");
                let factory = Arc::clone(self);

                registry.register(key.clone(), move |_| {
                    let factory = factory.clone();
                    let path = path.clone();
                    async move {
                        let result = factory
                            .compute(&path, &ComputeOptions::default(), None)
                            .await?;
                        anyhow::Ok(Value::from(serde_json::to_value(&result)?))
                    }
                });
                keys.push(key);
            }
        }

        tracing::debug!(count = keys.len(), "exposed auth registered");
        keys
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::auth::AuthType;
    use crate::documents;
    use crate::proxy::ProxySource;
    use pretty_assertions::assert_eq;

    fn factory() -> ConfigFactory {
        let store = documents! {
            env = "prod";
            "base.yaml" => r#"
                app: { name: svc, version: 1.0.0 }
                global:
                  timeout: 30
                  network:
                    default_environment: dev
                    proxy_urls: { dev: null, prod: "http://gp:3128" }
                providers:
                  github:
                    endpoint_auth_type: bearer
                    endpoint_api_key: GITHUB_TOKEN
                    base_url: https://api.github.com
                    proxy_url: null
                    overwrite_from_context:
                      user_agent: "{{app.name}}/{{app.version}}"
                      tenant: "{{request.headers.x-tenant|\"public\"}}"
                  internal:
                    endpoint_auth_type: none
                    proxy_url: false
                storage:
                  cache:
                    host: null
                    env_host_key: REDIS_HOST
                expose_yaml_config_compute_auth:
                  providers: [github]
            "#
        };

        ConfigFactory::new(
            Arc::new(store),
            EnvChainResolver::from_vars([("GITHUB_TOKEN", "ghp"), ("REDIS_HOST", "redis.local")]),
        )
    }

    #[test]
    fn parses_paths() {
        assert_eq!(
            ConfigPath::parse("storages.cache").unwrap(),
            ConfigPath {
                kind: ConfigKind::Storages,
                name: "cache".into()
            }
        );
        for invalid in ["", "providers", "providers.a.b", "providers.", "widgets.a"] {
            assert!(
                matches!(ConfigPath::parse(invalid), Err(FactoryError::InvalidPath { .. })),
                "{invalid}"
            );
        }
    }

    #[tokio::test]
    async fn computes_everything_for_a_provider() {
        let factory = factory();
        let request = RequestContext::new().header("X-Tenant", "acme");

        let result = factory
            .compute_all("providers.github", None, Some(&request))
            .await
            .unwrap();

        let auth = result.auth.unwrap();
        assert_eq!(auth.auth_type, AuthType::Bearer);
        assert_eq!(
            result.headers.unwrap().get("Authorization").map(String::as_str),
            Some("Bearer ghp")
        );

        let proxy = result.proxy.unwrap();
        assert_eq!(proxy.resolved_url.as_deref(), Some("http://gp:3128"));
        assert_eq!(proxy.source, ProxySource::GlobalFallback);

        assert_eq!(result.network.unwrap().default_environment, "dev");

        let config = result.config.unwrap();
        assert_eq!(config.get("timeout"), Some(&Value::Integer(30)));
        assert_eq!(config.get("user_agent"), Some(&Value::from("svc/1.0.0")));
        assert_eq!(config.get("tenant"), Some(&Value::from("acme")));
        assert_eq!(config.get("overwrite_from_context"), None);
    }

    #[test]
    fn template_defaults_without_request() {
        let config = factory().compute_config("providers.github", None).unwrap();
        assert_eq!(config.get("tenant"), Some(&Value::from("public")));
    }

    #[tokio::test]
    async fn auth_errors_fail_unless_suppressed() {
        let factory = factory();

        // storage items declare no auth and default to bearer without a token variable
        let error = factory
            .compute("storages.cache", &ComputeOptions::default(), None)
            .await
            .unwrap_err();
        assert!(matches!(error, FactoryError::Auth(AuthError::MissingCredential { .. })));

        let result = factory.compute_all("storages.cache", None, None).await.unwrap();
        assert!(result.auth.is_none());
        assert!(result.auth_error.is_some());
        assert_eq!(
            result.config.unwrap().get("host"),
            Some(&Value::from("redis.local"))
        );
    }

    #[tokio::test]
    async fn proxy_environment_and_override() {
        let factory = factory();

        let dev = factory
            .compute_proxy("providers.github", Some("dev"), None)
            .unwrap();
        assert_eq!(dev.resolved_url, None);
        assert_eq!(dev.active_environment, "dev");

        let disabled = factory
            .compute_proxy("providers.internal", None, None)
            .unwrap();
        assert_eq!(disabled.source, ProxySource::Disabled);

        let forced = factory
            .compute_proxy(
                "providers.internal",
                None,
                Some(&ProxyOverride::Url("http://forced:1".into())),
            )
            .unwrap();
        assert_eq!(forced.resolved_url.as_deref(), Some("http://forced:1"));
    }

    #[tokio::test]
    async fn unknown_items() {
        let error = factory()
            .compute("providers.gitlab", &ComputeOptions::default(), None)
            .await
            .unwrap_err();
        assert!(matches!(
            error,
            FactoryError::Section(SectionError::ProviderNotFound(name)) if name == "gitlab"
        ));
    }

    #[test]
    fn renders_templates() {
        assert_eq!(
            factory().render("{{app.name}} in {{app.environment}}", None).unwrap(),
            "svc in prod"
        );
    }

    #[tokio::test]
    async fn exposes_auth_as_computed_values() {
        let factory = Arc::new(factory());
        let registry = ComputedRegistry::new(factory.store().clone());

        assert_eq!(factory.register_exposed_auth(&registry), ["auth:providers.github"]);

        let value = registry.get_computed("auth:providers.github").await.unwrap();
        assert_eq!(
            value.get_path(&["auth", "credentials", "token"]),
            Some(&Value::from("***"))
        );
        assert_eq!(value.get("config_type"), Some(&Value::from("providers")));
    }
}
