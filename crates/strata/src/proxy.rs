//! proxy url resolution
//!
//! [ProxyResolver::resolve] picks the proxy for one item. Highest precedence first:
//!
//! | # | condition                                          | result                              | source            |
//! |---|----------------------------------------------------|-------------------------------------|-------------------|
//! | 1 | caller override `false`                            | no proxy                            | `disabled`        |
//! | 2 | caller override is a non-empty string              | that string                         | `caller_override` |
//! | 3 | `overwrite_from_env.proxy_url` names a set variable | its value                           | `env_overwrite`   |
//! | 4 | `proxy_url: false`                                 | no proxy                            | `disabled`        |
//! | 5 | `proxy_url` null or missing                        | `proxy_urls[<environment>]`         | `global_fallback` |
//! | 6 | `proxy_url: true`                                  | `HTTPS_PROXY`, ..., `http_proxy`    | `env_proxy`       |
//! | 7 | `proxy_url` is a non-empty string                  | that string                         | `provider_direct` |
//! | 8 | anything else                                      | same as 5                           | `global_fallback` |
//!
//! [ProxyResolver::resolve_agent] picks the process-wide proxy from the network settings instead.
use crate::documents::DocumentStore;
use crate::env::{chain_names, ChainOutcome, EnvChainResolver};
use crate::section::{GLOBAL_KEY, OVERWRITE_KEY};
use crate::value::Value;
use indexmap::IndexMap;

pub const PROXY_PROPERTY: &str = "proxy_url";

const SECURE_PROXY_VARIABLES: [&str; 2] = ["HTTPS_PROXY", "https_proxy"];
const PROXY_VARIABLES: [&str; 2] = ["HTTP_PROXY", "http_proxy"];

/// Explicit choice of the caller, taking precedence over everything in the documents
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProxyOverride {
    Disabled,
    Url(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProxySource {
    Disabled,
    CallerOverride,
    EnvOverwrite,
    ProviderDirect,
    EnvProxy,
    GlobalFallback,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ProxyResolution {
    pub resolved_url: Option<String>,
    pub source: ProxySource,
    pub env_var_used: Option<String>,
    /// `proxy_url` as written on the item, `None` when the key is missing
    pub raw_item_value: Option<Value>,
    pub global_fallback_value: Option<String>,
    pub active_environment: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct AgentProxy {
    pub http_proxy: Option<String>,
    pub https_proxy: Option<String>,
}

/// `global.network`
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct NetworkConfig {
    pub default_environment: String,
    pub proxy_urls: IndexMap<String, Option<String>>,
    pub agent_proxy: Option<AgentProxy>,
    pub ca_bundle: Option<String>,
    pub cert: Option<String>,
    pub cert_verify: bool,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            default_environment: crate::documents::DEFAULT_ENVIRONMENT.to_string(),
            proxy_urls: IndexMap::new(),
            agent_proxy: None,
            ca_bundle: None,
            cert: None,
            cert_verify: false,
        }
    }
}

impl NetworkConfig {
    pub fn from_store(store: &DocumentStore) -> Self {
        store
            .get_nested(&[GLOBAL_KEY, "network"])
            .map(Self::from_value)
            .unwrap_or_default()
    }

    /// Reads the settings, ignoring keys of unexpected type
    pub fn from_value(value: &Value) -> Self {
        let string = |value: Option<&Value>| value.and_then(Value::as_str).map(str::to_string);
        let defaults = Self::default();

        Self {
            default_environment: string(value.get("default_environment"))
                .unwrap_or(defaults.default_environment),
            proxy_urls: value
                .get("proxy_urls")
                .and_then(Value::as_object)
                .map(|urls| {
                    urls.iter()
                        .map(|(environment, url)| (environment.clone(), string(Some(url))))
                        .collect()
                })
                .unwrap_or_default(),
            agent_proxy: value
                .get("agent_proxy")
                .filter(|agent| agent.as_object().is_some())
                .map(|agent| AgentProxy {
                    http_proxy: string(agent.get("http_proxy")),
                    https_proxy: string(agent.get("https_proxy")),
                }),
            ca_bundle: string(value.get("ca_bundle")),
            cert: string(value.get("cert")),
            cert_verify: value
                .get("cert_verify")
                .and_then(Value::as_bool)
                .unwrap_or(defaults.cert_verify),
        }
    }

    pub fn proxy_url_for(&self, environment: &str) -> Option<&str> {
        self.proxy_urls.get(environment)?.as_deref()
    }
}

#[derive(Debug, Clone, Default, derive_new::new)]
pub struct ProxyResolver {
    env: EnvChainResolver,
}

impl ProxyResolver {
    #[tracing::instrument(level = "trace", skip_all, fields(environment = active_environment))]
    pub fn resolve(
        &self,
        item: &Value,
        network: &NetworkConfig,
        active_environment: &str,
        caller_override: Option<&ProxyOverride>,
    ) -> ProxyResolution {
        let raw_item_value = item.get(PROXY_PROPERTY).cloned();
        let global_fallback_value = network.proxy_url_for(active_environment).map(str::to_string);

        let resolution = |resolved_url: Option<String>, source, env_var_used| ProxyResolution {
            resolved_url,
            source,
            env_var_used,
            raw_item_value: raw_item_value.clone(),
            global_fallback_value: global_fallback_value.clone(),
            active_environment: active_environment.to_string(),
        };

        match caller_override {
            Some(ProxyOverride::Disabled) => return resolution(None, ProxySource::Disabled, None),
            Some(ProxyOverride::Url(url)) if !url.is_empty() => {
                return resolution(Some(url.clone()), ProxySource::CallerOverride, None)
            }
            _ => {}
        }

        let chain = item
            .get_path(&[OVERWRITE_KEY, PROXY_PROPERTY])
            .map(chain_names)
            .unwrap_or_default();
        if let ChainOutcome::Matched { value, name } = self.env.try_chain(&chain) {
            return resolution(Some(value), ProxySource::EnvOverwrite, Some(name));
        }

        let resolved = match &raw_item_value {
            Some(Value::Boolean(false)) => resolution(None, ProxySource::Disabled, None),
            Some(Value::Boolean(true)) => {
                match self
                    .env
                    .non_empty(&SECURE_PROXY_VARIABLES)
                    .or_else(|| self.env.non_empty(&PROXY_VARIABLES))
                {
                    Some((url, name)) => resolution(Some(url), ProxySource::EnvProxy, Some(name)),
                    None => resolution(None, ProxySource::EnvProxy, None),
                }
            }
            Some(Value::String(url)) if !url.is_empty() => {
                resolution(Some(url.clone()), ProxySource::ProviderDirect, None)
            }
            _ => resolution(
                global_fallback_value.clone(),
                ProxySource::GlobalFallback,
                None,
            ),
        };

        tracing::debug!(source = ?resolved.source, "proxy resolved");
        resolved
    }

    /// Process-wide proxy
    ///
    /// Override, agent proxy (https, then http), `proxy_urls[default_environment]`, then `PROXY_URL`,
    /// `HTTPS_PROXY` and `HTTP_PROXY`.
    pub fn resolve_agent(
        &self,
        network: Option<&NetworkConfig>,
        caller_override: Option<&ProxyOverride>,
    ) -> Option<String> {
        match caller_override {
            Some(ProxyOverride::Disabled) => return None,
            Some(ProxyOverride::Url(url)) => return Some(url.clone()),
            None => {}
        }

        if let Some(network) = network {
            if let Some(agent) = &network.agent_proxy {
                if let Some(url) = agent.https_proxy.as_ref().or(agent.http_proxy.as_ref()) {
                    return Some(url.clone());
                }
            }
            if let Some(url) = network.proxy_url_for(&network.default_environment) {
                return Some(url.to_string());
            }
        }

        self.env
            .non_empty(&["PROXY_URL", "HTTPS_PROXY", "HTTP_PROXY"])
            .map(|(url, _)| url)
    }
}
