//! End to end resolution
//!
//! Loads the documents in tests/fixtures/ and resolves items through the public api.

use pretty_assertions::assert_eq;
use std::path::PathBuf;
use std::sync::Arc;
use strata::computed::ComputedRegistry;
use strata::documents::{DocumentStore, LoadError, LoadSpec};
use strata::env::{EnvChainResolver, MapEnv};
use strata::factory::ConfigFactory;
use strata::proxy::ProxySource;
use strata::section::SectionResolver;
use strata::value::Value;

fn fixtures() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn load(environment: &str) -> DocumentStore {
    let spec = LoadSpec::new(["base.yml", "server.{APP_ENV}.yaml"])
        .base_dir(fixtures())
        .environment(environment);

    let mut store = DocumentStore::new();
    store
        .load_with_env(&spec, &MapEnv::default())
        .expect("fixtures must load");
    store
}

fn env(vars: &[(&str, &str)]) -> EnvChainResolver {
    EnvChainResolver::from_vars(vars.iter().copied())
}

#[test]
fn environment_documents_replace_arrays() {
    let store = load("PROD");

    assert_eq!(store.active_environment(), Some("prod"));
    insta::assert_json_snapshot!(store.get("server"), @r###"
    {
      "host": "app.internal",
      "ports": [
        8080,
        8081
      ],
      "cors": {
        "origins": [
          "https://inventory.example.com"
        ]
      }
    }
    "###);

    let dev = load("dev");
    assert_eq!(
        dev.get_nested(&["server", "ports"]),
        Some(&Value::from(vec![3000_i64, 3001]))
    );
    assert_eq!(
        dev.get_nested(&["server", "host"]),
        Some(&Value::from("0.0.0.0"))
    );
}

#[test]
fn load_result_lists_merge_order() {
    let store = load("prod");
    let result = store.load_result().expect("loaded");

    let names: Vec<_> = result
        .merge_order
        .iter()
        .filter_map(|path| path.file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, ["base.yml", "server.prod.yaml"]);
    assert!(result.errors.is_empty());
}

#[test]
fn missing_and_broken_files_are_fatal() {
    let mut store = DocumentStore::new();
    let error = store
        .load_with_env(
            &LoadSpec::new(["base.yml", "missing.yaml"]).base_dir(fixtures()),
            &MapEnv::default(),
        )
        .unwrap_err();
    assert!(matches!(error, LoadError::FileNotFound { .. }));
    assert!(!store.is_initialized());

    let error = store
        .load_with_env(
            &LoadSpec::new(["broken.yaml"]).base_dir(fixtures()),
            &MapEnv::default(),
        )
        .unwrap_err();
    assert!(matches!(error, LoadError::Parse { .. }));
    assert!(!store.is_initialized());
}

#[test]
fn service_chains() {
    let store = load("prod");
    let services = SectionResolver::services(
        &store,
        env(&[("SEARCH_URL", "http://search:9200"), ("SEARCH_KEY", "k")]),
    );

    insta::assert_json_snapshot!(services.get("search", None).unwrap(), @r###"
    {
      "name": "search",
      "config": {
        "url": "http://search:9200",
        "api_key": "k"
      },
      "env_overwrites": [
        "url",
        "api_key"
      ],
      "resolution_sources": {
        "url": {
          "kind": "env_overwrite",
          "env_var": "SEARCH_URL"
        },
        "api_key": {
          "kind": "env_fallback",
          "env_var": "SEARCH_KEY"
        }
      },
      "global_merged": false
    }
    "###);
}

#[test]
fn storage_per_property_keys() {
    let store = load("dev");
    let storage = SectionResolver::storage(&store, env(&[("REDIS_HOST", "redis"), ("CACHE_PORT", "6380")]));

    let cache = storage.get("cache", None).unwrap();
    assert_eq!(
        cache.config,
        Value::from_yaml_str("{ host: localhost, port: '6380' }").unwrap()
    );
}

#[test]
fn provider_fallbacks_and_global_settings() {
    let store = load("dev");
    let providers = SectionResolver::providers(&store, env(&[("LEGACY_URL_OLD", "http://old")]));

    let legacy = providers.get("legacy", None).unwrap();
    assert!(legacy.global_merged);
    assert_eq!(legacy.config.get("base_url"), Some(&Value::from("http://old")));
    assert_eq!(legacy.config.get("timeout_seconds"), Some(&Value::Integer(30)));
    assert_eq!(legacy.config.get("fallbacks_from_env"), None);
}

#[test]
fn proxy_precedence() {
    let store = Arc::new(load("prod"));

    let factory = ConfigFactory::new(store.clone(), env(&[("HTTPS_PROXY", "http://corp:8443")]));
    let github = factory.compute_proxy("providers.github", None, None).unwrap();
    assert_eq!(github.resolved_url.as_deref(), Some("http://gp:3128"));
    assert_eq!(github.source, ProxySource::GlobalFallback);

    let jira = factory.compute_proxy("providers.jira", None, None).unwrap();
    assert_eq!(jira.resolved_url, None);
    assert_eq!(jira.source, ProxySource::Disabled);

    let legacy = factory.compute_proxy("providers.legacy", None, None).unwrap();
    assert_eq!(legacy.resolved_url.as_deref(), Some("http://corp:8443"));
    assert_eq!(legacy.source, ProxySource::EnvProxy);

    let factory = ConfigFactory::new(store, env(&[("JIRA_PROXY", "http://x")]));
    insta::assert_json_snapshot!(factory.compute_proxy("providers.jira", None, None).unwrap(), @r###"
    {
      "resolved_url": "http://x",
      "source": "env_overwrite",
      "env_var_used": "JIRA_PROXY",
      "raw_item_value": false,
      "global_fallback_value": "http://gp:3128",
      "active_environment": "prod"
    }
    "###);
}

#[tokio::test]
async fn compute_all_for_a_provider() {
    let factory = ConfigFactory::new(
        Arc::new(load("prod")),
        env(&[("GITHUB_TOKEN", "primary"), ("GITHUB_TOKEN_CI", "ci")]),
    );

    let result = factory
        .compute_all("providers.github", None, None)
        .await
        .unwrap();

    let auth = result.auth.expect("auth resolves");
    assert_eq!(auth.credentials.token.as_deref(), Some("ci"));
    assert_eq!(
        result
            .headers
            .expect("headers requested")
            .get("Authorization")
            .map(String::as_str),
        Some("Bearer ci")
    );

    let config = result.config.expect("config requested");
    assert_eq!(
        config.get("base_url"),
        Some(&Value::from("https://github.example.com/api/v3"))
    );
    assert_eq!(
        config.get("user_agent"),
        Some(&Value::from("inventory/2.4.0 (prod)"))
    );
}

#[tokio::test]
async fn missing_credentials_name_every_variable() {
    let factory = ConfigFactory::new(Arc::new(load("dev")), env(&[("JIRA_EMAIL", "a@b.c")]));

    let result = factory.compute_all("providers.jira", None, None).await.unwrap();
    assert_eq!(
        result.auth_error.map(|error| error.to_string()).as_deref(),
        Some("missing credential 'token' for provider 'jira', tried: [JIRA_TOKEN]")
    );
}

#[tokio::test]
async fn exposed_auth_and_computed_values() {
    let store = Arc::new(load("prod"));
    let factory = Arc::new(ConfigFactory::new(store.clone(), env(&[("GITHUB_TOKEN", "t")])));
    let registry = ComputedRegistry::new(store);

    registry.register_sync("proxy_url", |store| {
        let environment = store.active_environment().unwrap_or("dev").to_string();
        Ok(store
            .get_nested(&["global", "network", "proxy_urls", environment.as_str()])
            .cloned()
            .unwrap_or_default())
    });
    assert_eq!(factory.register_exposed_auth(&registry), ["auth:providers.github"]);

    assert_eq!(
        registry.get_computed("proxy_url").await.unwrap(),
        Value::from("http://gp:3128")
    );

    let auth = registry.get_computed("auth:providers.github").await.unwrap();
    assert_eq!(
        auth.get_path(&["auth", "auth_type"]),
        Some(&Value::from("bearer"))
    );
    assert_eq!(
        auth.get_path(&["auth", "credentials", "token"]),
        Some(&Value::from("***"))
    );
}
