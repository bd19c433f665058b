//! per-item resolution of configuration sections
//!
//! A section is a top-level map of named items, e.g. `providers`. Items may carry meta keys that name
//! environment variables to consult for properties without an explicit value. How those meta keys are laid out is
//! described by a [MetaKeyPattern]:
//!
//! ```yaml
//! providers:                       # grouped
//!   github:
//!     token: null
//!     overwrite_from_env: { token: [GH_TOKEN_OVERRIDE] }
//!     fallbacks_from_env: { token: [GITHUB_TOKEN, GH_TOKEN] }
//!
//! storage:                         # per-property
//!   cache:
//!     host: null
//!     env_host_key: REDIS_HOST
//!     env_host_key_fallbacks: [CACHE_HOST]
//! ```
//!
//! An explicit (non-null) value always wins. Otherwise the overwrite chain is tried, then the fallback chain. The
//! first variable that is *set* wins, even when it is empty.
use crate::documents::DocumentStore;
use crate::env::{chain_names, ChainOutcome, EnvChainResolver};
use crate::value::{Object, Value};
use indexmap::IndexMap;
use regex::Regex;

pub const OVERWRITE_KEY: &str = "overwrite_from_env";
pub const FALLBACK_KEY: &str = "fallbacks_from_env";
pub const CONTEXT_OVERWRITE_KEY: &str = "overwrite_from_context";
pub const GLOBAL_KEY: &str = "global";

/// Default naming for [MetaKeyPattern::PerProperty]: `env_<prop>_key` and `env_<prop>_key_fallbacks`
pub const PER_PROPERTY_NAMING: &str = r"^env_(.+)_key(_fallbacks)?$";

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum SectionError {
    #[error("configuration is not loaded")]
    NotInitialized,
    #[error("provider '{0}' not found")]
    ProviderNotFound(String),
    #[error("service '{0}' not found")]
    ServiceNotFound(String),
    #[error("storage '{0}' not found")]
    StorageNotFound(String),
    #[error("{section} item '{name}' not found")]
    ItemNotFound { section: String, name: String },
    #[error("{section} item '{name}' must be a mapping, found {found}")]
    InvalidItem {
        section: String,
        name: String,
        found: &'static str,
    },
}

/// How environment chain annotations are embedded in an item
#[derive(Debug, Clone)]
pub enum MetaKeyPattern {
    /// Two sibling maps of property -> chain
    Grouped {
        overwrite_key: String,
        fallback_key: String,
    },
    /// One sibling map of property -> chain, used as overwrite chains
    Single { key: String },
    /// One key per property and chain kind
    ///
    /// Capture group 1 is the property name, a match of capture group 2 marks a fallback chain.
    PerProperty { naming: Regex },
}

impl MetaKeyPattern {
    pub fn grouped() -> Self {
        MetaKeyPattern::Grouped {
            overwrite_key: OVERWRITE_KEY.to_string(),
            fallback_key: FALLBACK_KEY.to_string(),
        }
    }

    pub fn single(key: impl Into<String>) -> Self {
        MetaKeyPattern::Single { key: key.into() }
    }

    pub fn per_property() -> Self {
        Self::per_property_with(PER_PROPERTY_NAMING)
            .expect("default per-property naming is a valid regex")
    }

    pub fn per_property_with(naming: &str) -> Result<Self, regex::Error> {
        Ok(MetaKeyPattern::PerProperty {
            naming: Regex::new(naming)?,
        })
    }

    fn is_meta_key(&self, key: &str) -> bool {
        match self {
            MetaKeyPattern::Grouped {
                overwrite_key,
                fallback_key,
            } => key == overwrite_key || key == fallback_key,
            MetaKeyPattern::Single { key: meta } => key == meta,
            MetaKeyPattern::PerProperty { naming } => naming.is_match(key),
        }
    }

    /// property -> chains, in document order
    fn extract(&self, item: &Object) -> IndexMap<String, Chains> {
        let mut chains: IndexMap<String, Chains> = IndexMap::new();

        let mut add_map = |declarations: Option<&Value>, fallback: bool| {
            let Some(declarations) = declarations.and_then(Value::as_object) else {
                return;
            };
            for (property, declaration) in declarations {
                chains
                    .entry(property.clone())
                    .or_default()
                    .push(fallback, chain_names(declaration));
            }
        };

        match self {
            MetaKeyPattern::Grouped {
                overwrite_key,
                fallback_key,
            } => {
                add_map(item.get(overwrite_key), false);
                add_map(item.get(fallback_key), true);
            }
            MetaKeyPattern::Single { key } => add_map(item.get(key), false),
            MetaKeyPattern::PerProperty { naming } => {
                for (key, declaration) in item {
                    let Some(captures) = naming.captures(key) else {
                        continue;
                    };
                    let Some(property) = captures.get(1) else {
                        continue;
                    };
                    chains
                        .entry(property.as_str().to_string())
                        .or_default()
                        .push(captures.get(2).is_some(), chain_names(declaration));
                }
            }
        }

        chains
    }
}

#[derive(Debug, Default)]
struct Chains {
    overwrite: Vec<String>,
    fallback: Vec<String>,
}

impl Chains {
    fn push(&mut self, fallback: bool, names: Vec<String>) {
        if fallback {
            self.fallback.extend(names)
        } else {
            self.overwrite.extend(names)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolveOptions {
    pub apply_env_overwrites: bool,
    pub apply_fallbacks: bool,
    pub remove_meta_keys: bool,
    /// Merge the section's global map beneath the item, if the section has one
    pub merge_global: bool,
    /// Replaces the item's overwrite declarations
    pub overwrite_from_env: Option<Value>,
    /// Replaces the item's fallback declarations
    pub fallbacks_from_env: Option<Value>,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            apply_env_overwrites: true,
            apply_fallbacks: true,
            remove_meta_keys: true,
            merge_global: true,
            overwrite_from_env: None,
            fallbacks_from_env: None,
        }
    }
}

/// Describes one section
#[derive(Debug, Clone)]
pub struct SectionSpec {
    pub root_key: String,
    pub pattern: MetaKeyPattern,
    pub not_found: fn(&str) -> SectionError,
    pub default_options: ResolveOptions,
    /// Top-level map merged beneath every item when [ResolveOptions::merge_global] is set
    pub global_key: Option<String>,
    /// Keys stripped together with the meta keys but never resolved from the environment
    pub reserved_keys: Vec<String>,
}

impl SectionSpec {
    pub fn providers() -> Self {
        Self {
            root_key: "providers".to_string(),
            pattern: MetaKeyPattern::grouped(),
            not_found: |name| SectionError::ProviderNotFound(name.to_string()),
            default_options: ResolveOptions::default(),
            global_key: Some(GLOBAL_KEY.to_string()),
            reserved_keys: vec![CONTEXT_OVERWRITE_KEY.to_string()],
        }
    }

    pub fn services() -> Self {
        Self {
            root_key: "services".to_string(),
            pattern: MetaKeyPattern::grouped(),
            not_found: |name| SectionError::ServiceNotFound(name.to_string()),
            default_options: ResolveOptions::default(),
            global_key: None,
            reserved_keys: vec![CONTEXT_OVERWRITE_KEY.to_string()],
        }
    }

    pub fn storage() -> Self {
        Self {
            root_key: "storage".to_string(),
            pattern: MetaKeyPattern::per_property(),
            not_found: |name| SectionError::StorageNotFound(name.to_string()),
            default_options: ResolveOptions::default(),
            global_key: None,
            reserved_keys: vec![CONTEXT_OVERWRITE_KEY.to_string()],
        }
    }

    /// Any other section, failing with [SectionError::ItemNotFound]
    pub fn custom(root_key: impl Into<String>, pattern: MetaKeyPattern) -> Self {
        Self {
            root_key: root_key.into(),
            pattern,
            not_found: |name| SectionError::ItemNotFound {
                section: String::new(),
                name: name.to_string(),
            },
            default_options: ResolveOptions::default(),
            global_key: None,
            reserved_keys: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Document,
    EnvOverwrite,
    EnvFallback,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ResolutionSource {
    pub kind: SourceKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub env_var: Option<String>,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ResolvedItem {
    pub name: String,
    pub config: Value,
    /// Properties that took their value from the environment
    pub env_overwrites: Vec<String>,
    /// Origin of every property that had environment chains declared
    pub resolution_sources: IndexMap<String, ResolutionSource>,
    pub global_merged: bool,
}

/// Resolves items of one section
#[derive(derive_new::new)]
pub struct SectionResolver<'s> {
    store: &'s DocumentStore,
    env: EnvChainResolver,
    spec: SectionSpec,
}

impl<'s> SectionResolver<'s> {
    pub fn providers(store: &'s DocumentStore, env: EnvChainResolver) -> Self {
        Self::new(store, env, SectionSpec::providers())
    }

    pub fn services(store: &'s DocumentStore, env: EnvChainResolver) -> Self {
        Self::new(store, env, SectionSpec::services())
    }

    pub fn storage(store: &'s DocumentStore, env: EnvChainResolver) -> Self {
        Self::new(store, env, SectionSpec::storage())
    }

    pub fn spec(&self) -> &SectionSpec {
        &self.spec
    }

    /// Raw item as written in the documents
    pub fn raw(&self, name: &str) -> Option<&'s Value> {
        self.store
            .get_nested(&[self.spec.root_key.as_str(), name])
            .filter(|item| !item.is_null())
    }

    /// Names of all items, unresolved
    pub fn list(&self) -> Vec<String> {
        self.store
            .get(&self.spec.root_key)
            .and_then(Value::as_object)
            .map(|items| items.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn has(&self, name: &str) -> bool {
        self.raw(name).is_some()
    }

    #[tracing::instrument(level = "trace", skip_all, fields(section = %self.spec.root_key, name = %name))]
    pub fn get(
        &self,
        name: &str,
        options: Option<&ResolveOptions>,
    ) -> Result<ResolvedItem, SectionError> {
        if !self.store.is_initialized() {
            return Err(SectionError::NotInitialized);
        }
        let options = options.unwrap_or(&self.spec.default_options);

        let raw = self.raw(name).ok_or_else(|| self.not_found(name))?;
        let Value::Object(raw) = raw else {
            return Err(SectionError::InvalidItem {
                section: self.spec.root_key.clone(),
                name: name.to_string(),
                found: raw.kind(),
            });
        };

        let mut item = raw.clone();

        let mut global_merged = false;
        if let (Some(global_key), true) = (&self.spec.global_key, options.merge_global) {
            if let Some(global @ Value::Object(_)) = self.store.get(global_key) {
                let mut merged = global.clone();
                merged.deep_merge(Value::Object(item));
                item = match merged {
                    Value::Object(item) => item,
                    _ => Object::new(),
                };
                global_merged = true;
            }
        }

        self.inject(&mut item, options);

        let mut env_overwrites = Vec::new();
        let mut resolution_sources = IndexMap::new();

        for (property, chains) in self.spec.pattern.extract(&item) {
            if item.get(&property).is_some_and(|value| !value.is_null()) {
                resolution_sources.insert(
                    property,
                    ResolutionSource {
                        kind: SourceKind::Document,
                        env_var: None,
                    },
                );
                continue;
            }

            let attempts = [
                (
                    options.apply_env_overwrites,
                    &chains.overwrite,
                    SourceKind::EnvOverwrite,
                ),
                (
                    options.apply_fallbacks,
                    &chains.fallback,
                    SourceKind::EnvFallback,
                ),
            ];

            for (enabled, names, kind) in attempts {
                if !enabled || names.is_empty() {
                    continue;
                }
                if let ChainOutcome::Matched { value, name: var } = self.env.try_chain(names) {
                    tracing::debug!(property = %property, variable = %var, ?kind, "resolved from environment");
                    item.insert(property.clone(), Value::String(value));
                    env_overwrites.push(property.clone());
                    resolution_sources.insert(
                        property.clone(),
                        ResolutionSource {
                            kind,
                            env_var: Some(var),
                        },
                    );
                    break;
                }
            }
        }

        if options.remove_meta_keys {
            item.retain(|key, _| {
                !self.spec.pattern.is_meta_key(key) && !self.spec.reserved_keys.contains(key)
            });
        }

        Ok(ResolvedItem {
            name: name.to_string(),
            config: Value::Object(item),
            env_overwrites,
            resolution_sources,
            global_merged,
        })
    }

    fn not_found(&self, name: &str) -> SectionError {
        match (self.spec.not_found)(name) {
            SectionError::ItemNotFound { name, .. } => SectionError::ItemNotFound {
                section: self.spec.root_key.clone(),
                name,
            },
            error => error,
        }
    }

    /// Applies caller supplied chain declarations
    fn inject(&self, item: &mut Object, options: &ResolveOptions) {
        let injections = [
            (&options.overwrite_from_env, false),
            (&options.fallbacks_from_env, true),
        ];

        for (declarations, fallback) in injections {
            let Some(declarations) = declarations else {
                continue;
            };
            let key = match (&self.spec.pattern, fallback) {
                (MetaKeyPattern::Grouped { overwrite_key, .. }, false) => overwrite_key,
                (MetaKeyPattern::Grouped { fallback_key, .. }, true) => fallback_key,
                (MetaKeyPattern::Single { key }, false) => key,
                _ => {
                    tracing::debug!(
                        section = %self.spec.root_key,
                        "chain injection is not supported for this meta key pattern"
                    );
                    continue;
                }
            };
            item.insert(key.clone(), declarations.clone());
        }
    }
}
