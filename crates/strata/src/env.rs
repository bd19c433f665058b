//! environment variable access and ordered lookup chains
//!
//! All resolvers read variables through an [EnvSource] handed to them explicitly. [ProcessEnv] reads the real
//! process environment, [MapEnv] is a fixed set of variables.
use crate::value::Value;
use indexmap::IndexMap;
use std::sync::Arc;

/// Read access to a set of environment variables
pub trait EnvSource: Send + Sync {
    fn var(&self, name: &str) -> Option<String>;

    /// All variables, used to populate the `env` template namespace
    fn vars(&self) -> IndexMap<String, String>;
}

/// The environment of the running process
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var_os(name).map(|value| value.to_string_lossy().into_owned())
    }

    fn vars(&self) -> IndexMap<String, String> {
        std::env::vars_os()
            .map(|(k, v)| {
                (
                    k.to_string_lossy().into_owned(),
                    v.to_string_lossy().into_owned(),
                )
            })
            .collect()
    }
}

/// A fixed set of variables
#[derive(Debug, Default, Clone)]
pub struct MapEnv(IndexMap<String, String>);

impl MapEnv {
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MapEnv {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl EnvSource for MapEnv {
    fn var(&self, name: &str) -> Option<String> {
        self.0.get(name).cloned()
    }

    fn vars(&self) -> IndexMap<String, String> {
        self.0.clone()
    }
}

/// Outcome of [EnvChainResolver::try_chain]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainOutcome {
    Matched { value: String, name: String },
    Unmatched { tried: Vec<String> },
}

impl ChainOutcome {
    pub fn matched(self) -> Option<(String, String)> {
        match self {
            ChainOutcome::Matched { value, name } => Some((value, name)),
            ChainOutcome::Unmatched { .. } => None,
        }
    }
}

/// Resolves values from ordered lists of candidate variable names
///
/// A variable counts as soon as it is *present*. An empty string is a match.
#[derive(Clone)]
pub struct EnvChainResolver {
    source: Arc<dyn EnvSource>,
}

impl std::fmt::Debug for EnvChainResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvChainResolver").finish_non_exhaustive()
    }
}

impl Default for EnvChainResolver {
    fn default() -> Self {
        Self::new(ProcessEnv)
    }
}

impl EnvChainResolver {
    pub fn new(source: impl EnvSource + 'static) -> Self {
        Self {
            source: Arc::new(source),
        }
    }

    pub fn from_vars<K: Into<String>, V: Into<String>>(
        vars: impl IntoIterator<Item = (K, V)>,
    ) -> Self {
        Self::new(vars.into_iter().collect::<MapEnv>())
    }

    pub fn var(&self, name: &str) -> Option<String> {
        self.source.var(name)
    }

    /// First variable that is set and not empty
    pub fn non_empty(&self, names: &[&str]) -> Option<(String, String)> {
        names.iter().find_map(|name| {
            self.var(name)
                .filter(|value| !value.is_empty())
                .map(|value| (value, name.to_string()))
        })
    }

    pub fn vars(&self) -> IndexMap<String, String> {
        self.source.vars()
    }

    pub fn try_chain<I, S>(&self, names: I) -> ChainOutcome
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut tried = Vec::new();
        for name in names {
            let name = name.as_ref();
            if let Some(value) = self.var(name) {
                tracing::trace!(variable = name, "chain matched");
                return ChainOutcome::Matched {
                    value,
                    name: name.to_string(),
                };
            }
            tried.push(name.to_string());
        }

        ChainOutcome::Unmatched { tried }
    }
}

/// Reads a chain declaration from a document
///
/// A chain is either a single variable name or a list of names. Non-string list entries are skipped, any other
/// value declares no chain.
pub fn chain_names(declaration: &Value) -> Vec<String> {
    match declaration {
        Value::String(name) => vec![name.clone()],
        Value::Array(names) => names
            .iter()
            .filter_map(|name| name.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}
