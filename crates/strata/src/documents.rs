//! loading and merging of configuration documents
//!
//! [DocumentStore] owns the merged configuration tree. It is filled exactly once by [DocumentStore::load] (or
//! [DocumentStore::load_sources]) and is read-only afterwards. Calling load again is a no-op until
//! [DocumentStore::reset] is called.
use crate::env::{EnvSource, ProcessEnv};
use crate::value::Value;
use std::path::{Path, PathBuf};

/// Variable selecting the active environment
pub const ENVIRONMENT_VARIABLE: &str = "APP_ENV";

/// Environment used when neither the caller nor [ENVIRONMENT_VARIABLE] names one
pub const DEFAULT_ENVIRONMENT: &str = "dev";

/// Replaced by the active environment inside file specs
pub const ENVIRONMENT_PLACEHOLDER: &str = "{APP_ENV}";

/// What to load
#[derive(Debug, Clone, Default)]
pub struct LoadSpec {
    /// File specs, merged in order. May contain [ENVIRONMENT_PLACEHOLDER].
    pub files: Vec<String>,
    /// Relative file specs are resolved against this directory
    pub base_dir: Option<PathBuf>,
    /// Overrides [ENVIRONMENT_VARIABLE]
    pub environment: Option<String>,
}

impl LoadSpec {
    pub fn new<S: Into<String>>(files: impl IntoIterator<Item = S>) -> Self {
        Self {
            files: files.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(base_dir.into());
        self
    }

    pub fn environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = Some(environment.into());
        self
    }
}

/// Document contents that are already in memory
#[derive(Debug, Clone)]
pub struct Source {
    pub path: PathBuf,
    pub contents: String,
}

impl Source {
    pub fn new(path: impl Into<PathBuf>, contents: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            contents: contents.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct LoadIssue {
    pub file: PathBuf,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct LoadResult {
    pub files_loaded: Vec<PathBuf>,
    /// Non-fatal findings. Anything fatal aborts the load instead.
    pub errors: Vec<LoadIssue>,
    pub active_environment: Option<String>,
    pub merge_order: Vec<PathBuf>,
}

#[derive(thiserror::Error, Debug)]
pub enum LoadError {
    #[error("configuration file not found: {} (also checked {})", path.display(), environment_specific.display())]
    FileNotFound {
        path: PathBuf,
        environment_specific: PathBuf,
    },
    #[error("unable to read {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("unable to parse {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("{} must contain a mapping at the top level, found {found}", path.display())]
    InvalidDocument { path: PathBuf, found: &'static str },
}

/// The merged configuration tree
#[derive(Debug, Default)]
pub struct DocumentStore {
    data: Value,
    load_result: Option<LoadResult>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads files, reading the active environment from the process
    pub fn load(&mut self, spec: &LoadSpec) -> Result<LoadResult, LoadError> {
        self.load_with_env(spec, &ProcessEnv)
    }

    pub fn load_with_env(
        &mut self,
        spec: &LoadSpec,
        env: &dyn EnvSource,
    ) -> Result<LoadResult, LoadError> {
        if let Some(result) = self.already_loaded() {
            return Ok(result);
        }

        let environment = active_environment(spec.environment.as_deref(), env);

        let mut sources = Vec::with_capacity(spec.files.len());
        for file_spec in &spec.files {
            let path = locate(file_spec, spec.base_dir.as_deref(), &environment)?;
            tracing::info!(path=%path.display(), "loading file");

            let contents = std::fs::read_to_string(&path).map_err(|source| LoadError::Read {
                path: path.clone(),
                source,
            })?;
            sources.push(Source { path, contents });
        }

        self.merge_sources(sources, environment)
    }

    /// Loads documents that are already in memory
    ///
    /// Same semantics as [DocumentStore::load] minus file lookup.
    pub fn load_sources(
        &mut self,
        sources: impl IntoIterator<Item = Source>,
        environment: Option<&str>,
    ) -> Result<LoadResult, LoadError> {
        if let Some(result) = self.already_loaded() {
            return Ok(result);
        }

        let environment = active_environment(environment, &ProcessEnv);
        self.merge_sources(sources.into_iter().collect(), environment)
    }

    fn already_loaded(&self) -> Option<LoadResult> {
        let result = self.load_result.clone()?;
        tracing::warn!("configuration is already loaded, ignoring load request");
        Some(result)
    }

    /// Parses everything before touching `self` so a failing document leaves the store uninitialized
    fn merge_sources(
        &mut self,
        sources: Vec<Source>,
        environment: String,
    ) -> Result<LoadResult, LoadError> {
        let mut merged = Value::empty_object();
        let mut issues = Vec::new();
        let mut merge_order = Vec::with_capacity(sources.len());

        for Source { path, contents } in sources {
            let document = Value::from_yaml_str(&contents).map_err(|source| LoadError::Parse {
                path: path.clone(),
                source,
            })?;

            match document {
                Value::Null => issues.push(LoadIssue {
                    file: path.clone(),
                    error: "document is empty".to_string(),
                }),
                document @ Value::Object(_) => merged.deep_merge(document),
                other => {
                    return Err(LoadError::InvalidDocument {
                        path,
                        found: other.kind(),
                    })
                }
            }

            tracing::debug!(path=%path.display(), "merged document");
            merge_order.push(path);
        }

        tracing::info!(
            files = merge_order.len(),
            environment = environment.as_str(),
            "configuration loaded"
        );

        let result = LoadResult {
            files_loaded: merge_order.clone(),
            errors: issues,
            active_environment: Some(environment),
            merge_order,
        };

        self.data = merged;
        self.load_result = Some(result.clone());
        Ok(result)
    }

    /// Drops all loaded state so the next load starts from scratch
    pub fn reset(&mut self) {
        self.data = Value::Null;
        self.load_result = None;
    }

    pub fn is_initialized(&self) -> bool {
        self.load_result.is_some()
    }

    pub fn load_result(&self) -> Option<&LoadResult> {
        self.load_result.as_ref()
    }

    pub fn active_environment(&self) -> Option<&str> {
        self.load_result
            .as_ref()
            .and_then(|result| result.active_environment.as_deref())
    }

    /// Top-level lookup
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub fn get_or(&self, key: &str, default: Value) -> Value {
        self.get(key).cloned().unwrap_or(default)
    }

    /// Nested lookup through objects
    pub fn get_nested<S: AsRef<str>>(&self, path: &[S]) -> Option<&Value> {
        self.data.get_path(path)
    }

    pub fn get_nested_or<S: AsRef<str>>(&self, path: &[S], default: Value) -> Value {
        self.get_nested(path).cloned().unwrap_or(default)
    }

    /// Independent copy of the whole tree
    pub fn get_all(&self) -> Value {
        match &self.data {
            Value::Null => Value::empty_object(),
            data => data.clone(),
        }
    }

    /// Borrowed view of the whole tree
    pub fn data(&self) -> &Value {
        &self.data
    }
}

fn active_environment(explicit: Option<&str>, env: &dyn EnvSource) -> String {
    explicit
        .map(str::to_string)
        .or_else(|| env.var(ENVIRONMENT_VARIABLE))
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string())
        .to_lowercase()
}

/// Turns a file spec into the path that will be read
///
/// `config.yaml` in environment `prod` prefers `config.prod.yaml` when it exists.
fn locate(file_spec: &str, base_dir: Option<&Path>, environment: &str) -> Result<PathBuf, LoadError> {
    let file_spec = file_spec.replace(ENVIRONMENT_PLACEHOLDER, environment);
    let path = Path::new(&file_spec);

    let path = match base_dir {
        Some(base_dir) if path.is_relative() => base_dir.join(path),
        _ if path.is_relative() => std::env::current_dir()
            .map_err(|source| LoadError::Read {
                path: path.to_owned(),
                source,
            })?
            .join(path),
        _ => path.to_owned(),
    };

    let environment_specific = environment_specific_path(&path, environment);
    if environment_specific.is_file() {
        return Ok(environment_specific);
    }
    if path.is_file() {
        return Ok(path);
    }

    Err(LoadError::FileNotFound {
        path,
        environment_specific,
    })
}

fn environment_specific_path(path: &Path, environment: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();

    let file_name = match path.extension() {
        Some(extension) => format!("{stem}.{environment}.{}", extension.to_string_lossy()),
        None => format!("{stem}.{environment}"),
    };

    path.with_file_name(file_name)
}

/// Utility macro to create an initialized [DocumentStore]
///
/// Create from a single document
/// ```
/// # use strata::documents;
/// let store = documents!("answer: 42");
/// assert!(store.get("answer").is_some());
/// ```
///
/// Create from multiple documents (merged in order), optionally naming the environment
/// ```
/// # use strata::documents;
/// let store = documents! {
///   env = "prod";
///   "base.yaml" => "server: { port: 1 }",
///   "prod.yaml" => "server: { port: 2 }"
/// };
/// assert_eq!(store.active_environment(), Some("prod"));
/// ```
///
/// # Panic
/// Panics on invalid input
///
/// ```should_panic
/// # use strata::documents;
/// documents!("key: [unclosed");
/// ```
#[macro_export]
macro_rules! documents {
    // multi document with sources in a named environment
    { env = $env:expr; $($source:expr => $expr:expr),+ $(,)? } => {{
        let mut store = $crate::documents::DocumentStore::new();
        store
            .load_sources([$($crate::documents::Source::new($source, $expr)),+], Some($env))
            .expect("documents must load");
        store
    }};
    // multi document with sources
    { $($source:expr => $expr:expr),+ $(,)? } => {{
        let mut store = $crate::documents::DocumentStore::new();
        store
            .load_sources([$($crate::documents::Source::new($source, $expr)),+], None)
            .expect("documents must load");
        store
    }};
    // single document without source
    { $expr:expr } => {
        $crate::documents! { "<inline>" => $expr }
    };
}
