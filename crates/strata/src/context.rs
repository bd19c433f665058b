//! template context
//!
//! Placeholders resolve against four fixed namespaces:
//! - `env`: process environment variables
//! - `app`: `name`, `version`, `description` (from the `app` section) and the active `environment`
//! - `config`: the whole merged configuration
//! - `request`: `headers` (lower-cased names), `query` and `path` parameters of the inbound request
//!
//! [ContextFunctions] holds named functions that string values can reference as `{{fn:name}}`.
use crate::documents::{DocumentStore, DEFAULT_ENVIRONMENT};
use crate::env::EnvChainResolver;
use crate::value::{Object, Value};
use indexmap::IndexMap;
use parking_lot::Mutex;
use std::sync::Arc;

/// What the engine knows about an inbound request
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct RequestContext {
    pub headers: IndexMap<String, String>,
    pub query: IndexMap<String, String>,
    pub path: IndexMap<String, String>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Header names are stored lower-cased
    pub fn header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.as_ref().to_lowercase(), value.into());
        self
    }

    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(name.into(), value.into());
        self
    }

    pub fn path_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.path.insert(name.into(), value.into());
        self
    }

    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_lowercase())
            .map(String::as_str)
    }

    pub fn to_value(&self) -> Value {
        let mut request = Object::new();
        request.insert("headers".to_string(), self.headers.clone().into());
        request.insert("query".to_string(), self.query.clone().into());
        request.insert("path".to_string(), self.path.clone().into());
        Value::Object(request)
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct AppInfo {
    pub name: String,
    pub version: String,
    pub description: String,
    pub environment: String,
}

impl AppInfo {
    pub fn from_store(store: &DocumentStore) -> Self {
        let field = |key: &str, default: &str| {
            store
                .get_nested(&["app", key])
                .and_then(Value::as_str)
                .unwrap_or(default)
                .to_string()
        };

        Self {
            name: field("name", "unknown"),
            version: field("version", "0.0.0"),
            description: field("description", ""),
            environment: store
                .active_environment()
                .unwrap_or(DEFAULT_ENVIRONMENT)
                .to_string(),
        }
    }
}

/// Context values that do not change during the life of the process
#[derive(Debug, Clone)]
pub struct TemplateContext {
    pub env: IndexMap<String, String>,
    pub app: AppInfo,
    pub config: Value,
}

impl TemplateContext {
    pub fn startup(store: &DocumentStore, env: &EnvChainResolver) -> Self {
        Self {
            env: env.vars(),
            app: AppInfo::from_store(store),
            config: store.get_all(),
        }
    }

    /// Context object for placeholder lookups. Without a request the `request` namespace has empty maps.
    pub fn to_value(&self, request: Option<&RequestContext>) -> Value {
        let mut app = Object::new();
        app.insert("name".to_string(), self.app.name.clone().into());
        app.insert("version".to_string(), self.app.version.clone().into());
        app.insert(
            "description".to_string(),
            self.app.description.clone().into(),
        );
        app.insert(
            "environment".to_string(),
            self.app.environment.clone().into(),
        );

        let mut context = Object::new();
        context.insert("env".to_string(), self.env.clone().into());
        context.insert("app".to_string(), Value::Object(app));
        context.insert(
            "request".to_string(),
            request.cloned().unwrap_or_default().to_value(),
        );
        context.insert("config".to_string(), self.config.clone());
        Value::Object(context)
    }
}

pub type StartupFunction = Arc<dyn Fn(&Value) -> anyhow::Result<Value> + Send + Sync>;
pub type RequestFunction =
    Arc<dyn Fn(&Value, Option<&RequestContext>) -> anyhow::Result<Value> + Send + Sync>;

/// Named functions for `{{fn:name}}` references
///
/// Request functions run on every reference. Startup functions run once, their result is kept. When both kinds
/// use the same name the request function is used.
#[derive(Default)]
pub struct ContextFunctions {
    startup: IndexMap<String, StartupFunction>,
    request: IndexMap<String, RequestFunction>,
    startup_values: Mutex<IndexMap<String, Value>>,
}

#[derive(thiserror::Error, Debug, Clone)]
pub enum FunctionError {
    #[error("no context function registered for '{0}'")]
    NotFound(String),
    #[error("context function '{name}' failed: {cause:#}")]
    Failed {
        name: String,
        cause: Arc<anyhow::Error>,
    },
}

impl ContextFunctions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_startup<F>(&mut self, name: impl Into<String>, function: F)
    where
        F: Fn(&Value) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.startup.insert(name.into(), Arc::new(function));
    }

    pub fn register_request<F>(&mut self, name: impl Into<String>, function: F)
    where
        F: Fn(&Value, Option<&RequestContext>) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.request.insert(name.into(), Arc::new(function));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.request.contains_key(name) || self.startup.contains_key(name)
    }

    pub fn call(
        &self,
        name: &str,
        context: &Value,
        request: Option<&RequestContext>,
    ) -> Result<Value, FunctionError> {
        let failed = |cause: anyhow::Error| FunctionError::Failed {
            name: name.to_string(),
            cause: Arc::new(cause),
        };

        if let Some(function) = self.request.get(name) {
            return function(context, request).map_err(failed);
        }

        let function = self
            .startup
            .get(name)
            .ok_or_else(|| FunctionError::NotFound(name.to_string()))?;

        if let Some(value) = self.startup_values.lock().get(name) {
            return Ok(value.clone());
        }
        let value = function(context).map_err(failed)?;
        self.startup_values
            .lock()
            .insert(name.to_string(), value.clone());
        Ok(value)
    }
}
