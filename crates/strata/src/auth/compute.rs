//! per-provider token functions for startup and request timing
use crate::context::RequestContext;
use crate::value::Value;
use futures::future::BoxFuture;
use futures::FutureExt;
use indexmap::IndexMap;
use std::future::Future;
use std::sync::Arc;

/// Receives the provider's raw item
pub type StartupCompute = Arc<dyn Fn(Value) -> BoxFuture<'static, anyhow::Result<String>> + Send + Sync>;
/// Receives the inbound request
pub type RequestCompute =
    Arc<dyn Fn(RequestContext) -> BoxFuture<'static, anyhow::Result<String>> + Send + Sync>;

/// Explicit provider name -> function mapping
#[derive(Default, Clone)]
pub struct AuthComputeRegistry {
    startup: IndexMap<String, StartupCompute>,
    request: IndexMap<String, RequestCompute>,
}

impl std::fmt::Debug for AuthComputeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthComputeRegistry")
            .field("startup", &self.startup.keys().collect::<Vec<_>>())
            .field("request", &self.request.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl AuthComputeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_startup<F, Fut>(&mut self, provider: impl Into<String>, function: F)
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<String>> + Send + 'static,
    {
        self.startup
            .insert(provider.into(), Arc::new(move |item| function(item).boxed()));
    }

    pub fn register_request<F, Fut>(&mut self, provider: impl Into<String>, function: F)
    where
        F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<String>> + Send + 'static,
    {
        self.request
            .insert(provider.into(), Arc::new(move |request| function(request).boxed()));
    }

    pub fn startup(&self, provider: &str) -> Option<StartupCompute> {
        self.startup.get(provider).cloned()
    }

    pub fn request(&self, provider: &str) -> Option<RequestCompute> {
        self.request.get(provider).cloned()
    }
}
