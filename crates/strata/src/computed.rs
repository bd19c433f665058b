//! lazily computed, cached values
//!
//! A computed value is a named async function over the [DocumentStore]. It is evaluated on first access, and
//! definitions may request other computed values through their [ComputeScope].
//!
//! Each successful result is stored once and never evaluated again. Callers that arrive while an evaluation is
//! running await the same shared future.
//!
//! ### Cycle detection
//!
//! Every evaluation that waits on another key records a `waiter -> key` edge. A definition awaiting several keys at
//! once holds one edge per wait. Before waiting, every path from the requested key is followed. Arriving back at
//! the requested key means the wait could never finish, and [ComputedError::CircularDependency] is returned instead.
//! This covers direct recursion (`a -> a`), chains inside one task (`a -> b -> a`), fan-out (`a -> {b, c}`,
//! `c -> a`), and interleaved tasks that each hold one half of a cycle.
use crate::documents::DocumentStore;
use crate::util::OnceSlots;
use crate::value::Value;
use futures::future::{BoxFuture, FutureExt};
use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;

pub type ComputedDefinition =
    Arc<dyn Fn(ComputeScope) -> BoxFuture<'static, anyhow::Result<Value>> + Send + Sync>;

#[derive(thiserror::Error, Debug, Clone)]
pub enum ComputedError {
    #[error("configuration is not loaded")]
    NotInitialized,
    #[error("no computed value registered for '{0}'")]
    KeyNotFound(String),
    #[error("circular dependency: {}", chain.join(" -> "))]
    CircularDependency { chain: Vec<String> },
    #[error("computing '{key}' failed: {cause:#}")]
    Failed {
        key: String,
        cause: Arc<anyhow::Error>,
    },
}

/// Registry of computed values, cheap to clone
#[derive(Clone)]
pub struct ComputedRegistry {
    inner: Arc<Inner>,
}

struct Inner {
    store: Arc<DocumentStore>,
    definitions: RwLock<IndexMap<String, ComputedDefinition>>,
    values: OnceSlots<Value, ComputedError>,
    /// evaluating key -> keys it currently waits on, one entry per wait
    waits: Mutex<HashMap<String, Vec<String>>>,
}

/// Handle passed to a definition while it runs
#[derive(Clone)]
pub struct ComputeScope {
    registry: ComputedRegistry,
    key: String,
}

impl ComputeScope {
    pub fn store(&self) -> &DocumentStore {
        &self.registry.inner.store
    }

    /// Key of the definition this scope belongs to
    pub fn key(&self) -> &str {
        &self.key
    }

    pub async fn get_computed(&self, key: &str) -> Result<Value, ComputedError> {
        self.registry.evaluate(key, Some(&self.key)).await
    }
}

impl ComputedRegistry {
    pub fn new(store: Arc<DocumentStore>) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                definitions: Default::default(),
                values: Default::default(),
                waits: Default::default(),
            }),
        }
    }

    pub fn store(&self) -> &Arc<DocumentStore> {
        &self.inner.store
    }

    /// Registers an async definition
    ///
    /// Registering an existing key replaces its definition. A value already computed for it stays cached.
    pub fn register<F, Fut>(&self, key: impl Into<String>, definition: F)
    where
        F: Fn(ComputeScope) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        let definition: ComputedDefinition = Arc::new(move |scope| definition(scope).boxed());
        let key = key.into();

        if self
            .inner
            .definitions
            .write()
            .insert(key.clone(), definition)
            .is_some()
        {
            tracing::warn!(key = key.as_str(), "computed definition replaced");
        }
    }

    /// Registers a definition that only reads the store
    pub fn register_sync<F>(&self, key: impl Into<String>, definition: F)
    where
        F: Fn(&DocumentStore) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.register(key, move |scope: ComputeScope| {
            let result = definition(scope.store());
            async move { result }
        });
    }

    pub fn is_registered(&self, key: &str) -> bool {
        self.inner.definitions.read().contains_key(key)
    }

    pub fn keys(&self) -> Vec<String> {
        self.inner.definitions.read().keys().cloned().collect()
    }

    pub async fn get_computed(&self, key: &str) -> Result<Value, ComputedError> {
        self.evaluate(key, None).await
    }

    /// Forgets every cached value; definitions stay registered
    pub fn clear_cache(&self) {
        self.inner.values.clear();
    }

    #[tracing::instrument(level = "trace", skip(self))]
    async fn evaluate(&self, key: &str, waiter: Option<&str>) -> Result<Value, ComputedError> {
        if !self.inner.store.is_initialized() {
            return Err(ComputedError::NotInitialized);
        }

        if let Some(value) = self.inner.values.get(key) {
            return Ok(value);
        }

        let definition = self
            .inner
            .definitions
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| ComputedError::KeyNotFound(key.to_string()))?;

        let _edge = match waiter {
            Some(waiter) => Some(self.start_waiting(waiter, key)?),
            None => None,
        };

        let scope = ComputeScope {
            registry: self.clone(),
            key: key.to_string(),
        };
        let owned_key = key.to_string();
        let result = self
            .inner
            .values
            .get_or_init(key, move || {
                async move {
                    tracing::debug!(key = %owned_key, "evaluating computed value");
                    definition(scope).await.map_err(|error| {
                        // errors of nested lookups pass through unchanged
                        match error.downcast::<ComputedError>() {
                            Ok(computed) => computed,
                            Err(cause) => ComputedError::Failed {
                                key: owned_key,
                                cause: Arc::new(cause),
                            },
                        }
                    })
                }
                .boxed()
            })
            .await;

        result
    }

    /// Records `waiter -> key` unless that closes a cycle
    ///
    /// The edge is removed again when the returned guard drops.
    fn start_waiting(&self, waiter: &str, key: &str) -> Result<WaitEdge, ComputedError> {
        let mut waits = self.inner.waits.lock();
        waits
            .entry(waiter.to_string())
            .or_default()
            .push(key.to_string());

        let mut chain = vec![key.to_string()];
        if path_back(&waits, key, key, &mut HashSet::new(), &mut chain) {
            remove_edge(&mut waits, waiter, key);
            tracing::debug!(?chain, "circular dependency");
            return Err(ComputedError::CircularDependency { chain });
        }

        Ok(WaitEdge {
            inner: self.inner.clone(),
            waiter: waiter.to_string(),
            key: key.to_string(),
        })
    }
}

/// A recorded `waiter -> key` edge
struct WaitEdge {
    inner: Arc<Inner>,
    waiter: String,
    key: String,
}

impl Drop for WaitEdge {
    fn drop(&mut self) {
        remove_edge(&mut self.inner.waits.lock(), &self.waiter, &self.key);
    }
}

/// Depth first search for a path from `current` to `target`, appended to `chain`
fn path_back(
    waits: &HashMap<String, Vec<String>>,
    current: &str,
    target: &str,
    visited: &mut HashSet<String>,
    chain: &mut Vec<String>,
) -> bool {
    for next in waits.get(current).into_iter().flatten() {
        if next == target {
            chain.push(next.clone());
            return true;
        }
        if visited.insert(next.clone()) {
            chain.push(next.clone());
            if path_back(waits, next, target, visited, chain) {
                return true;
            }
            chain.pop();
        }
    }
    false
}

fn remove_edge(waits: &mut HashMap<String, Vec<String>>, waiter: &str, key: &str) {
    if let Some(keys) = waits.get_mut(waiter) {
        if let Some(position) = keys.iter().position(|waited| waited == key) {
            keys.swap_remove(position);
        }
        if keys.is_empty() {
            waits.remove(waiter);
        }
    }
}
