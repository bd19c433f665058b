//! # strata - layered configuration resolution
//!
//! ## Introduction for developers
//!
//! Read this to understand how `strata` works internally.
//!
//! ### Loading documents
//!
//! see [documents::DocumentStore::load]
//!
//! A [documents::LoadSpec] lists YAML files in merge order. A spec may contain `{APP_ENV}`, which is replaced by
//! the active environment (`APP_ENV`, lower-cased, default `dev`). For a spec like `server.yaml` the file
//! `server.<env>.yaml` is preferred when it exists.
//!
//! Documents are deep merged into one tree of [value::Value]s: maps merge key by key, everything else (arrays
//! included) is replaced by the later document. The store is filled once and read-only afterwards.
//!
//! ```yaml
//! # base.yml                      # server.prod.yaml
//! server:                         server:
//!   ports: [3000]                   ports: [8080, 8081]
//!   host: localhost
//! ```
//!
//! merges into `server: { ports: [8080, 8081], host: localhost }`.
//!
//! ### Sections
//!
//! see [section::SectionResolver]
//!
//! Top-level maps such as `providers`, `services` and `storage` hold named items. Items carry meta keys naming
//! environment variables for properties without an explicit value. Resolving an item fills those properties from
//! the first variable that is set and strips the meta keys.
//!
//! | step | source                                  |
//! |------|-----------------------------------------|
//! | 1    | explicit value in the documents         |
//! | 2    | first set variable of the overwrite chain |
//! | 3    | first set variable of the fallback chain  |
//!
//! ### Specialized resolvers
//!
//! The raw items are also read by:
//! - [proxy::ProxyResolver]: which proxy an item uses, and why
//! - [auth::AuthResolver]: credentials and headers, read statically, once at startup, or per request
//!
//! ### Templates
//!
//! see [template::resolve]
//!
//! String values may contain `{{path}}` or `$.path` placeholders. They resolve against a context with four
//! namespaces (`env`, `app`, `config`, `request`), see [context::TemplateContext].
//!
//! ### Computed values
//!
//! see [computed::ComputedRegistry]
//!
//! Named async functions over the store, evaluated on first access and cached. Definitions may depend on other
//! computed values; cycles are reported instead of hanging.
//!
//! ### Putting it together
//!
//! [factory::ConfigFactory] computes everything known about one item (`providers.github`) in one call.
//!
pub mod auth;
pub mod computed;
pub mod context;
pub mod documents;
pub mod env;
pub mod factory;
pub mod proxy;
pub mod section;
pub mod template;
mod util;
pub mod value;
mod visit;
