//! Service registry for organizing and resolving JSON-RPC methods.
//!
//! A service is one handler instance plus a set of named methods. Methods are
//! addressed from the wire with a dotted `Service.Method` name.
//!
//! ## Usage
//!
//! ```rust
//! use jrpc_server::*;
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Default, Deserialize)]
//! struct EchoArgs {
//!     text: String,
//! }
//!
//! #[derive(Default, Serialize)]
//! struct EchoReply {
//!     text: String,
//! }
//!
//! struct Echo;
//!
//! impl Echo {
//!     fn say(
//!         &self,
//!         _: &RequestContext,
//!         args: &EchoArgs,
//!         out: &mut EchoReply,
//!     ) -> Result<(), Error> {
//!         out.text = args.text.clone();
//!         Ok(())
//!     }
//! }
//!
//! impl Service for Echo {
//!     fn methods(&self) -> MethodSet<Self> {
//!         MethodSet::new().method("Say", Echo::say)
//!     }
//! }
//!
//! let registry = Registry::new();
//! registry.register(Echo, "").unwrap();
//! assert!(registry.has_method("Echo.Say"));
//! ```

use crate::context::RequestContext;
use crate::params::{ParamDecodeError, decode_params};
use crate::types::Error;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::value::RawValue;
use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, PoisonError, RwLock};

/// A handler object exposing JSON-RPC methods.
///
/// Implementors list their methods in [`Service::methods`]. Each method has
/// the shape `fn(&self, &RequestContext, &Args, &mut Reply) -> Result<(), Error>`
/// where `Args` is decoded from `params` and `Reply` starts at its default.
///
/// Methods are synchronous and run on the task that called dispatch. Behind
/// the HTTP transport that is a tokio worker, so a method that blocks holds
/// that worker until it returns. Serve such services through
/// [`BlockingServer`](crate::traits::BlockingServer), which moves dispatch
/// onto tokio's blocking pool.
pub trait Service: Send + Sync + Sized + 'static {
    /// The methods this service exposes
    fn methods(&self) -> MethodSet<Self>;

    /// Name used when registering without an explicit one.
    ///
    /// Defaults to the type name without its module path or generics.
    fn service_name() -> String {
        type_name_of::<Self>()
    }
}

/// Why a method call did not produce a reply
#[derive(Debug, thiserror::Error)]
pub enum InvokeError {
    #[error(transparent)]
    Params(#[from] ParamDecodeError),
    /// Returned by the method itself, passed on unchanged
    #[error(transparent)]
    Handler(Error),
    #[error("reply could not be encoded: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Errors raised while registering a service
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistrationError {
    #[error("no service name for type {0:?}")]
    EmptyName(String),
    #[error("type {0:?} is not exported")]
    NotExported(String),
    #[error("service name {0:?} must not contain '.'")]
    InvalidName(String),
    #[error("{0:?} has no exported methods of suitable type")]
    NoMethods(String),
    #[error("service already defined: {0:?}")]
    Duplicate(String),
}

/// Errors raised while resolving a dotted method name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LookupError {
    #[error("service/method request ill-formed: {0:?}")]
    IllFormed(String),
    #[error("can't find service {0:?}")]
    ServiceNotFound(String),
    #[error("can't find method {0:?}")]
    MethodNotFound(String),
}

type InvokeResult = Result<serde_json::Value, InvokeError>;

type Invoker<S> = Box<dyn Fn(&S, &RequestContext, Option<&RawValue>) -> InvokeResult + Send + Sync>;

type BoundInvoker = Box<dyn Fn(&RequestContext, Option<&RawValue>) -> InvokeResult + Send + Sync>;

struct MethodEntry<S> {
    name: String,
    args_type: &'static str,
    reply_type: &'static str,
    invoke: Invoker<S>,
}

/// The methods of one service, built with [`MethodSet::method`]
pub struct MethodSet<S> {
    entries: Vec<MethodEntry<S>>,
}

impl<S: Service> MethodSet<S> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Add a method under the given name.
    ///
    /// Names that are empty, not exported (uppercase first letter) or contain
    /// a `.` are skipped at registration, as are repeats of an earlier name.
    pub fn method<A, R, F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        A: DeserializeOwned + Default + 'static,
        R: Serialize + Default + 'static,
        F: Fn(&S, &RequestContext, &A, &mut R) -> Result<(), Error> + Send + Sync + 'static,
    {
        let invoke = move |service: &S,
                           ctx: &RequestContext,
                           params: Option<&RawValue>|
              -> Result<serde_json::Value, InvokeError> {
            let args: A = decode_params(params)?;
            let mut reply = R::default();
            f(service, ctx, &args, &mut reply).map_err(InvokeError::Handler)?;
            serde_json::to_value(&reply).map_err(InvokeError::Encode)
        };

        self.entries.push(MethodEntry {
            name: name.into(),
            args_type: std::any::type_name::<A>(),
            reply_type: std::any::type_name::<R>(),
            invoke: Box::new(invoke),
        });
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<S: Service> Default for MethodSet<S> {
    fn default() -> Self {
        Self::new()
    }
}

/// One resolvable method of a registered service
pub struct MethodDescriptor {
    service: String,
    name: String,
    args_type: &'static str,
    reply_type: &'static str,
    invoke: BoundInvoker,
}

impl MethodDescriptor {
    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Dotted `Service.Method` name
    pub fn full_name(&self) -> String {
        format!("{}.{}", self.service, self.name)
    }

    /// Rust type name of the argument shape
    pub fn args_type(&self) -> &'static str {
        self.args_type
    }

    /// Rust type name of the reply shape
    pub fn reply_type(&self) -> &'static str {
        self.reply_type
    }

    /// Decode `params`, call the method against its handler and encode the reply
    pub fn invoke(
        &self,
        ctx: &RequestContext,
        params: Option<&RawValue>,
    ) -> Result<serde_json::Value, InvokeError> {
        (self.invoke)(ctx, params)
    }
}

impl std::fmt::Debug for MethodDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MethodDescriptor")
            .field("service", &self.service)
            .field("name", &self.name)
            .field("args_type", &self.args_type)
            .field("reply_type", &self.reply_type)
            .finish_non_exhaustive()
    }
}

/// A registered service: its name, methods and the shared handler instance
pub struct ServiceDescriptor {
    name: String,
    handler_type: &'static str,
    handler: Arc<dyn Any + Send + Sync>,
    methods: BTreeMap<String, Arc<MethodDescriptor>>,
}

impl ServiceDescriptor {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rust type name of the handler
    pub fn handler_type(&self) -> &'static str {
        self.handler_type
    }

    /// The shared handler instance, if it is an `S`
    pub fn handler<S: Service>(&self) -> Option<Arc<S>> {
        Arc::clone(&self.handler).downcast::<S>().ok()
    }

    pub fn method(&self, name: &str) -> Option<&Arc<MethodDescriptor>> {
        self.methods.get(name)
    }

    /// Methods ordered by name
    pub fn methods(&self) -> impl Iterator<Item = &Arc<MethodDescriptor>> {
        self.methods.values()
    }

    pub fn method_count(&self) -> usize {
        self.methods.len()
    }
}

impl std::fmt::Debug for ServiceDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceDescriptor")
            .field("name", &self.name)
            .field("handler_type", &self.handler_type)
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Thread-safe map from service name to service
#[derive(Default)]
pub struct Registry {
    services: RwLock<HashMap<String, Arc<ServiceDescriptor>>>,
}

impl Registry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a service.
    ///
    /// With an empty `name` the service is named by [`Service::service_name`],
    /// which must then start with an uppercase letter.
    pub fn register<S: Service>(&self, handler: S, name: &str) -> Result<(), RegistrationError> {
        self.register_arc(Arc::new(handler), name)
    }

    /// Register a service whose handler is already shared elsewhere
    pub fn register_arc<S: Service>(
        &self,
        handler: Arc<S>,
        name: &str,
    ) -> Result<(), RegistrationError> {
        let handler_type = std::any::type_name::<S>();
        let service_name = if name.is_empty() {
            let derived = S::service_name();
            if derived.is_empty() {
                return Err(RegistrationError::EmptyName(handler_type.to_string()));
            }
            if !is_exported(&derived) {
                return Err(RegistrationError::NotExported(derived));
            }
            derived
        } else {
            name.to_string()
        };
        if service_name.contains('.') {
            return Err(RegistrationError::InvalidName(service_name));
        }

        let mut methods = BTreeMap::new();
        for entry in handler.methods().entries {
            if !is_exported(&entry.name) || entry.name.contains('.') {
                tracing::debug!(
                    service = %service_name,
                    method = %entry.name,
                    "skipping method with unexported name"
                );
                continue;
            }
            if methods.contains_key(&entry.name) {
                tracing::debug!(
                    service = %service_name,
                    method = %entry.name,
                    "skipping duplicate method"
                );
                continue;
            }

            let bound = Arc::clone(&handler);
            let invoke = entry.invoke;
            let descriptor = MethodDescriptor {
                service: service_name.clone(),
                name: entry.name.clone(),
                args_type: entry.args_type,
                reply_type: entry.reply_type,
                invoke: Box::new(move |ctx: &RequestContext, params: Option<&RawValue>| {
                    invoke(&*bound, ctx, params)
                }),
            };
            methods.insert(entry.name, Arc::new(descriptor));
        }

        if methods.is_empty() {
            return Err(RegistrationError::NoMethods(service_name));
        }

        let method_count = methods.len();
        let descriptor = Arc::new(ServiceDescriptor {
            name: service_name.clone(),
            handler_type,
            handler,
            methods,
        });

        let mut services = self.services.write().unwrap_or_else(PoisonError::into_inner);
        if services.contains_key(&service_name) {
            tracing::warn!(service = %service_name, "service already registered");
            return Err(RegistrationError::Duplicate(service_name));
        }
        services.insert(service_name.clone(), descriptor);
        drop(services);

        tracing::info!(service = %service_name, method_count, "service registered");
        Ok(())
    }

    /// Resolve a dotted `Service.Method` name
    pub fn lookup(
        &self,
        method: &str,
    ) -> Result<(Arc<ServiceDescriptor>, Arc<MethodDescriptor>), LookupError> {
        let (service_name, method_name) = match method.split_once('.') {
            Some((s, m)) if !s.is_empty() && !m.is_empty() && !m.contains('.') => (s, m),
            _ => return Err(LookupError::IllFormed(method.to_string())),
        };

        let service = self
            .services
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(service_name)
            .cloned()
            .ok_or_else(|| LookupError::ServiceNotFound(method.to_string()))?;

        let found = service
            .method(method_name)
            .cloned()
            .ok_or_else(|| LookupError::MethodNotFound(method.to_string()))?;

        Ok((service, found))
    }

    /// Check if a dotted method name resolves
    pub fn has_method(&self, method: &str) -> bool {
        self.lookup(method).is_ok()
    }

    /// Snapshot of every registered service.
    ///
    /// Later registrations are not reflected in the returned map.
    pub fn list_all(&self) -> HashMap<String, Arc<ServiceDescriptor>> {
        self.services
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn service_count(&self) -> usize {
        self.services
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Every resolvable `Service.Method` name, sorted
    pub fn method_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .list_all()
            .values()
            .flat_map(|service| service.methods().map(|m| m.full_name()))
            .collect();
        names.sort();
        names
    }
}

/// Exported names start with an uppercase letter
fn is_exported(name: &str) -> bool {
    name.chars().next().is_some_and(char::is_uppercase)
}

/// `my_crate::api::DemoApi<T>` becomes `DemoApi`
fn type_name_of<T>() -> String {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base).to_string()
}
