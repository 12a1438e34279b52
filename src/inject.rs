//! Injection adapter
//!
//! Every callback a script carries is either a plain function or a container
//! that builds one from services of a dependency-injection scope. The
//! interpreter only ever calls [`Callback::resolve`]; how services are stored
//! and scoped is the caller's business, behind the [`Scope`] trait.
//!
//! Containers are resolved each time their command runs, never cached, so a
//! container may depend on per-turn services.

use std::any::{type_name, Any};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::{self, BoxFuture, FutureExt};

use crate::errors::InjectError;

/// A type-erased service instance
pub type Service = Arc<dyn Any + Send + Sync>;

/// A resolved callback, always async
pub type CallbackFn<A, T> = Arc<dyn Fn(A) -> BoxFuture<'static, anyhow::Result<T>> + Send + Sync>;

/* ===================== Scope ===================== */

/// Values provided by the interpreter for a single resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provisions {
    /// Identifies the conversation stream; the thread's uid
    pub streaming_key: String,
}

impl Provisions {
    pub fn new(streaming_key: impl Into<String>) -> Self {
        Self {
            streaming_key: streaming_key.into(),
        }
    }
}

/// Dependency-injection scope the interpreter resolves containers against
pub trait Scope: Send + Sync {
    /// Look up a named service, optionally specialised by the provisions
    fn resolve_service(&self, name: &str, provisions: &Provisions) -> Result<Service, InjectError>;
}

impl dyn Scope + '_ {
    /// Resolve every dependency of `container` and run its factory
    pub fn inject_container<T>(
        &self,
        container: &Container<T>,
        provisions: &Provisions,
    ) -> Result<T, InjectError> {
        let services = container
            .deps
            .iter()
            .map(|name| self.resolve_service(name, provisions))
            .collect::<Result<Vec<_>, _>>()?;

        let deps = Dependencies {
            names: &container.deps,
            services,
            provisions,
        };

        (container.factory)(&deps)
    }
}

/// Map-backed scope
///
/// Services registered for a streaming key shadow the global ones for that key.
#[derive(Clone, Default)]
pub struct ServiceScope {
    services: HashMap<String, Service>,
    keyed: HashMap<(String, String), Service>,
}

impl ServiceScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_service<S: Any + Send + Sync>(mut self, name: impl Into<String>, service: S) -> Self {
        self.services.insert(name.into(), Arc::new(service));
        self
    }

    pub fn with_keyed_service<S: Any + Send + Sync>(
        mut self,
        name: impl Into<String>,
        streaming_key: impl Into<String>,
        service: S,
    ) -> Self {
        self.keyed
            .insert((name.into(), streaming_key.into()), Arc::new(service));
        self
    }
}

impl From<HashMap<String, Service>> for ServiceScope {
    fn from(services: HashMap<String, Service>) -> Self {
        Self {
            services,
            keyed: HashMap::new(),
        }
    }
}

impl Scope for ServiceScope {
    fn resolve_service(&self, name: &str, provisions: &Provisions) -> Result<Service, InjectError> {
        let keyed = self
            .keyed
            .get(&(name.to_string(), provisions.streaming_key.clone()));

        keyed
            .or_else(|| self.services.get(name))
            .cloned()
            .ok_or_else(|| InjectError::ServiceNotFound(name.to_string()))
    }
}

/* ===================== Containers ===================== */

/// Resolved dependencies handed to a container factory, in declaration order
pub struct Dependencies<'a> {
    names: &'a [String],
    services: Vec<Service>,
    provisions: &'a Provisions,
}

impl Dependencies<'_> {
    /// Typed access to the dependency declared at `idx`
    pub fn get<S: Any + Send + Sync>(&self, idx: usize) -> Result<Arc<S>, InjectError> {
        let service = self
            .services
            .get(idx)
            .ok_or(InjectError::MissingDependency(idx))?;

        service
            .clone()
            .downcast::<S>()
            .map_err(|_| InjectError::TypeMismatch {
                service: self.names[idx].clone(),
                expected: type_name::<S>(),
            })
    }

    pub fn streaming_key(&self) -> &str {
        &self.provisions.streaming_key
    }
}

/// A factory producing `T` from named services
pub struct Container<T> {
    deps: Vec<String>,
    factory: Arc<dyn Fn(&Dependencies<'_>) -> Result<T, InjectError> + Send + Sync>,
}

impl<T> Container<T> {
    pub fn new<I, S, F>(deps: I, factory: F) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: Fn(&Dependencies<'_>) -> Result<T, InjectError> + Send + Sync + 'static,
    {
        Self {
            deps: deps.into_iter().map(Into::into).collect(),
            factory: Arc::new(factory),
        }
    }

    pub fn deps(&self) -> &[String] {
        &self.deps
    }
}

impl<T> Clone for Container<T> {
    fn clone(&self) -> Self {
        Self {
            deps: self.deps.clone(),
            factory: self.factory.clone(),
        }
    }
}

/* ===================== Callbacks ===================== */

/// Wrap a synchronous closure as a [`CallbackFn`]
pub fn callback_fn<A, T, F>(f: F) -> CallbackFn<A, T>
where
    A: Send + 'static,
    T: Send + 'static,
    F: Fn(A) -> anyhow::Result<T> + Send + Sync + 'static,
{
    Arc::new(move |args| future::ready(f(args)).boxed())
}

/// A script callback: a plain function or a DI-bound container
pub enum Callback<A, T> {
    Direct(CallbackFn<A, T>),
    Injected(Container<CallbackFn<A, T>>),
}

impl<A, T> Callback<A, T>
where
    A: Send + 'static,
    T: Send + 'static,
{
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(A) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        Callback::Direct(callback_fn(f))
    }

    pub fn from_async<F, Fut>(f: F) -> Self
    where
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        Callback::Direct(Arc::new(move |args| f(args).boxed()))
    }

    pub fn injected<I, S, F>(deps: I, factory: F) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: Fn(&Dependencies<'_>) -> Result<CallbackFn<A, T>, InjectError> + Send + Sync + 'static,
    {
        Callback::Injected(Container::new(deps, factory))
    }

    /// Turn the callback into something callable for this turn
    pub fn resolve(
        &self,
        scope: &dyn Scope,
        provisions: &Provisions,
    ) -> Result<CallbackFn<A, T>, InjectError> {
        match self {
            Callback::Direct(f) => Ok(f.clone()),
            Callback::Injected(container) => scope.inject_container(container, provisions),
        }
    }
}

impl<A, T> Clone for Callback<A, T> {
    fn clone(&self) -> Self {
        match self {
            Callback::Direct(f) => Callback::Direct(f.clone()),
            Callback::Injected(c) => Callback::Injected(c.clone()),
        }
    }
}

impl<A, T> fmt::Debug for Callback<A, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Callback::Direct(_) => write!(f, "Callback::Direct"),
            Callback::Injected(c) => write!(f, "Callback::Injected({:?})", c.deps),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use maplit::hashmap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Greeter {
        greeting: String,
    }

    #[tokio::test]
    async fn test_direct_callback_resolves_to_itself() {
        let cb: Callback<u32, u32> = Callback::from_fn(|n| Ok(n + 1));
        let scope = ServiceScope::new();

        let f = cb.resolve(&scope, &Provisions::new("u1")).unwrap();
        assert_eq!(f(41).await.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_async_callback() {
        let cb: Callback<String, usize> = Callback::from_async(|s: String| async move {
            tokio::task::yield_now().await;
            Ok(s.len())
        });
        let scope = ServiceScope::new();

        let f = cb.resolve(&scope, &Provisions::new("u1")).unwrap();
        assert_eq!(f("hello".to_string()).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_injected_callback_uses_services() {
        let cb: Callback<String, String> = Callback::injected(["greeter"], |deps| {
            let greeter = deps.get::<Greeter>(0)?;
            Ok(callback_fn(move |name: String| {
                Ok(format!("{}, {}", greeter.greeting, name))
            }))
        });

        let scope = ServiceScope::new().with_service(
            "greeter",
            Greeter {
                greeting: "hi".to_string(),
            },
        );

        let f = cb.resolve(&scope, &Provisions::new("u1")).unwrap();
        assert_eq!(f("bob".to_string()).await.unwrap(), "hi, bob");
    }

    #[tokio::test]
    async fn test_keyed_service_shadows_global() {
        let cb: Callback<(), String> = Callback::injected(["greeter"], |deps| {
            let greeter = deps.get::<Greeter>(0)?;
            Ok(callback_fn(move |_| Ok(greeter.greeting.clone())))
        });

        let scope = ServiceScope::new()
            .with_service("greeter", Greeter { greeting: "hello".to_string() })
            .with_keyed_service("greeter", "vip", Greeter { greeting: "welcome back".to_string() });

        let plain = cb.resolve(&scope, &Provisions::new("u1")).unwrap();
        let vip = cb.resolve(&scope, &Provisions::new("vip")).unwrap();

        assert_eq!(plain(()).await.unwrap(), "hello");
        assert_eq!(vip(()).await.unwrap(), "welcome back");
    }

    #[test]
    fn test_container_resolved_on_every_use() {
        let builds = Arc::new(AtomicUsize::new(0));
        let counter = builds.clone();
        let cb: Callback<(), ()> = Callback::injected(Vec::<String>::new(), move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(callback_fn(|_| Ok(())))
        });

        let scope = ServiceScope::new();
        cb.resolve(&scope, &Provisions::new("u1")).unwrap();
        cb.resolve(&scope, &Provisions::new("u1")).unwrap();

        assert_eq!(builds.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_missing_service() {
        let cb: Callback<(), ()> = Callback::injected(["db"], |_| Ok(callback_fn(|_| Ok(()))));
        let scope = ServiceScope::new();

        let Err(err) = cb.resolve(&scope, &Provisions::new("u1")) else {
            unreachable!("Expected ServiceNotFound");
        };
        assert!(matches!(err, InjectError::ServiceNotFound(name) if name == "db"));
    }

    #[test]
    fn test_service_type_mismatch() {
        let cb: Callback<(), ()> = Callback::injected(["greeter"], |deps| {
            deps.get::<Greeter>(0)?;
            Ok(callback_fn(|_| Ok(())))
        });
        let services: HashMap<String, Service> = hashmap! {
            "greeter".to_string() => Arc::new(7u32) as Service,
        };
        let scope = ServiceScope::from(services);

        let Err(err) = cb.resolve(&scope, &Provisions::new("u1")) else {
            unreachable!("Expected TypeMismatch");
        };
        assert!(matches!(err, InjectError::TypeMismatch { service, .. } if service == "greeter"));
    }

    #[test]
    fn test_dependencies_expose_streaming_key() {
        let cb: Callback<(), String> = Callback::injected(Vec::<String>::new(), |deps| {
            let key = deps.streaming_key().to_string();
            Ok(callback_fn(move |_| Ok(key.clone())))
        });
        let scope = ServiceScope::new();

        let f = cb.resolve(&scope, &Provisions::new("thread-9")).unwrap();
        let out = tokio_test::block_on(f(())).unwrap();
        assert_eq!(out, "thread-9");
    }
}
