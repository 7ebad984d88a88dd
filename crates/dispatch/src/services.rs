//! A minimal service locator with two lifetimes.
//!
//! Services are keyed by their [`TypeId`] and created by a factory. A [`Lifetime::Singleton`]
//! service is created at most once per [`ServiceProvider`], a [`Lifetime::Scoped`] one at most
//! once per [`Scope`]. Each request gets its own scope, which is released exactly once, either
//! explicitly through [`Scope::release`] or when the last handle is dropped.

use crate::error::DependencyError;
use once_cell::sync::OnceCell;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, trace};

type Instance = Arc<dyn Any + Send + Sync>;
type Factory = Arc<dyn Fn(&Scope) -> Result<Instance, DependencyError> + Send + Sync>;

/// A type that knows how to build itself from the services of a scope.
///
/// This is the constructor injection hook: a controller or a middleware lists its dependencies
/// by resolving them here.
pub trait Injectable: Sized + Send + Sync + 'static {
    fn inject(scope: &Scope) -> Result<Self, DependencyError>;
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Lifetime {
    /// one instance for the whole process
    Singleton,
    /// one instance per request scope
    Scoped,
}

struct Registration {
    type_id: TypeId,
    type_name: &'static str,
    lifetime: Lifetime,
    factory: Factory,
    singleton: OnceCell<Instance>,
}

/// Service registrations, filled in at startup.
#[derive(Default)]
pub struct ServiceCollection {
    registrations: HashMap<TypeId, Registration>,
}

impl fmt::Debug for ServiceCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceCollection").field("registrations", &self.registrations.len()).finish()
    }
}

impl ServiceCollection {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert<T, F>(&mut self, lifetime: Lifetime, factory: F) -> &mut Self
    where
        T: Send + Sync + 'static,
        F: Fn(&Scope) -> Result<T, DependencyError> + Send + Sync + 'static,
    {
        let type_name = std::any::type_name::<T>();
        let factory: Factory = Arc::new(move |scope| factory(scope).map(|t| Arc::new(t) as Instance));
        debug!(service = type_name, ?lifetime, "register service");
        self.registrations
            .insert(TypeId::of::<T>(), Registration {
                type_id: TypeId::of::<T>(),
                type_name,
                lifetime,
                factory,
                singleton: OnceCell::new(),
            });
        self
    }

    pub fn add_singleton<T: Injectable>(&mut self) -> &mut Self {
        self.insert::<T, _>(Lifetime::Singleton, T::inject)
    }

    pub fn add_singleton_with<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: Send + Sync + 'static,
        F: Fn(&Scope) -> Result<T, DependencyError> + Send + Sync + 'static,
    {
        self.insert::<T, _>(Lifetime::Singleton, factory)
    }

    /// Registers an already built instance as a singleton.
    pub fn add_singleton_instance<T: Send + Sync + 'static>(&mut self, instance: T) -> &mut Self {
        let type_name = std::any::type_name::<T>();
        let instance: Instance = Arc::new(instance);
        let cell = OnceCell::with_value(Arc::clone(&instance));
        let factory: Factory = Arc::new(move |_| Ok(Arc::clone(&instance)));
        debug!(service = type_name, lifetime = ?Lifetime::Singleton, "register service instance");
        self.registrations.insert(
            TypeId::of::<T>(),
            Registration { type_id: TypeId::of::<T>(), type_name, lifetime: Lifetime::Singleton, factory, singleton: cell },
        );
        self
    }

    pub fn add_scoped<T: Injectable>(&mut self) -> &mut Self {
        self.insert::<T, _>(Lifetime::Scoped, T::inject)
    }

    pub fn add_scoped_with<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: Send + Sync + 'static,
        F: Fn(&Scope) -> Result<T, DependencyError> + Send + Sync + 'static,
    {
        self.insert::<T, _>(Lifetime::Scoped, factory)
    }

    /// Registers `T` as scoped unless something is already registered for it.
    pub fn try_add_scoped<T: Injectable>(&mut self) -> &mut Self {
        if !self.contains::<T>() {
            self.add_scoped::<T>();
        }
        self
    }

    pub fn contains<T: 'static>(&self) -> bool {
        self.registrations.contains_key(&TypeId::of::<T>())
    }

    pub fn lifetime_of<T: 'static>(&self) -> Option<Lifetime> {
        self.registrations.get(&TypeId::of::<T>()).map(|r| r.lifetime)
    }

    pub fn build(self) -> ServiceProvider {
        ServiceProvider { inner: Arc::new(self) }
    }
}

/// The frozen, shareable set of registrations and the singleton instances created from them.
#[derive(Clone, Debug)]
pub struct ServiceProvider {
    inner: Arc<ServiceCollection>,
}

impl ServiceProvider {
    pub fn create_scope(&self) -> Scope {
        trace!("create service scope");
        Scope {
            inner: Arc::new(ScopeInner {
                provider: self.clone(),
                instances: Mutex::new(HashMap::new()),
                released: AtomicBool::new(false),
            }),
        }
    }
}

impl Default for ServiceProvider {
    fn default() -> Self {
        ServiceCollection::new().build()
    }
}

/// A per-request lifetime boundary.
///
/// Cloning a scope hands out another handle to the same boundary.
#[derive(Clone)]
pub struct Scope {
    inner: Arc<ScopeInner>,
}

struct ScopeInner {
    provider: ServiceProvider,
    instances: Mutex<HashMap<TypeId, Instance>>,
    released: AtomicBool,
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope").field("released", &self.is_released()).finish_non_exhaustive()
    }
}

impl Scope {
    pub fn resolve<T: Send + Sync + 'static>(&self) -> Result<Arc<T>, DependencyError> {
        let type_name = std::any::type_name::<T>();
        if self.is_released() {
            return Err(DependencyError::ScopeReleased { type_name });
        }

        let registration = self
            .inner
            .provider
            .inner
            .registrations
            .get(&TypeId::of::<T>())
            .ok_or(DependencyError::NotRegistered { type_name })?;

        let instance = match registration.lifetime {
            Lifetime::Singleton => {
                Arc::clone(registration.singleton.get_or_try_init(|| (registration.factory)(self))?)
            }
            Lifetime::Scoped => self.resolve_scoped(registration)?,
        };

        instance.downcast::<T>().map_err(|_instance| DependencyError::TypeMismatch { type_name })
    }

    fn resolve_scoped(&self, registration: &Registration) -> Result<Instance, DependencyError> {
        let type_id = registration.type_id;
        if let Some(instance) = self.lock_instances().get(&type_id) {
            return Ok(Arc::clone(instance));
        }

        // the factory may resolve other scoped services, so the map is not locked while it runs
        trace!(service = registration.type_name, "create scoped instance");
        let created = (registration.factory)(self)?;
        let mut instances = self.lock_instances();
        let instance = instances.entry(type_id).or_insert(created);
        Ok(Arc::clone(instance))
    }

    fn lock_instances(&self) -> std::sync::MutexGuard<'_, HashMap<TypeId, Instance>> {
        self.inner.instances.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Drops every scoped instance. Only the first call has an effect.
    pub fn release(&self) {
        if self.inner.released.swap(true, Ordering::AcqRel) {
            return;
        }
        let instances = std::mem::take(&mut *self.lock_instances());
        trace!(instances = instances.len(), "release service scope");
        drop(instances);
    }

    pub fn is_released(&self) -> bool {
        self.inner.released.load(Ordering::Acquire)
    }
}

impl Drop for ScopeInner {
    fn drop(&mut self) {
        if !self.released.swap(true, Ordering::AcqRel) {
            let instances = std::mem::take(self.instances.get_mut().unwrap_or_else(PoisonError::into_inner));
            trace!(instances = instances.len(), "release service scope on drop");
        }
    }
}
