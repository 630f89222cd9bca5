//! Service registration contract
//!
//! Service conventions describe registrations in a [`ServiceCollection`].
//! Turning the collection into something that resolves services is the job
//! of the host's container, reached through [`ServiceProviderFactory`].

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

use crate::configuration::Configuration;
use crate::error::BoxError;

/// How long a resolved service lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceLifetime {
    /// One shared instance for the lifetime of the container.
    Singleton,
    /// A new instance for every resolution.
    Transient,
}

/// Type-erased `Arc<T>` for some service type `T`.
pub type ServiceInstance = Arc<dyn Any + Send + Sync>;

type Factory = Arc<dyn Fn() -> ServiceInstance + Send + Sync>;

/// How a descriptor produces its service.
#[derive(Clone)]
pub enum Implementation {
    /// A pre-built instance, boxed as `Arc<T>` inside the `Any`.
    Instance(ServiceInstance),
    /// A factory producing a fresh `Arc<T>` inside the `Any`.
    Factory(Factory),
}

/// A single registration.
#[derive(Clone)]
pub struct ServiceDescriptor {
    service_type: TypeId,
    service_name: &'static str,
    lifetime: ServiceLifetime,
    implementation: Implementation,
}

impl ServiceDescriptor {
    pub fn service_type(&self) -> TypeId {
        self.service_type
    }

    pub fn service_name(&self) -> &'static str {
        self.service_name
    }

    pub fn lifetime(&self) -> ServiceLifetime {
        self.lifetime
    }

    pub fn implementation(&self) -> &Implementation {
        &self.implementation
    }

    /// Produce an instance of the service, if `T` is the registered type.
    pub fn resolve<T: ?Sized + Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        if self.service_type != TypeId::of::<T>() {
            return None;
        }
        let instance = match &self.implementation {
            Implementation::Instance(instance) => Arc::clone(instance),
            Implementation::Factory(factory) => factory(),
        };
        instance.downcast_ref::<Arc<T>>().cloned()
    }
}

impl fmt::Debug for ServiceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceDescriptor")
            .field("service", &self.service_name)
            .field("lifetime", &self.lifetime)
            .finish()
    }
}

/// Ordered registrations. Later registrations of the same service type do
/// not replace earlier ones; which one wins is up to the container.
#[derive(Debug, Clone, Default)]
pub struct ServiceCollection {
    descriptors: Vec<ServiceDescriptor>,
}

impl ServiceCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, descriptor: ServiceDescriptor) -> &mut Self {
        self.descriptors.push(descriptor);
        self
    }

    /// Register a shared instance of `T`.
    pub fn add_singleton<T: ?Sized + Send + Sync + 'static>(&mut self, instance: Arc<T>) -> &mut Self {
        let erased: ServiceInstance = Arc::new(instance);
        self.add(ServiceDescriptor {
            service_type: TypeId::of::<T>(),
            service_name: std::any::type_name::<T>(),
            lifetime: ServiceLifetime::Singleton,
            implementation: Implementation::Instance(erased),
        })
    }

    /// Register a factory producing a fresh `T` on every resolution.
    pub fn add_transient<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn() -> Arc<T> + Send + Sync + 'static,
    {
        let factory: Factory = Arc::new(move || Arc::new(factory()) as ServiceInstance);
        self.add(ServiceDescriptor {
            service_type: TypeId::of::<T>(),
            service_name: std::any::type_name::<T>(),
            lifetime: ServiceLifetime::Transient,
            implementation: Implementation::Factory(factory),
        })
    }

    /// Register a shared instance of `T` unless `T` is already registered.
    ///
    /// Returns `true` when the registration was added.
    pub fn try_add_singleton<T: ?Sized + Send + Sync + 'static>(&mut self, instance: Arc<T>) -> bool {
        if self.contains::<T>() {
            return false;
        }
        self.add_singleton(instance);
        true
    }

    pub fn contains<T: ?Sized + 'static>(&self) -> bool {
        let id = TypeId::of::<T>();
        self.descriptors.iter().any(|d| d.service_type == id)
    }

    /// Registrations for `T`, in registration order.
    pub fn descriptors_for<T: ?Sized + 'static>(&self) -> Vec<&ServiceDescriptor> {
        let id = TypeId::of::<T>();
        self.descriptors
            .iter()
            .filter(|d| d.service_type == id)
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ServiceDescriptor> {
        self.descriptors.iter()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

impl IntoIterator for ServiceCollection {
    type Item = ServiceDescriptor;
    type IntoIter = std::vec::IntoIter<ServiceDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.descriptors.into_iter()
    }
}

/// Turns a finished [`ServiceCollection`] into the host's container.
pub trait ServiceProviderFactory {
    type Provider;

    fn create(
        &self,
        services: ServiceCollection,
        configuration: &Configuration,
    ) -> Result<Self::Provider, BoxError>;
}
