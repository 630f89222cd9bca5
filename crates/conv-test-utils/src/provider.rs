//! Minimal service container for tests.
//!
//! Resolution is last-registration-wins, which is what most hosts do and what
//! ordering tests need to observe.

use std::sync::Arc;

use conv_contracts::{
    BoxError, Configuration, ServiceCollection, ServiceDescriptor, ServiceProviderFactory,
};

/// Resolves services from a finished [`ServiceCollection`].
#[derive(Debug, Clone)]
pub struct SimpleServiceProvider {
    descriptors: Vec<ServiceDescriptor>,
    configuration: Configuration,
}

impl SimpleServiceProvider {
    pub fn new(services: ServiceCollection, configuration: Configuration) -> Self {
        Self {
            descriptors: services.into_iter().collect(),
            configuration,
        }
    }

    /// The last registration of `T`.
    pub fn get<T: ?Sized + Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.descriptors.iter().rev().find_map(|d| d.resolve::<T>())
    }

    /// Like [`get`](Self::get), panicking with the service name when absent.
    pub fn required<T: ?Sized + Send + Sync + 'static>(&self) -> Arc<T> {
        self.get::<T>().unwrap_or_else(|| {
            panic!(
                "service {} is not registered",
                std::any::type_name::<T>()
            )
        })
    }

    /// Every registration of `T`, in registration order.
    pub fn get_all<T: ?Sized + Send + Sync + 'static>(&self) -> Vec<Arc<T>> {
        self.descriptors
            .iter()
            .filter_map(|d| d.resolve::<T>())
            .collect()
    }

    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

/// Factory producing [`SimpleServiceProvider`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleProviderFactory;

impl ServiceProviderFactory for SimpleProviderFactory {
    type Provider = SimpleServiceProvider;

    fn create(
        &self,
        services: ServiceCollection,
        configuration: &Configuration,
    ) -> Result<SimpleServiceProvider, BoxError> {
        Ok(SimpleServiceProvider::new(services, configuration.clone()))
    }
}
