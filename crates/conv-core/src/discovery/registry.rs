//! Module registrations and sources
//!
//! Each crate that exports conventions submits one [`ModuleRegistration`]
//! through [`export_conventions!`](crate::export_conventions). The linker
//! gathers every submission into a process-wide list that [`InventorySource`]
//! reads; the list is fixed once the process starts.

use std::fmt;
use std::sync::Arc;

use conv_contracts::BoxError;

use crate::entry::ConventionEntry;

/// Produces a module's exported entries.
pub type ExportFn = fn() -> Result<Vec<ConventionEntry>, BoxError>;

/// Link-time registration of one module.
pub struct ModuleRegistration {
    /// Module name, usually the crate's package name.
    pub name: &'static str,
    /// Names of the modules this one references.
    pub references: &'static [&'static str],
    pub exports: ExportFn,
}

inventory::collect!(ModuleRegistration);

/// Register the calling crate's conventions for discovery.
///
/// The module is named after the calling crate's package name unless `name`
/// is given.
///
/// ```ignore
/// fn exports() -> Result<Vec<ConventionEntry>, BoxError> {
///     Ok(vec![ConventionEntry::services(CoreServices)])
/// }
///
/// conv_core::export_conventions!(references: ["app-core"], exports: exports);
/// ```
#[macro_export]
macro_rules! export_conventions {
    (name: $name:expr, references: [$($reference:expr),* $(,)?], exports: $exports:expr $(,)?) => {
        $crate::inventory::submit! {
            $crate::discovery::ModuleRegistration {
                name: $name,
                references: &[$($reference),*],
                exports: $exports,
            }
        }
    };
    (references: [$($reference:expr),* $(,)?], exports: $exports:expr $(,)?) => {
        $crate::export_conventions!(
            name: env!("CARGO_PKG_NAME"),
            references: [$($reference),*],
            exports: $exports,
        );
    };
    (exports: $exports:expr $(,)?) => {
        $crate::export_conventions!(
            name: env!("CARGO_PKG_NAME"),
            references: [],
            exports: $exports,
        );
    };
}

type Exports = Arc<dyn Fn() -> Result<Vec<ConventionEntry>, BoxError> + Send + Sync>;

/// A loadable module: a name, its references, and a way to load its exports.
#[derive(Clone)]
pub struct ModuleHandle {
    name: String,
    references: Vec<String>,
    exports: Exports,
}

impl ModuleHandle {
    pub fn new<F>(name: impl Into<String>, exports: F) -> Self
    where
        F: Fn() -> Result<Vec<ConventionEntry>, BoxError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            references: Vec::new(),
            exports: Arc::new(exports),
        }
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.references.push(reference.into());
        self
    }

    pub fn with_references<I, S>(mut self, references: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.references.extend(references.into_iter().map(Into::into));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn references(&self) -> &[String] {
        &self.references
    }

    /// Load the module's exported entries.
    pub fn load(&self) -> Result<Vec<ConventionEntry>, BoxError> {
        (self.exports)()
    }
}

impl From<&ModuleRegistration> for ModuleHandle {
    fn from(registration: &ModuleRegistration) -> Self {
        let exports = registration.exports;
        ModuleHandle::new(registration.name, exports)
            .with_references(registration.references.iter().copied())
    }
}

impl fmt::Debug for ModuleHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleHandle")
            .field("name", &self.name)
            .field("references", &self.references)
            .finish_non_exhaustive()
    }
}

/// Lists the modules available for discovery.
pub trait ModuleSource: Send + Sync {
    fn modules(&self) -> Vec<ModuleHandle>;
}

/// Every module registered with `export_conventions!` in this binary.
#[derive(Debug, Default, Clone, Copy)]
pub struct InventorySource;

impl ModuleSource for InventorySource {
    fn modules(&self) -> Vec<ModuleHandle> {
        let mut modules = Vec::new();
        for registration in inventory::iter::<ModuleRegistration> {
            modules.push(ModuleHandle::from(registration));
        }
        modules
    }
}

/// An explicit module list.
#[derive(Debug, Default, Clone)]
pub struct StaticModuleSource {
    modules: Vec<ModuleHandle>,
}

impl StaticModuleSource {
    pub fn new(modules: impl IntoIterator<Item = ModuleHandle>) -> Self {
        Self {
            modules: modules.into_iter().collect(),
        }
    }

    pub fn with_module(mut self, module: ModuleHandle) -> Self {
        self.modules.push(module);
        self
    }
}

impl ModuleSource for StaticModuleSource {
    fn modules(&self) -> Vec<ModuleHandle> {
        self.modules.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::Delegate;

    fn exports() -> Result<Vec<ConventionEntry>, BoxError> {
        Ok(vec![Delegate::setup(|_| Ok(())).named("registry-test").into()])
    }

    crate::export_conventions!(
        name: "conv-core-registry-test",
        references: ["conv-core"],
        exports: exports,
    );

    #[test]
    fn test_inventory_lists_submitted_module() {
        let modules = InventorySource.modules();
        let module = modules
            .iter()
            .find(|m| m.name() == "conv-core-registry-test")
            .expect("registration should be collected");

        assert_eq!(module.references(), &["conv-core".to_string()]);
        assert_eq!(module.load().unwrap().len(), 1);
    }

    #[test]
    fn test_static_source_keeps_order() {
        let source = StaticModuleSource::new([ModuleHandle::new("a", || Ok(Vec::new()))])
            .with_module(ModuleHandle::new("b", || Ok(Vec::new())).with_reference("a"));

        let names: Vec<String> = source.modules().iter().map(|m| m.name().to_string()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }
}
