//! WebJobs contract
//!
//! Background-job hosts expose named extensions (triggers, bindings) that
//! WebJobs conventions enable and configure.

use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebJobsExtension {
    pub name: String,
    pub settings: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default)]
pub struct WebJobsBuilder {
    extensions: Vec<WebJobsExtension>,
}

impl WebJobsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable an extension. Enabling the same name twice keeps one entry.
    pub fn add_extension(&mut self, name: impl Into<String>) -> &mut Self {
        let name = name.into();
        if !self.has_extension(&name) {
            self.extensions.push(WebJobsExtension {
                name,
                settings: BTreeMap::new(),
            });
        }
        self
    }

    /// Set a setting on an extension, enabling it if needed.
    pub fn configure_extension(
        &mut self,
        name: &str,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> &mut Self {
        self.add_extension(name);
        if let Some(extension) = self.extensions.iter_mut().find(|e| e.name == name) {
            extension.settings.insert(key.into(), value.into());
        }
        self
    }

    pub fn has_extension(&self, name: &str) -> bool {
        self.extensions.iter().any(|e| e.name == name)
    }

    pub fn extension(&self, name: &str) -> Option<&WebJobsExtension> {
        self.extensions.iter().find(|e| e.name == name)
    }

    pub fn extensions(&self) -> &[WebJobsExtension] {
        &self.extensions
    }
}
