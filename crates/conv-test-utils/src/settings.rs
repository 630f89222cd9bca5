//! Temporary content roots with settings files.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use conv_core::settings::{GLOBAL_FILE_NAME, LOCAL_FILE_NAME};
use conv_core::SettingsResolver;
use tempfile::TempDir;

/// A content root and a global settings directory, both temporary, plus a
/// fake environment.
///
/// # Example
///
/// ```rust,no_run
/// use conv_test_utils::SettingsFixture;
///
/// let fixture = SettingsFixture::new()
///     .with_local("[host]\nenvironment = \"Staging\"\n")
///     .with_env("CONVENTIONS_HOST_TYPE", "unit-test");
/// let settings = fixture.resolver().resolve().unwrap();
/// assert_eq!(settings.environment_name(), "Staging");
/// ```
pub struct SettingsFixture {
    content_root: TempDir,
    global_dir: TempDir,
    env: HashMap<String, String>,
}

impl Default for SettingsFixture {
    fn default() -> Self {
        Self::new()
    }
}

impl SettingsFixture {
    pub fn new() -> Self {
        Self {
            content_root: TempDir::new().expect("SettingsFixture: failed to create content root"),
            global_dir: TempDir::new().expect("SettingsFixture: failed to create global dir"),
            env: HashMap::new(),
        }
    }

    pub fn content_root(&self) -> &Path {
        self.content_root.path()
    }

    pub fn global_dir(&self) -> &Path {
        self.global_dir.path()
    }

    /// Write the content-root settings file.
    pub fn with_local(self, content: &str) -> Self {
        fs::write(self.content_root().join(LOCAL_FILE_NAME), content)
            .expect("SettingsFixture: failed to write local settings");
        self
    }

    /// Write the global settings file.
    pub fn with_global(self, content: &str) -> Self {
        fs::write(self.global_dir().join(GLOBAL_FILE_NAME), content)
            .expect("SettingsFixture: failed to write global settings");
        self
    }

    pub fn with_env(mut self, name: &str, value: &str) -> Self {
        self.env.insert(name.to_string(), value.to_string());
        self
    }

    /// A resolver reading only this fixture's files and environment.
    pub fn resolver(&self) -> SettingsResolver {
        let env = self.env.clone();
        SettingsResolver::new(self.content_root())
            .with_global_config_dir(self.global_dir())
            .with_env_lookup(move |name| env.get(name).cloned())
    }
}
