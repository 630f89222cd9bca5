//! Handle to a realized host
//!
//! Host-created conventions run after the host exists. The host type belongs
//! to whoever built it, so conventions receive a type-erased borrow and
//! downcast to the type they expect.

use std::any::{Any, type_name};
use std::fmt;

#[derive(Clone, Copy)]
pub struct HostHandle<'a> {
    host: &'a (dyn Any + Send + Sync),
    type_name: &'static str,
}

impl<'a> HostHandle<'a> {
    pub fn new<H: Any + Send + Sync>(host: &'a H) -> Self {
        Self {
            host,
            type_name: type_name::<H>(),
        }
    }

    pub fn downcast_ref<H: Any>(&self) -> Option<&'a H> {
        self.host.downcast_ref::<H>()
    }

    pub fn is<H: Any>(&self) -> bool {
        self.host.is::<H>()
    }

    /// Type name of the host, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Debug for HostHandle<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostHandle")
            .field("type", &self.type_name)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct DemoHost {
        name: &'static str,
    }

    #[test]
    fn test_downcast_to_host_type() {
        let host = DemoHost { name: "demo" };
        let handle = HostHandle::new(&host);

        assert!(handle.is::<DemoHost>());
        assert_eq!(handle.downcast_ref::<DemoHost>().unwrap().name, "demo");
        assert!(handle.downcast_ref::<String>().is_none());
        assert!(handle.type_name().ends_with("DemoHost"));
    }
}
