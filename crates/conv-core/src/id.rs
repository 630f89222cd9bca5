//! Convention identities and contract kinds

use std::any::{TypeId, type_name};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_UNIQUE: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, Copy)]
enum Key {
    Type(TypeId),
    Name,
    Unique(u64),
}

/// Identity of a convention.
///
/// Instance conventions are identified by their concrete type. Delegates
/// that capture nothing (function items and capture-free closures) are
/// identified by the function's type, so registering the same function twice
/// yields the same identity. A delegate that captures state gets an identity
/// of its own when it is created; clones of that delegate share it.
/// Conventions that need a stable handle independent of Rust types can use
/// [`ConventionId::named`].
///
/// Equality and hashing use the identity only; the name is for display and
/// for name-based exclusion.
#[derive(Debug, Clone, Copy)]
pub struct ConventionId {
    key: Key,
    name: &'static str,
}

impl ConventionId {
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            key: Key::Type(TypeId::of::<T>()),
            name: type_name::<T>(),
        }
    }

    /// Identity of a value's type; use it to refer to a capture-free
    /// delegate function. Capturing delegates are referred to through
    /// [`Delegate::id`](crate::Delegate::id) or a [`named`](Self::named) id.
    pub fn of_val<T: 'static>(_value: &T) -> Self {
        Self::of::<T>()
    }

    /// A fresh identity equal only to itself and its copies.
    pub fn unique(name: &'static str) -> Self {
        Self {
            key: Key::Unique(NEXT_UNIQUE.fetch_add(1, Ordering::Relaxed)),
            name,
        }
    }

    pub const fn named(name: &'static str) -> Self {
        Self {
            key: Key::Name,
            name,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The name without its leading module path, for compact display and
    /// name-based exclusion.
    ///
    /// Only the path before the first `<` is removed, so `app::Wrap<app::Db>`
    /// becomes `Wrap<app::Db>`.
    pub fn short_name(&self) -> &'static str {
        match self.key {
            Key::Name => self.name,
            Key::Type(_) | Key::Unique(_) => {
                let base = self.name.split('<').next().unwrap_or(self.name);
                match base.rfind("::") {
                    Some(idx) => &self.name[idx + 2..],
                    None => self.name,
                }
            }
        }
    }
}

impl PartialEq for ConventionId {
    fn eq(&self, other: &Self) -> bool {
        match (self.key, other.key) {
            (Key::Type(a), Key::Type(b)) => a == b,
            (Key::Name, Key::Name) => self.name == other.name,
            (Key::Unique(a), Key::Unique(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for ConventionId {}

impl Hash for ConventionId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self.key {
            Key::Type(id) => {
                0u8.hash(state);
                id.hash(state);
            }
            Key::Name => {
                1u8.hash(state);
                self.name.hash(state);
            }
            Key::Unique(id) => {
                2u8.hash(state);
                id.hash(state);
            }
        }
    }
}

impl fmt::Display for ConventionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// The builder contract a convention registers against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ContractKind {
    /// Runs first, against the context alone.
    Setup,
    /// Adds configuration sources.
    Configuration,
    /// Registers services, with the built configuration available.
    Services,
    /// Contributes to the command-line tree.
    CommandLine,
    /// Adjusts logging.
    Logging,
    /// Enables background-job extensions.
    WebJobs,
    /// Runs once the host has been built.
    HostCreated,
}

impl ContractKind {
    pub const ALL: [ContractKind; 7] = [
        ContractKind::Setup,
        ContractKind::Configuration,
        ContractKind::Services,
        ContractKind::CommandLine,
        ContractKind::Logging,
        ContractKind::WebJobs,
        ContractKind::HostCreated,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Setup => "setup",
            Self::Configuration => "configuration",
            Self::Services => "services",
            Self::CommandLine => "command-line",
            Self::Logging => "logging",
            Self::WebJobs => "webjobs",
            Self::HostCreated => "host-created",
        }
    }
}

impl fmt::Display for ContractKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
