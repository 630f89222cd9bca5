//! Non-fatal findings collected while building a plan

use std::fmt;

use crate::id::{ContractKind, ConventionId};

/// Something worth reporting that did not stop the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// A module's exports could not be loaded; it contributes nothing.
    DiscoveryFailure { module: String, reason: String },
    /// A later registration with an identity already in the catalog.
    DuplicateIgnored {
        id: ConventionId,
        contract: ContractKind,
    },
    /// Entries whose ordering constraints could not be satisfied. They run
    /// after every resolved entry, in priority then declaration order.
    OrderingCycle { members: Vec<ConventionId> },
}

impl Diagnostic {
    /// Informational diagnostics do not indicate a problem with the input.
    pub fn is_informational(&self) -> bool {
        matches!(self, Diagnostic::DuplicateIgnored { .. })
    }

    pub(crate) fn log(&self) {
        if self.is_informational() {
            tracing::debug!(diagnostic = %self, "Convention diagnostic");
        } else {
            tracing::warn!(diagnostic = %self, "Convention diagnostic");
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::DiscoveryFailure { module, reason } => {
                write!(f, "module {module} skipped: {reason}")
            }
            Diagnostic::DuplicateIgnored { id, contract } => {
                write!(f, "duplicate {contract} convention {id} ignored")
            }
            Diagnostic::OrderingCycle { members } => {
                let names: Vec<&str> = members.iter().map(|id| id.name()).collect();
                write!(f, "unresolved ordering cycle: {}", names.join(", "))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let cycle = Diagnostic::OrderingCycle {
            members: vec![ConventionId::named("a"), ConventionId::named("b")],
        };
        assert_eq!(cycle.to_string(), "unresolved ordering cycle: a, b");
        assert!(!cycle.is_informational());

        let duplicate = Diagnostic::DuplicateIgnored {
            id: ConventionId::named("core"),
            contract: ContractKind::Services,
        };
        assert_eq!(duplicate.to_string(), "duplicate services convention core ignored");
        assert!(duplicate.is_informational());
    }
}
