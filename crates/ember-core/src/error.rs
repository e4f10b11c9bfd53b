use thiserror::Error;

use crate::fiber::FiberId;

/// Failure reported by a [`HostAdapter`](crate::HostAdapter).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    #[error("unsupported node kind `{0}`")]
    UnsupportedKind(String),
    #[error("unknown output node {0}")]
    UnknownNode(String),
    #[error("node {child} is not a child of {parent}")]
    NotAChild { parent: String, child: String },
    #[error("host rejected the operation: {0}")]
    Rejected(String),
}

/// Misuse of the hook API. Hooks are addressed by call order, so any of these
/// means state would otherwise be attributed to the wrong cell.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HookError {
    #[error("hooks can only be called while a component is rendering")]
    OutsideRender,
    #[error(
        "hook order violation in `{component}`: slot {index} holds a different kind of state than `{expected}`"
    )]
    KindMismatch {
        component: &'static str,
        index: usize,
        expected: &'static str,
    },
    #[error(
        "hook order violation in `{component}`: rendered {found} hooks, previous render used {expected}"
    )]
    CountMismatch {
        component: &'static str,
        expected: usize,
        found: usize,
    },
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Hook(#[from] HookError),
    #[error(transparent)]
    Host(#[from] HostError),
    /// Remaining commit effects were skipped and the applied ones folded
    /// back into the committed tree.
    #[error("commit aborted")]
    Commit {
        #[source]
        source: HostError,
    },
    #[error("unsupported element kind `{tag}`")]
    UnsupportedElement { tag: String },
    #[error("engine has been torn down")]
    TornDown,
    #[error("fiber {0:?} is missing from the arena")]
    MissingFiber(FiberId),
    /// A root or component fiber was handed to host-node preparation.
    #[error("fiber {0:?} ({1}) cannot own an output node")]
    NotAHostFiber(FiberId, &'static str),
}
