pub use crate::children;
pub use crate::commit::CommitReport;
pub use crate::element::{
    Child, Component, Element, ElementKind, create_element, create_text_element,
};
pub use crate::error::{EngineError, HookError, HostError};
pub use crate::fiber::{EffectTag, FiberId, FiberKind};
pub use crate::hooks::{SetState, try_use_state, use_state};
pub use crate::host::{HostAdapter, NodeKind};
pub use crate::props::{Event, EventHandler, PropValue, Props};
pub use crate::runtime::{Engine, EngineConfig};
pub use crate::scheduler::{SchedulerState, WorkStatus};
pub use crate::slice::{Deadline, SliceBudget, Unbounded, UnitBudget};
