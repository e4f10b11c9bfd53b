//! # Elements, Fibers, and Passes
//!
//! Ember renders a declarative element tree into a host-owned output tree
//! (a DOM, a widget tree, an in-memory document) through a small set of
//! mutation primitives. The work is split into units so a host can hand the
//! engine short slices of time and stay responsive while large trees render.
//!
//! - `Element`: immutable description of a node, rebuilt each render.
//! - `Fiber`: the persistent, double-buffered render tree and unit of work.
//! - `Engine`: owns both fiber generations, the work loop and the commit.
//! - `use_state`: positional component state carried across generations.
//!
//! ## Rendering
//!
//! ```rust,ignore
//! let mut engine = Engine::new(host);
//! engine.render(create_element("h1", None, children!["Hello"]), container)?;
//!
//! // one call per slice granted by the host
//! while engine.work_loop(&SliceBudget::new(Duration::from_millis(5)))? == WorkStatus::Pending {}
//! ```
//!
//! A pass does nothing visible until it is complete. Then every recorded
//! effect is applied to the host in one uninterrupted commit, and the new
//! generation becomes current.
//!
//! ## Components and state
//!
//! A component is a plain function from `&Props` to one `Element`. State is
//! held in hook cells on the component's fiber and addressed by call order:
//!
//! ```rust
//! use ember_core::*;
//!
//! fn Counter(_: &Props) -> Element {
//!     let (count, set_count) = use_state(0);
//!     Element::host("h1")
//!         .on("click", move |_| set_count.update(|c| c + 1))
//!         .with_children(children!["Count: ", count])
//! }
//!
//! let app = Element::component(Counter, Props::new());
//! assert!(matches!(app.kind(), ElementKind::Component(_)));
//! ```
//!
//! Calling a setter queues the update and asks the engine for a new pass
//! from the committed root. A pass still in progress at that moment is
//! dropped and started over.
//!
//! ## Limits
//!
//! Children are matched by position, not by key. Placements are appended to
//! the end of their parent. One pass is in flight at a time; there is no
//! priority between updates.

pub mod commit;
pub mod element;
pub mod error;
pub mod fiber;
pub mod hooks;
pub mod host;
pub mod prelude;
pub mod props;
mod reconcile;
pub mod runtime;
pub mod scheduler;
pub mod slice;
pub mod tests;

pub use commit::*;
pub use element::*;
pub use error::*;
pub use fiber::*;
pub use hooks::*;
pub use host::*;
pub use props::*;
pub use runtime::*;
pub use scheduler::*;
pub use slice::*;
