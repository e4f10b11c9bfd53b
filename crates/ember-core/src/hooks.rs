//! # Hooks
//!
//! Component state lives in hook cells stored on the component's fiber. A
//! cell is found by position: the Nth `use_state` call of a render reads the
//! Nth cell of the same fiber's previous generation. Call order must therefore
//! be identical on every render of a component. The engine checks this and
//! aborts the pass with a [`HookError`] instead of handing state to the wrong
//! call.
//!
//! ```rust
//! use ember_core::*;
//!
//! fn Counter(_: &Props) -> Element {
//!     let (count, set_count) = use_state(0);
//!     Element::host("button")
//!         .on("click", move |_| set_count.update(|c| c + 1))
//!         .with_children(children!["Count: ", count])
//! }
//! # let _ = Element::component(Counter, Props::new());
//! ```

use std::any::{Any, type_name};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::element::{Component, Element};
use crate::error::HookError;
use crate::props::Props;

thread_local! {
    static FRAME: RefCell<Option<HookFrame>> = const { RefCell::new(None) };
}

/// Flag shared between the engine and every state setter. Setting it asks
/// the engine to start a new pass from the committed root.
#[derive(Debug, Default)]
pub struct RenderRequest {
    pending: Cell<bool>,
    total: Cell<u64>,
}

impl RenderRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.pending.set(true);
        self.total.set(self.total.get() + 1);
    }

    pub fn is_pending(&self) -> bool {
        self.pending.get()
    }

    /// Number of requests made so far.
    pub fn total(&self) -> u64 {
        self.total.get()
    }

    pub(crate) fn take(&self) -> bool {
        self.pending.replace(false)
    }
}

type Updater<T> = Rc<dyn Fn(&T) -> T>;
type Queue<T> = Rc<RefCell<Vec<Updater<T>>>>;

struct StateCell<T> {
    state: T,
    queue: Queue<T>,
}

struct HookFrame {
    component: &'static str,
    old: Vec<Rc<dyn Any>>,
    new: Vec<Rc<dyn Any>>,
    request: Rc<RenderRequest>,
    error: Option<HookError>,
}

/// Installs a frame for one component call and puts back whatever was there
/// before, even if the component panics.
struct RenderGuard {
    prev: Option<HookFrame>,
    finished: bool,
}

impl RenderGuard {
    fn install(frame: HookFrame) -> Self {
        let prev = FRAME.with(|f| f.borrow_mut().replace(frame));
        Self {
            prev,
            finished: false,
        }
    }

    fn finish(mut self) -> Option<HookFrame> {
        self.finished = true;
        let prev = self.prev.take();
        FRAME.with(|f| std::mem::replace(&mut *f.borrow_mut(), prev))
    }
}

impl Drop for RenderGuard {
    fn drop(&mut self) {
        if !self.finished {
            let prev = self.prev.take();
            FRAME.with(|f| *f.borrow_mut() = prev);
        }
    }
}

/// Calls `component` with `old` as the previous generation's hook cells.
/// Returns the rendered element and the new cells.
pub(crate) fn render_component(
    component: &Component,
    props: &Props,
    old: Vec<Rc<dyn Any>>,
    request: Rc<RenderRequest>,
) -> Result<(Element, Vec<Rc<dyn Any>>), HookError> {
    let guard = RenderGuard::install(HookFrame {
        component: component.name(),
        old,
        new: Vec::new(),
        request,
        error: None,
    });
    let element = component.render(props);
    let frame = guard.finish().ok_or(HookError::OutsideRender)?;
    match frame.error {
        Some(err) => Err(err),
        None => Ok((element, frame.new)),
    }
}

pub fn is_rendering() -> bool {
    FRAME.with(|f| f.borrow().is_some())
}

/// Positional state hook.
///
/// Returns the current value and a setter. The value is the previous
/// render's value with every update queued since then applied in order, or
/// `initial` on the first render of this fiber.
///
/// A call-order violation inside a render is reported by the engine when the
/// component returns; the call itself hands back `initial`.
///
/// # Panics
///
/// Panics when called outside of a component render. Use [`try_use_state`]
/// to get the error instead.
pub fn use_state<T: Clone + 'static>(initial: T) -> (T, SetState<T>) {
    match state_hook(initial) {
        Ok(hook) => hook,
        Err((HookError::OutsideRender, _)) => panic!("{}", HookError::OutsideRender),
        Err((_, initial)) => (initial, SetState::detached()),
    }
}

pub fn try_use_state<T: Clone + 'static>(initial: T) -> Result<(T, SetState<T>), HookError> {
    state_hook(initial).map_err(|(err, _)| err)
}

fn state_hook<T: Clone + 'static>(initial: T) -> Result<(T, SetState<T>), (HookError, T)> {
    let slot = FRAME.with(|f| {
        let mut f = f.borrow_mut();
        let frame = f.as_mut().ok_or(HookError::OutsideRender)?;
        let index = frame.new.len();
        Ok((
            frame.component,
            index,
            frame.old.get(index).cloned(),
            frame.request.clone(),
        ))
    });
    let (component, index, old, request) = match slot {
        Ok(slot) => slot,
        Err(err) => return Err((err, initial)),
    };

    let state = match old {
        Some(old) => match old.downcast::<StateCell<T>>() {
            Ok(cell) => {
                // clone first: an updater may enqueue more updates
                let queued: Vec<Updater<T>> = cell.queue.borrow().clone();
                queued.iter().fold(cell.state.clone(), |state, f| f(&state))
            }
            Err(_) => {
                let err = HookError::KindMismatch {
                    component,
                    index,
                    expected: type_name::<T>(),
                };
                log::error!("{err}");
                record_error(err.clone());
                return Err((err, initial));
            }
        },
        None => initial,
    };

    let queue: Queue<T> = Rc::new(RefCell::new(Vec::new()));
    let cell: Rc<dyn Any> = Rc::new(StateCell {
        state: state.clone(),
        queue: queue.clone(),
    });
    FRAME.with(|f| {
        if let Some(frame) = f.borrow_mut().as_mut() {
            frame.new.push(cell);
        }
    });

    Ok((state, SetState { queue, request }))
}

fn record_error(err: HookError) {
    FRAME.with(|f| {
        if let Some(frame) = f.borrow_mut().as_mut() {
            frame.error.get_or_insert(err);
        }
    });
}

/// Setter returned by [`use_state`]. Cloning shares the same cell.
pub struct SetState<T> {
    queue: Queue<T>,
    request: Rc<RenderRequest>,
}

impl<T> Clone for SetState<T> {
    fn clone(&self) -> Self {
        Self {
            queue: self.queue.clone(),
            request: self.request.clone(),
        }
    }
}

impl<T> fmt::Debug for SetState<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SetState")
            .field("queued", &self.queue.borrow().len())
            .finish()
    }
}

impl<T: 'static> SetState<T> {
    fn detached() -> Self {
        Self {
            queue: Rc::new(RefCell::new(Vec::new())),
            request: Rc::new(RenderRequest::new()),
        }
    }

    /// Queues `f` (previous state -> next state) and requests a new pass.
    pub fn update(&self, f: impl Fn(&T) -> T + 'static) {
        self.queue.borrow_mut().push(Rc::new(f));
        self.request.request();
    }

    pub fn set(&self, value: T)
    where
        T: Clone,
    {
        self.update(move |_| value.clone());
    }

    /// Updates queued on this cell and not yet folded by a render.
    pub fn queued(&self) -> usize {
        self.queue.borrow().len()
    }
}
