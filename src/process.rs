//! The controller side of a deferred: a process owns three callbacks lists
//! and settles exactly once.
use std::{
    cell::{Cell, RefCell},
    fmt,
    rc::Rc,
};

use tracing::{debug, trace};

use crate::{Bridge, Callbacks, Context, Flags, Promise, Thenable};

/// Where a process is in its lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum State {
    #[default]
    Pending,
    Resolved,
    Rejected,
}

impl State {
    pub fn as_str(&self) -> &'static str {
        match self {
            State::Pending => "pending",
            State::Resolved => "resolved",
            State::Rejected => "rejected",
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The three lists of a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Role {
    Resolve,
    Reject,
    Notify,
}

impl Role {
    fn flags(self) -> Flags {
        match self {
            Role::Resolve | Role::Reject => Flags::ONCE | Flags::MEMORY,
            Role::Notify => Flags::MEMORY,
        }
    }

    fn settles(self) -> Option<State> {
        match self {
            Role::Resolve => Some(State::Resolved),
            Role::Reject => Some(State::Rejected),
            Role::Notify => None,
        }
    }
}

pub(crate) struct Core<T, E, P> {
    pub(crate) state: Cell<State>,
    pub(crate) source: RefCell<Context>,
    pub(crate) done: Callbacks<Context, T>,
    pub(crate) fail: Callbacks<Context, E>,
    pub(crate) progress: Callbacks<Context, P>,
}

impl<T, E, P> Core<T, E, P>
where
    T: Clone + 'static,
    E: Clone + 'static,
    P: Clone + 'static,
{
    fn new() -> Rc<Self> {
        let core = Rc::new(Core {
            state: Cell::new(State::Pending),
            source: RefCell::new(Context::none()),
            done: Callbacks::new(Role::Resolve.flags()),
            fail: Callbacks::new(Role::Reject.flags()),
            progress: Callbacks::new(Role::Notify.flags()),
        });
        *core.source.borrow_mut() = Context::of(&core);
        // Registered first so the state is already flipped when user
        // handlers of the same firing run.
        core.done.add(bookkeeping(&core, Role::Resolve));
        core.fail.add(bookkeeping(&core, Role::Reject));
        core
    }

    fn settle(&self, role: Role) {
        let Some(state) = role.settles() else {
            return;
        };
        self.state.set(state);
        match role {
            Role::Resolve => {
                self.fail.disable();
            }
            Role::Reject => {
                self.done.disable();
            }
            Role::Notify => return,
        }
        // Locking only refuses new progress handlers; disabling also keeps
        // registered ones from hearing about progress after settlement.
        self.progress.lock().disable();
        debug!(state = %state, "process settled");
    }
}

fn bookkeeping<T, E, P, A>(core: &Rc<Core<T, E, P>>, role: Role) -> impl Fn(&Context, &A) + 'static
where
    T: Clone + 'static,
    E: Clone + 'static,
    P: Clone + 'static,
{
    let core = Rc::downgrade(core);
    move |_, _| {
        if let Some(core) = core.upgrade() {
            core.settle(role);
        }
    }
}

/// A deferred process: the object allowed to settle its promise.
///
/// Handlers registered through [`Thenable`] receive the current source
/// [`Context`] and a reference to the payload. Success and failure fire at
/// most once, progress fires any number of times until the process settles.
///
/// # Examples
///
/// ```
/// use deferred_process::{Process, State, Thenable};
/// use std::{cell::RefCell, rc::Rc};
///
/// let seen = Rc::new(RefCell::new(vec![]));
/// let process = Process::<i32, String, u8>::new();
/// let log = seen.clone();
/// process
///     .progress({ let log = log.clone(); move |_, pct| log.borrow_mut().push(format!("{pct}%")) })
///     .done(move |_, value| log.borrow_mut().push(format!("done {value}")));
///
/// process.notify(50).resolve(42).resolve(7);
/// assert_eq!(process.state(), State::Resolved);
/// assert_eq!(*seen.borrow(), vec!["50%", "done 42"]);
/// ```
pub struct Process<T, E = T, P = T> {
    promise: Promise<T, E, P>,
}

impl<T, E, P> Process<T, E, P>
where
    T: Clone + 'static,
    E: Clone + 'static,
    P: Clone + 'static,
{
    pub fn new() -> Self {
        Self {
            promise: Promise::from_core(Core::new()),
        }
    }

    /// Creates a process and hands it to `init` before returning it.
    pub fn with_init(init: impl FnOnce(&Self)) -> Self {
        let process = Self::new();
        init(&process);
        process
    }

    /// Creates a process whose surface is installed on `target`.
    pub fn extend<H: Bridge<T, E, P>>(target: &Rc<H>) -> Self {
        Self::extend_with(target, |_| {})
    }

    /// Like [`extend`](Self::extend), running `init` before the surface is
    /// installed.
    pub fn extend_with<H: Bridge<T, E, P>>(target: &Rc<H>, init: impl FnOnce(&Self)) -> Self {
        let process = Self::with_init(init);
        process.attach(target);
        process
    }

    pub fn resolve(&self, value: T) -> &Self {
        self.resolve_with(self.source(), value)
    }

    pub fn resolve_with(&self, context: Context, value: T) -> &Self {
        self.core().done.fire_with(context, value);
        self
    }

    pub fn reject(&self, reason: E) -> &Self {
        self.reject_with(self.source(), reason)
    }

    pub fn reject_with(&self, context: Context, reason: E) -> &Self {
        self.core().fail.fire_with(context, reason);
        self
    }

    pub fn notify(&self, progress: P) -> &Self {
        self.notify_with(self.source(), progress)
    }

    pub fn notify_with(&self, context: Context, progress: P) -> &Self {
        trace!(state = %self.state(), "notifying progress");
        self.core().progress.fire_with(context, progress);
        self
    }

    /// The promise surface of this process.
    pub fn promise(&self) -> Promise<T, E, P> {
        self.promise.clone()
    }

    /// Installs the promise surface on `target` and makes `target` the
    /// context of later [`resolve`](Self::resolve), [`reject`](Self::reject)
    /// and [`notify`](Self::notify) calls.
    pub fn attach<H: Bridge<T, E, P>>(&self, target: &Rc<H>) -> Rc<H> {
        self.promise.attach(target)
    }

    /// The context bare settlement calls fire with.
    pub fn source(&self) -> Context {
        self.core().source.borrow().clone()
    }

    fn core(&self) -> &Core<T, E, P> {
        &self.promise.core
    }
}

impl<T, E, P> Default for Process<T, E, P>
where
    T: Clone + 'static,
    E: Clone + 'static,
    P: Clone + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E, P> Clone for Process<T, E, P> {
    fn clone(&self) -> Self {
        Self {
            promise: self.promise.clone(),
        }
    }
}

impl<T, E, P> Thenable<T, E, P> for Process<T, E, P>
where
    T: Clone + 'static,
    E: Clone + 'static,
    P: Clone + 'static,
{
    fn surface(&self) -> Option<Promise<T, E, P>> {
        Some(self.promise.clone())
    }
}

impl<T, E, P> fmt::Debug for Process<T, E, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Process")
            .field("state", &self.promise.core.state.get())
            .finish()
    }
}
