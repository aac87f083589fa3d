//! The read-only face of a process and the traits that let any object carry
//! it.
use std::{any::Any, cell::RefCell, fmt, rc::Rc};

use crate::{process::Core, Context, Settlement, State};

/// The capability interface of a promise: query the state and register
/// handlers, never settle.
///
/// Implementors only provide [`surface`](Self::surface); every other method
/// forwards to it. An implementor without a surface reports
/// [`State::Pending`] and drops registrations.
pub trait Thenable<T, E = T, P = T>
where
    T: Clone + 'static,
    E: Clone + 'static,
    P: Clone + 'static,
{
    /// The promise this object forwards to.
    fn surface(&self) -> Option<Promise<T, E, P>>;

    fn state(&self) -> State {
        self.surface()
            .map_or(State::Pending, |promise| promise.core.state.get())
    }

    fn done(&self, handler: impl Fn(&Context, &T) + 'static) -> &Self
    where
        Self: Sized,
    {
        if let Some(promise) = self.surface() {
            promise.core.done.add(handler);
        }
        self
    }

    fn fail(&self, handler: impl Fn(&Context, &E) + 'static) -> &Self
    where
        Self: Sized,
    {
        if let Some(promise) = self.surface() {
            promise.core.fail.add(handler);
        }
        self
    }

    fn progress(&self, handler: impl Fn(&Context, &P) + 'static) -> &Self
    where
        Self: Sized,
    {
        if let Some(promise) = self.surface() {
            promise.core.progress.add(handler);
        }
        self
    }

    /// Registers `handler` for whichever of success or failure happens. It
    /// runs at most once.
    fn always(&self, handler: impl Fn(&Context, Result<&T, &E>) + 'static) -> &Self
    where
        Self: Sized,
    {
        if let Some(promise) = self.surface() {
            let on_done = Rc::new(handler);
            let on_fail = Rc::clone(&on_done);
            promise
                .core
                .done
                .add(move |context, value| on_done(context, Ok(value)));
            promise
                .core
                .fail
                .add(move |context, reason| on_fail(context, Err(reason)));
        }
        self
    }
}

/// An object a promise surface can be installed on.
///
/// This is the host side of [`Promise::attach`]: the bridge keeps the
/// surface it is given (usually in a [`Slot`]) and hands it back from
/// [`Thenable::surface`].
///
/// # Examples
///
/// ```
/// use deferred_process::{Bridge, Process, Promise, Slot, State, Thenable};
/// use std::rc::Rc;
///
/// #[derive(Default)]
/// struct Upload {
///     slot: Slot<u64>,
/// }
///
/// impl Thenable<u64> for Upload {
///     fn surface(&self) -> Option<Promise<u64>> {
///         self.slot.get()
///     }
/// }
///
/// impl Bridge<u64> for Upload {
///     fn install(&self, promise: Promise<u64>) {
///         self.slot.install(promise);
///     }
/// }
///
/// let upload = Rc::new(Upload::default());
/// let process = Process::<u64>::extend(&upload);
/// process.resolve(1024);
/// assert_eq!(upload.state(), State::Resolved);
/// ```
pub trait Bridge<T, E = T, P = T>: Thenable<T, E, P> + Any
where
    T: Clone + 'static,
    E: Clone + 'static,
    P: Clone + 'static,
{
    fn install(&self, promise: Promise<T, E, P>);
}

/// Storage for an installed surface. Installing again replaces it.
pub struct Slot<T, E = T, P = T>(RefCell<Option<Promise<T, E, P>>>);

impl<T, E, P> Slot<T, E, P> {
    pub fn new() -> Self {
        Slot(RefCell::new(None))
    }

    pub fn install(&self, promise: Promise<T, E, P>) {
        *self.0.borrow_mut() = Some(promise);
    }

    pub fn get(&self) -> Option<Promise<T, E, P>> {
        self.0.borrow().clone()
    }
}

impl<T, E, P> Default for Slot<T, E, P> {
    fn default() -> Self {
        Slot::new()
    }
}

impl<T, E, P> fmt::Debug for Slot<T, E, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Slot")
            .field(&self.0.borrow().is_some())
            .finish()
    }
}

/// A shareable view of a process. It can register handlers and query the
/// state but cannot settle.
pub struct Promise<T, E = T, P = T> {
    pub(crate) core: Rc<Core<T, E, P>>,
}

impl<T, E, P> Promise<T, E, P>
where
    T: Clone + 'static,
    E: Clone + 'static,
    P: Clone + 'static,
{
    pub(crate) fn from_core(core: Rc<Core<T, E, P>>) -> Self {
        Promise { core }
    }

    /// Installs this surface on `target` and makes `target` the context of
    /// later bare settlement calls.
    pub fn attach<H: Bridge<T, E, P>>(&self, target: &Rc<H>) -> Rc<H> {
        target.install(self.clone());
        *self.core.source.borrow_mut() = Context::of(target);
        Rc::clone(target)
    }

    /// A context referring to the process behind this surface.
    pub fn context(&self) -> Context {
        Context::of(&self.core)
    }

    /// A future that completes with the outcome of the process.
    pub fn wait(&self) -> Settlement<T, E> {
        Settlement::register(self)
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.core, &other.core)
    }
}

impl<T, E, P> Clone for Promise<T, E, P> {
    fn clone(&self) -> Self {
        Promise {
            core: Rc::clone(&self.core),
        }
    }
}

impl<T, E, P> Thenable<T, E, P> for Promise<T, E, P>
where
    T: Clone + 'static,
    E: Clone + 'static,
    P: Clone + 'static,
{
    fn surface(&self) -> Option<Promise<T, E, P>> {
        Some(self.clone())
    }
}

impl<T, E, P> fmt::Debug for Promise<T, E, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Promise")
            .field("state", &self.core.state.get())
            .finish()
    }
}
