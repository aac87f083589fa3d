//! The receiver handed to every handler of a process.
use std::{
    any::Any,
    fmt,
    rc::{Rc, Weak},
};

use crate::{process::Core, request::Reply, Promise, Request};

/// A weak back-reference to the object a firing was made on behalf of.
///
/// By default this is the process itself. [`Promise::attach`] switches it to
/// the bridge object the surface was installed on, and the request adapter
/// passes itself. Holding it never keeps the referenced object alive.
#[derive(Clone)]
pub struct Context(Weak<dyn Any>);

impl Context {
    /// A context that refers to nothing.
    pub fn none() -> Self {
        Context(Weak::<()>::new())
    }

    pub fn of<H: Any>(target: &Rc<H>) -> Self {
        let weak: Weak<H> = Rc::downgrade(target);
        Context(weak)
    }

    /// The referenced object, if it is still alive and is an `H`.
    pub fn get<H: Any>(&self) -> Option<Rc<H>> {
        self.0.upgrade()?.downcast::<H>().ok()
    }

    /// The promise surface, when the context refers to a process.
    pub fn promise<T, E, P>(&self) -> Option<Promise<T, E, P>>
    where
        T: Clone + 'static,
        E: Clone + 'static,
        P: Clone + 'static,
    {
        self.get::<Core<T, E, P>>().map(Promise::from_core)
    }

    /// The request adapter, when the context refers to a request process.
    pub fn request<V: Clone + 'static>(&self) -> Option<Request<V>> {
        self.promise::<Reply<V>, Reply<V>, Reply<V>>()
            .map(Request::from)
    }

    pub fn is_alive(&self) -> bool {
        self.0.strong_count() > 0
    }

    pub fn ptr_eq(&self, other: &Context) -> bool {
        Weak::ptr_eq(&self.0, &other.0)
    }
}

impl Default for Context {
    fn default() -> Self {
        Context::none()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("alive", &self.is_alive())
            .finish()
    }
}
