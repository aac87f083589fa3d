//! An ordered list of handlers fired with a receiver context and a payload.
use std::{cell::RefCell, collections::VecDeque, fmt, rc::Rc};

use tracing::trace;

use crate::Flags;

/// A shared handler. The first argument is the receiver context of the
/// firing, the second one the payload.
pub type Handler<C, A> = Rc<dyn Fn(&C, &A)>;

/// Wraps a closure into a [`Handler`].
pub fn handler<C, A>(f: impl Fn(&C, &A) + 'static) -> Handler<C, A> {
    Rc::new(f)
}

/// A callbacks list with `once`/`memory` policy that can be disabled or
/// locked.
///
/// Every method takes `&self` so handlers may add to or fire the list that
/// is currently calling them. A firing requested while the list is already
/// firing is queued and runs before the outer [`fire_with`](Self::fire_with)
/// returns.
///
/// # Examples
///
/// ```
/// use deferred_process::{Callbacks, Flags};
/// use std::{cell::RefCell, rc::Rc};
///
/// let seen = Rc::new(RefCell::new(vec![]));
/// let list = Callbacks::<(), i32>::new(Flags::ONCE | Flags::MEMORY);
/// list.fire_with((), 7);
/// let log = seen.clone();
/// list.add(move |_, value| log.borrow_mut().push(*value));
/// assert_eq!(*seen.borrow(), vec![7]);
/// ```
pub struct Callbacks<C, A> {
    inner: RefCell<Inner<C, A>>,
}

struct Inner<C, A> {
    flags: Flags,
    handlers: Vec<Handler<C, A>>,
    memory: Option<(C, A)>,
    queue: VecDeque<(C, A)>,
    fired: bool,
    firing: bool,
    disabled: bool,
    locked: bool,
}

impl<C: Clone, A: Clone> Callbacks<C, A> {
    pub fn new(flags: Flags) -> Self {
        Self {
            inner: RefCell::new(Inner {
                flags,
                handlers: vec![],
                memory: None,
                queue: VecDeque::new(),
                fired: false,
                firing: false,
                disabled: false,
                locked: false,
            }),
        }
    }

    pub fn add(&self, handler: impl Fn(&C, &A) + 'static) -> &Self {
        self.add_handler(Rc::new(handler))
    }

    /// Appends `handler`, or runs it right away when the list remembers an
    /// earlier firing.
    ///
    /// A `once` list that already fired never stores the handler: it is
    /// called a single time with the remembered invocation, if any. A
    /// handler added while the list is firing joins the running firing.
    pub fn add_handler(&self, handler: Handler<C, A>) -> &Self {
        let replay = {
            let mut inner = self.inner.borrow_mut();
            if inner.disabled || inner.locked {
                return self;
            }
            if inner.firing {
                inner.handlers.push(handler);
                return self;
            }
            if !(inner.flags.once && inner.fired) {
                inner.handlers.push(Rc::clone(&handler));
            }
            inner.memory.clone()
        };
        if let Some((context, args)) = replay {
            handler(&context, &args);
        }
        self
    }

    /// Calls every handler in registration order with `context` and `args`.
    ///
    /// A panicking handler unwinds out of this call and the handlers after
    /// it are skipped. The list itself stays usable.
    pub fn fire_with(&self, context: C, args: A) -> &Self {
        {
            let mut inner = self.inner.borrow_mut();
            if inner.disabled || (inner.flags.once && inner.fired) {
                return self;
            }
            if inner.flags.memory {
                inner.memory = Some((context.clone(), args.clone()));
            }
            inner.fired = true;
            if inner.firing {
                inner.queue.push_back((context, args));
                return self;
            }
            inner.firing = true;
            trace!(
                flags = %inner.flags,
                handlers = inner.handlers.len(),
                "firing callbacks"
            );
        }
        let _firing = Firing(&self.inner);
        let mut next = Some((context, args));
        while let Some((context, args)) = next {
            self.run(&context, &args);
            next = self.inner.borrow_mut().queue.pop_front();
        }
        self
    }

    fn run(&self, context: &C, args: &A) {
        let mut index = 0;
        loop {
            let handler = {
                let inner = self.inner.borrow();
                if inner.disabled {
                    break;
                }
                match inner.handlers.get(index) {
                    Some(handler) => Rc::clone(handler),
                    None => break,
                }
            };
            handler(context, args);
            index += 1;
        }
    }
}

impl<C, A> Callbacks<C, A> {
    /// Stops all further adding and firing. Registered handlers are kept.
    pub fn disable(&self) -> &Self {
        self.inner.borrow_mut().disabled = true;
        self
    }

    /// Stops all further adding. Registered handlers can still be fired.
    pub fn lock(&self) -> &Self {
        self.inner.borrow_mut().locked = true;
        self
    }

    pub fn has(&self, handler: &Handler<C, A>) -> bool {
        self.inner
            .borrow()
            .handlers
            .iter()
            .any(|registered| Rc::ptr_eq(registered, handler))
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn fired(&self) -> bool {
        self.inner.borrow().fired
    }

    pub fn is_disabled(&self) -> bool {
        self.inner.borrow().disabled
    }

    pub fn is_locked(&self) -> bool {
        self.inner.borrow().locked
    }

    pub fn flags(&self) -> Flags {
        self.inner.borrow().flags
    }
}

impl<C, A> fmt::Debug for Callbacks<C, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Callbacks")
            .field("flags", &inner.flags)
            .field("handlers", &inner.handlers.len())
            .field("fired", &inner.fired)
            .field("disabled", &inner.disabled)
            .field("locked", &inner.locked)
            .finish()
    }
}

/// Clears the firing state even when a handler unwinds.
struct Firing<'a, C, A>(&'a RefCell<Inner<C, A>>);

impl<C, A> Drop for Firing<'_, C, A> {
    fn drop(&mut self) {
        if let Ok(mut inner) = self.0.try_borrow_mut() {
            inner.firing = false;
            inner.queue.clear();
        }
    }
}
