//! A request-style face for a process, modeled on the promise an
//! asynchronous network call hands back.
//!
//! Handlers of a request process receive a [`Reply`]: the positional
//! argument list of the call, with the request itself spliced in where
//! request callbacks conventionally expect it. Success and progress
//! handlers get `(data, extra..., request)`, failure handlers get
//! `(request, extra...)`.
use std::{fmt, iter, rc::Rc};

use tracing::debug;

use crate::{
    process::Role, Bridge, Context, Error, Handler, Process, Promise, Scheduler, Thenable,
};

/// One positional argument of a request callback.
#[derive(Clone)]
pub enum Arg<V> {
    Value(V),
    /// The request the callback is about.
    Request(Context),
}

impl<V> Arg<V> {
    pub fn value(&self) -> Option<&V> {
        match self {
            Arg::Value(value) => Some(value),
            Arg::Request(_) => None,
        }
    }

    pub fn request(&self) -> Option<Request<V>>
    where
        V: Clone + 'static,
    {
        match self {
            Arg::Value(_) => None,
            Arg::Request(context) => context.request(),
        }
    }
}

impl<V: fmt::Debug> fmt::Debug for Arg<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arg::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Arg::Request(_) => f.write_str("Request"),
        }
    }
}

/// The argument list delivered to request handlers.
pub type Reply<V> = Vec<Arg<V>>;

/// A request-style promise: [`Thenable`] plus `success`, `error` and
/// `then`.
///
/// # Examples
///
/// ```
/// use deferred_process::{Process, Reply};
/// use futures::executor::LocalPool;
/// use std::{cell::RefCell, rc::Rc};
///
/// let mut pool = LocalPool::new();
/// let process = Process::<Reply<&str>>::new();
/// let body = Rc::new(RefCell::new(None));
/// let b = body.clone();
/// process.ajax().success(move |_, reply| {
///     *b.borrow_mut() = reply[0].value().copied();
/// });
///
/// process.resolve_ajax(&pool.spawner(), ["<html>", "200"]).unwrap();
/// assert_eq!(*body.borrow(), None);
/// pool.run_until_stalled();
/// assert_eq!(*body.borrow(), Some("<html>"));
/// ```
pub struct Request<V> {
    promise: Promise<Reply<V>>,
}

impl<V: Clone + 'static> Request<V> {
    /// Alias of [`Thenable::done`].
    pub fn success(&self, handler: impl Fn(&Context, &Reply<V>) + 'static) -> &Self {
        self.done(handler)
    }

    /// Alias of [`Thenable::fail`].
    pub fn error(&self, handler: impl Fn(&Context, &Reply<V>) + 'static) -> &Self {
        self.fail(handler)
    }

    /// Registers each handler that is given on its list.
    pub fn then(
        &self,
        done: Option<Handler<Context, Reply<V>>>,
        fail: Option<Handler<Context, Reply<V>>>,
        progress: Option<Handler<Context, Reply<V>>>,
    ) -> &Self {
        let core = &self.promise.core;
        if let Some(handler) = done {
            core.done.add_handler(handler);
        }
        if let Some(handler) = fail {
            core.fail.add_handler(handler);
        }
        if let Some(handler) = progress {
            core.progress.add_handler(handler);
        }
        self
    }

    pub fn promise(&self) -> Promise<Reply<V>> {
        self.promise.clone()
    }

    /// The context handlers receive for this request.
    pub fn context(&self) -> Context {
        self.promise.context()
    }
}

impl<V> From<Promise<Reply<V>>> for Request<V> {
    fn from(promise: Promise<Reply<V>>) -> Self {
        Request { promise }
    }
}

impl<V> Clone for Request<V> {
    fn clone(&self) -> Self {
        Request {
            promise: self.promise.clone(),
        }
    }
}

impl<V: Clone + 'static> Thenable<Reply<V>> for Request<V> {
    fn surface(&self) -> Option<Promise<Reply<V>>> {
        Some(self.promise.clone())
    }
}

impl<V> fmt::Debug for Request<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("state", &self.promise.core.state.get())
            .finish()
    }
}

impl<V: Clone + 'static> Process<Reply<V>> {
    /// A fresh request adapter for this process.
    pub fn ajax(&self) -> Request<V> {
        Request::from(self.promise())
    }

    /// Installs the surface on `target`, then returns the adapter.
    ///
    /// Bare [`resolve`](Process::resolve), [`reject`](Process::reject) and
    /// [`notify`](Process::notify) calls then fire with `target` as context.
    /// The `*_ajax` calls do not: their handlers receive the request, both
    /// as context and in the argument list.
    pub fn ajax_into<H: Bridge<Reply<V>>>(&self, target: &Rc<H>) -> Request<V> {
        self.attach(target);
        self.ajax()
    }

    /// Resolves on a later turn of `scheduler`. Success handlers receive
    /// `(args..., request)`.
    pub fn resolve_ajax<S>(
        &self,
        scheduler: &S,
        args: impl IntoIterator<Item = V>,
    ) -> Result<Request<V>, Error>
    where
        S: Scheduler + ?Sized,
    {
        self.defer(scheduler, Role::Resolve, args)
    }

    /// Rejects on a later turn of `scheduler`. Failure handlers receive
    /// `(request, args...)`.
    pub fn reject_ajax<S>(
        &self,
        scheduler: &S,
        args: impl IntoIterator<Item = V>,
    ) -> Result<Request<V>, Error>
    where
        S: Scheduler + ?Sized,
    {
        self.defer(scheduler, Role::Reject, args)
    }

    /// Notifies on a later turn of `scheduler`. Progress handlers receive
    /// `(args..., request)`.
    pub fn notify_ajax<S>(
        &self,
        scheduler: &S,
        args: impl IntoIterator<Item = V>,
    ) -> Result<Request<V>, Error>
    where
        S: Scheduler + ?Sized,
    {
        self.defer(scheduler, Role::Notify, args)
    }

    fn defer<S>(
        &self,
        scheduler: &S,
        role: Role,
        args: impl IntoIterator<Item = V>,
    ) -> Result<Request<V>, Error>
    where
        S: Scheduler + ?Sized,
    {
        let request = self.ajax();
        let context = request.context();
        let values = args.into_iter().map(Arg::Value);
        let this = iter::once(Arg::Request(context.clone()));
        let reply: Reply<V> = match role {
            Role::Reject => this.chain(values).collect(),
            Role::Resolve | Role::Notify => values.chain(this).collect(),
        };
        let process = self.clone();
        scheduler.defer(Box::new(move || match role {
            Role::Resolve => {
                process.resolve_with(context, reply);
            }
            Role::Reject => {
                process.reject_with(context, reply);
            }
            Role::Notify => {
                process.notify_with(context, reply);
            }
        }))?;
        debug!(role = ?role, "scheduled request settlement");
        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use futures::executor::LocalPool;

    use super::{Arg, Reply};
    use crate::{handler, Context, Process, State, Thenable};

    type Log = Rc<RefCell<Vec<String>>>;

    fn describe(reply: &Reply<&'static str>) -> String {
        reply
            .iter()
            .map(|arg| match arg {
                Arg::Value(value) => value.to_string(),
                Arg::Request(_) => "<request>".to_string(),
            })
            .collect::<Vec<_>>()
            .join(",")
    }

    #[test]
    fn test_resolve_ajax_is_deferred_and_reordered() {
        let mut pool = LocalPool::new();
        let log = Log::default();
        let process = Process::<Reply<&'static str>>::new();
        let l = log.clone();
        process.ajax().success(move |_, reply| l.borrow_mut().push(describe(reply)));

        process
            .resolve_ajax(&pool.spawner(), ["data", "success"])
            .unwrap();
        assert!(log.borrow().is_empty());
        assert_eq!(process.state(), State::Pending);

        pool.run_until_stalled();
        assert_eq!(*log.borrow(), vec!["data,success,<request>"]);
        assert_eq!(process.state(), State::Resolved);
    }

    #[test]
    fn test_reject_ajax_puts_request_first() {
        let mut pool = LocalPool::new();
        let log = Log::default();
        let process = Process::<Reply<&'static str>>::new();
        let l = log.clone();
        process.ajax().error(move |_, reply| l.borrow_mut().push(describe(reply)));

        process.reject_ajax(&pool.spawner(), ["timeout"]).unwrap();
        pool.run_until_stalled();
        assert_eq!(*log.borrow(), vec!["<request>,timeout"]);
        assert_eq!(process.state(), State::Rejected);
    }

    #[test]
    fn test_notify_ajax_then_resolve() {
        let mut pool = LocalPool::new();
        let spawner = pool.spawner();
        let log = Log::default();
        let process = Process::<Reply<&'static str>>::new();
        let l = log.clone();
        process
            .ajax()
            .progress(move |_, reply| l.borrow_mut().push(format!("progress {}", describe(reply))));

        process.notify_ajax(&spawner, ["50%"]).unwrap();
        process.resolve_ajax(&spawner, ["done"]).unwrap();
        process.notify_ajax(&spawner, ["99%"]).unwrap();
        pool.run_until_stalled();
        assert_eq!(*log.borrow(), vec!["progress 50%,<request>"]);
    }

    #[test]
    fn test_request_arg_and_context_point_at_process() {
        let mut pool = LocalPool::new();
        let seen = Rc::new(RefCell::new(None));
        let process = Process::<Reply<&'static str>>::new();
        let s = seen.clone();
        process.ajax().success(move |context: &Context, reply| {
            let from_arg = reply.last().and_then(Arg::request);
            let from_context = context.request::<&'static str>();
            *s.borrow_mut() = Some((
                from_arg.map(|request| request.state()),
                from_context.is_some(),
            ));
        });
        process.resolve_ajax(&pool.spawner(), ["ok"]).unwrap();
        pool.run_until_stalled();
        assert_eq!(*seen.borrow(), Some((Some(State::Resolved), true)));
    }

    #[test]
    fn test_then_registers_only_given_handlers() {
        let log = Log::default();
        let process = Process::<Reply<&'static str>>::new();
        let l = log.clone();
        process.ajax().then(
            Some(handler(move |_: &Context, _: &Reply<&'static str>| {
                l.borrow_mut().push("done".into())
            })),
            None,
            None,
        );
        process.reject(vec![Arg::Value("nope")]);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_then_chains_all_three() {
        let log = Log::default();
        let process = Process::<Reply<&'static str>>::new();
        let (d, f, p) = (log.clone(), log.clone(), log.clone());
        process
            .ajax()
            .then(
                Some(handler(move |_: &Context, r: &Reply<&'static str>| {
                    d.borrow_mut().push(format!("done {}", describe(r)))
                })),
                Some(handler(move |_: &Context, r: &Reply<&'static str>| {
                    f.borrow_mut().push(format!("fail {}", describe(r)))
                })),
                Some(handler(move |_: &Context, r: &Reply<&'static str>| {
                    p.borrow_mut().push(format!("progress {}", describe(r)))
                })),
            )
            .success(|_, _| {});
        process
            .notify(vec![Arg::Value("1")])
            .resolve(vec![Arg::Value("x")]);
        assert_eq!(*log.borrow(), vec!["progress 1", "done x"]);
    }

    #[test]
    fn test_scheduled_settlement_outlives_caller_handles() {
        let mut pool = LocalPool::new();
        let state = {
            let process = Process::<Reply<u8>>::new();
            let request = process.resolve_ajax(&pool.spawner(), [1]).unwrap();
            request.promise()
        };
        assert_eq!(state.state(), State::Pending);
        pool.run_until_stalled();
        assert_eq!(state.state(), State::Resolved);
    }
}
