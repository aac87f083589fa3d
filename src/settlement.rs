use std::{
    cell::RefCell,
    future::Future,
    rc::Rc,
    task::{Poll, Waker},
};

use crate::{Error, Promise, Thenable};

/// Waits for a process to settle. Progress is not observed.
///
/// The future yields `Ok(Ok(value))` when the process resolves,
/// `Ok(Err(reason))` when it rejects and `Err(Error::ProcessDropped)` when
/// every handle to a pending process is gone.
///
/// # Examples
///
/// ```
/// use deferred_process::Process;
/// use futures::executor::block_on;
///
/// let process = Process::<String, ()>::new();
/// let settled = process.promise().wait();
/// process.resolve("🍓".into());
/// assert_eq!(block_on(settled).unwrap(), Ok(String::from("🍓")));
/// ```
#[derive(Debug)]
pub struct Settlement<T, E> {
    inner: Rc<RefCell<Inner<T, E>>>,
}

#[derive(Debug)]
enum WakerState {
    Fresh,
    Tainted,
}

#[derive(Debug)]
struct Inner<T, E> {
    value: Option<Result<T, E>>,
    waker: Result<Waker, WakerState>,
}

impl<T, E> Settlement<T, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    pub(crate) fn register<P: Clone + 'static>(promise: &Promise<T, E, P>) -> Self {
        let inner = Rc::new(RefCell::new(Inner {
            value: None,
            waker: Err(WakerState::Fresh),
        }));
        let signal = Signal(Rc::clone(&inner));
        promise.always(move |_, outcome| {
            signal.settle(match outcome {
                Ok(value) => Ok(value.clone()),
                Err(reason) => Err(reason.clone()),
            })
        });
        Settlement { inner }
    }
}

/// The producer half, owned by the handler registered on the process.
struct Signal<T, E>(Rc<RefCell<Inner<T, E>>>);

impl<T, E> Signal<T, E> {
    fn settle(&self, outcome: Result<T, E>) {
        let waker = {
            let mut inner = self.0.borrow_mut();
            inner.value = Some(outcome);
            std::mem::replace(&mut inner.waker, Err(WakerState::Fresh))
        };
        if let Ok(waker) = waker {
            waker.wake()
        }
    }
}

impl<T, E> Drop for Signal<T, E> {
    /// The process went away. Wake the waiter so it can report it.
    fn drop(&mut self) {
        let waker = match self.0.try_borrow_mut() {
            Ok(mut inner) => std::mem::replace(&mut inner.waker, Err(WakerState::Tainted)),
            Err(_) => return,
        };
        if let Ok(waker) = waker {
            waker.wake()
        }
    }
}

impl<T, E> Future for Settlement<T, E> {
    type Output = Result<Result<T, E>, Error>;

    fn poll(
        self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Self::Output> {
        let mut inner = self.inner.borrow_mut();
        match inner.value.take() {
            Some(outcome) => Poll::Ready(Ok(outcome)),
            None => match std::mem::replace(&mut inner.waker, Ok(cx.waker().clone())) {
                Err(WakerState::Tainted) => {
                    inner.waker = Err(WakerState::Tainted);
                    Poll::Ready(Err(Error::ProcessDropped))
                }
                _ => Poll::Pending,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use futures::{
        executor::{block_on, LocalPool},
        task::LocalSpawnExt,
    };

    use crate::{Error, Process};

    #[test]
    fn test_wait_resolved() {
        let process = Process::<String, String>::new();
        process.resolve("🍓".into());
        let outcome = block_on(process.promise().wait()).unwrap();
        assert_eq!(outcome, Ok("🍓".to_string()));
    }

    #[test]
    fn test_wait_rejected() {
        let process = Process::<(), String>::new();
        let waiter = process.promise().wait();
        process.reject("💥".into());
        assert_eq!(block_on(waiter).unwrap(), Err("💥".to_string()));
    }

    #[test]
    fn test_wait_pending_then_resolved_on_pool() {
        let mut pool = LocalPool::new();
        let process = Process::<u32>::new();
        let waiter = process.promise().wait();
        let got = std::rc::Rc::new(std::cell::Cell::new(None));
        let g = got.clone();
        pool.spawner()
            .spawn_local(async move {
                g.set(Some(waiter.await.unwrap()));
            })
            .unwrap();
        pool.run_until_stalled();
        assert_eq!(got.get(), None);

        process.notify(1).resolve(7);
        pool.run_until_stalled();
        assert_eq!(got.get(), Some(Ok(7)));
    }

    #[test]
    fn test_wait_process_dropped() {
        let process = Process::<String>::new();
        let waiter = process.promise().wait();
        drop(process);
        assert!(matches!(block_on(waiter), Err(Error::ProcessDropped)));
    }
}
