//! Deferring work to a later turn of the host event loop.
use std::rc::Rc;

use futures::{executor::LocalSpawner, task::LocalSpawnExt};
use tracing::{debug, warn};

use crate::Error;

pub type Task = Box<dyn FnOnce() + 'static>;

/// Runs a task on a later turn, never inside the call that schedules it.
///
/// Scheduled tasks cannot be cancelled.
pub trait Scheduler {
    fn defer(&self, task: Task) -> Result<(), Error>;
}

/// Tasks run the next time the owning [`LocalPool`](futures::executor::LocalPool)
/// is driven.
impl Scheduler for LocalSpawner {
    fn defer(&self, task: Task) -> Result<(), Error> {
        self.spawn_local(async move { task() }).map_err(|err| {
            warn!(error = %err, "failed to defer task");
            Error::from(err)
        })?;
        debug!("deferred task to next turn");
        Ok(())
    }
}

impl<S: Scheduler + ?Sized> Scheduler for &S {
    fn defer(&self, task: Task) -> Result<(), Error> {
        (**self).defer(task)
    }
}

impl<S: Scheduler + ?Sized> Scheduler for Rc<S> {
    fn defer(&self, task: Task) -> Result<(), Error> {
        (**self).defer(task)
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::Cell, rc::Rc};

    use futures::executor::LocalPool;

    use super::Scheduler;
    use crate::Error;

    #[test]
    fn test_defer_runs_on_next_turn() {
        let mut pool = LocalPool::new();
        let spawner = pool.spawner();
        let ran = Rc::new(Cell::new(false));
        let r = ran.clone();
        spawner.defer(Box::new(move || r.set(true))).unwrap();
        assert!(!ran.get());
        pool.run_until_stalled();
        assert!(ran.get());
    }

    #[test]
    fn test_defer_after_pool_dropped() {
        let spawner = LocalPool::new().spawner();
        let result = spawner.defer(Box::new(|| {}));
        assert!(matches!(result, Err(Error::Schedule(_))));
    }

    #[test]
    fn test_defer_through_shared_scheduler() {
        let mut pool = LocalPool::new();
        let shared: Rc<dyn Scheduler> = Rc::new(pool.spawner());
        let count = Rc::new(Cell::new(0));
        for _ in 0..3 {
            let c = count.clone();
            shared.defer(Box::new(move || c.set(c.get() + 1))).unwrap();
        }
        assert_eq!(count.get(), 0);
        pool.run_until_stalled();
        assert_eq!(count.get(), 3);
    }
}
