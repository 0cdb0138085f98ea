//! Background task execution for cache revalidation.

use log::warn;
use std::sync::Mutex;

pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Runs fire-and-forget work off the request path.
pub trait TaskSpawner: Send + Sync {
    fn spawn(&self, task: Task);
}

/// Spawns one OS thread per task.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSpawner;

impl TaskSpawner for ThreadSpawner {
    fn spawn(&self, task: Task) {
        let spawned = std::thread::Builder::new()
            .name("learnpath-revalidate".to_string())
            .spawn(task);
        if let Err(err) = spawned {
            warn!(
                "event=task_spawn module=offline status=error error={}",
                err
            );
        }
    }
}

/// Holds tasks until [`QueuedSpawner::run_pending`] is called.
#[derive(Default)]
pub struct QueuedSpawner {
    queue: Mutex<Vec<Task>>,
}

impl QueuedSpawner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> usize {
        self.lock().len()
    }

    /// Runs queued tasks in submission order. Returns how many ran.
    pub fn run_pending(&self) -> usize {
        let tasks = std::mem::take(&mut *self.lock());
        let count = tasks.len();
        for task in tasks {
            task();
        }
        count
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Task>> {
        self.queue
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl TaskSpawner for QueuedSpawner {
    fn spawn(&self, task: Task) {
        self.lock().push(task);
    }
}
