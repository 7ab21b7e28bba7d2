//! Process-wide pool of named, reference-counted resources.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::Result;

/// A resource that must be shut down when its last user releases it.
pub trait Closeable {
    fn close(&self) -> Result<()>;
}

struct Slots<R> {
    resources: HashMap<String, Arc<R>>,
    users: HashMap<String, usize>,
}

/// Named resources shared between requests, e.g. database connections.
///
/// Every operation takes the pool lock, so the pool can be shared freely
/// between request workers.
///
/// # Example
///
/// ```rust
/// use gospel_core::{Closeable, ResourcePool, Result};
///
/// struct Connection;
///
/// impl Closeable for Connection {
///     fn close(&self) -> Result<()> {
///         Ok(())
///     }
/// }
///
/// let pool = ResourcePool::new();
/// assert!(pool.create("main", Connection));
/// assert!(pool.use_("main").is_some());
/// assert_eq!(pool.release("main").unwrap(), 1);
/// assert_eq!(pool.release("main").unwrap(), 0);
/// assert!(pool.use_("main").is_none());
/// ```
pub struct ResourcePool<R> {
    slots: Mutex<Slots<R>>,
}

impl<R: Closeable> ResourcePool<R> {
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(Slots {
                resources: HashMap::new(),
                users: HashMap::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Slots<R>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add `resource` under `name` with one user.
    ///
    /// Returns false, dropping `resource`, if the name is taken.
    pub fn create(&self, name: impl Into<String>, resource: R) -> bool {
        let name = name.into();
        let mut slots = self.lock();
        if slots.resources.contains_key(&name) {
            return false;
        }
        tracing::debug!(%name, "resource created");
        slots.resources.insert(name.clone(), Arc::new(resource));
        slots.users.insert(name, 1);
        true
    }

    /// The resource `name`, counting one more user.
    pub fn use_(&self, name: &str) -> Option<Arc<R>> {
        let mut slots = self.lock();
        let resource = slots.resources.get(name)?.clone();
        *slots.users.entry(name.to_string()).or_insert(0) += 1;
        Some(resource)
    }

    /// Drop one user of `name` and close the resource when none remain.
    ///
    /// Returns the remaining number of users; unknown names have none.
    pub fn release(&self, name: &str) -> Result<usize> {
        let mut slots = self.lock();
        let Some(users) = slots.users.get_mut(name) else {
            return Ok(0);
        };
        *users = users.saturating_sub(1);
        let remaining = *users;
        if remaining > 0 {
            return Ok(remaining);
        }

        slots.users.remove(name);
        let resource = slots.resources.remove(name);
        drop(slots);

        if let Some(resource) = resource {
            tracing::debug!(name, "closing resource");
            resource.close()?;
        }
        Ok(0)
    }

    /// Number of users of `name`.
    pub fn users(&self, name: &str) -> usize {
        self.lock().users.get(name).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.lock().resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().resources.is_empty()
    }

    /// Close and forget every resource.
    ///
    /// All resources are closed; the first failure is returned.
    pub fn clear(&self) -> Result<()> {
        let resources: Vec<(String, Arc<R>)> = {
            let mut slots = self.lock();
            slots.users.clear();
            slots.resources.drain().collect()
        };

        let mut result = Ok(());
        for (name, resource) in resources {
            if let Err(err) = resource.close() {
                tracing::error!(%name, "cannot close resource: {}", err);
                if result.is_ok() {
                    result = Err(err);
                }
            }
        }
        result
    }
}

impl<R: Closeable> Default for ResourcePool<R> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    struct Tracked {
        closed: Arc<AtomicUsize>,
        fail: bool,
    }

    impl Closeable for Tracked {
        fn close(&self) -> Result<()> {
            self.closed.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(Error::Pool {
                    message: "close failed".to_string(),
                });
            }
            Ok(())
        }
    }

    fn tracked(closed: &Arc<AtomicUsize>, fail: bool) -> Tracked {
        Tracked {
            closed: closed.clone(),
            fail,
        }
    }

    #[test]
    fn create_refuses_duplicates() {
        let closed = Arc::new(AtomicUsize::new(0));
        let pool = ResourcePool::new();
        assert!(pool.create("db", tracked(&closed, false)));
        assert!(!pool.create("db", tracked(&closed, false)));
        assert_eq!(pool.len(), 1);
        assert_eq!(pool.users("db"), 1);
    }

    #[test]
    fn release_closes_at_zero() {
        let closed = Arc::new(AtomicUsize::new(0));
        let pool = ResourcePool::new();
        pool.create("db", tracked(&closed, false));
        pool.use_("db").unwrap();

        assert_eq!(pool.release("db").unwrap(), 1);
        assert_eq!(closed.load(Ordering::SeqCst), 0);
        assert_eq!(pool.release("db").unwrap(), 0);
        assert_eq!(closed.load(Ordering::SeqCst), 1);
        assert!(pool.is_empty());
        assert_eq!(pool.release("db").unwrap(), 0);
    }

    #[test]
    fn clear_closes_everything() {
        let closed = Arc::new(AtomicUsize::new(0));
        let pool = ResourcePool::new();
        pool.create("a", tracked(&closed, true));
        pool.create("b", tracked(&closed, false));

        assert!(pool.clear().is_err());
        assert_eq!(closed.load(Ordering::SeqCst), 2);
        assert!(pool.is_empty());
    }

    #[test]
    fn concurrent_users_are_counted() {
        let closed = Arc::new(AtomicUsize::new(0));
        let pool = Arc::new(ResourcePool::new());
        pool.create("db", tracked(&closed, false));

        let workers: Vec<_> = (0..8)
            .map(|_| {
                let pool = pool.clone();
                thread::spawn(move || {
                    for _ in 0..100 {
                        assert!(pool.use_("db").is_some());
                        pool.release("db").unwrap();
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        assert_eq!(pool.users("db"), 1);
        assert_eq!(closed.load(Ordering::SeqCst), 0);
    }
}
