use super::Context;
use crossbeam::queue::ArrayQueue;
use std::fmt::{self, Debug, Formatter};
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicUsize, Ordering};

/// A bounded, lock-free pool of [`Context`] values.
///
/// [`acquire`](#method.acquire) hands out a [`PooledContext`] guard which puts the context back when it is dropped:
/// on normal return, while unwinding from a panic, and when the request future is cancelled. Releasing drops the
/// request body and every value the request stored, so idle contexts hold no per-request resources. The full
/// reset happens when a context is acquired, so whatever a released context still carries never reaches the
/// next request.
///
/// When the pool is empty a new context is allocated; when it is full a released context is dropped.
pub struct ContextPool {
    free: ArrayQueue<Box<Context>>,
    allocated: AtomicUsize,
}

impl ContextPool {
    /// Creates a pool keeping at most `capacity` idle contexts (at least one).
    pub fn new(capacity: usize) -> ContextPool {
        ContextPool {
            free: ArrayQueue::new(capacity.max(1)),
            allocated: AtomicUsize::new(0),
        }
    }

    /// Takes a context out of the pool, allocating one if none is idle. The context is reset first.
    pub fn acquire(&self) -> PooledContext<'_> {
        let mut ctx = match self.free.pop() {
            Some(ctx) => ctx,
            None => {
                self.allocated.fetch_add(1, Ordering::Relaxed);
                Box::new(Context::new())
            }
        };
        ctx.reset();

        PooledContext {
            pool: self,
            ctx: Some(ctx),
        }
    }

    fn release(&self, ctx: Box<Context>) {
        // A full pool drops the surplus context.
        let _ = self.free.push(ctx);
    }

    /// The number of contexts this pool has allocated so far.
    ///
    /// In steady state this stays at the peak number of concurrent requests. Steady growth means contexts are
    /// being leaked instead of released.
    pub fn allocated(&self) -> usize {
        self.allocated.load(Ordering::Relaxed)
    }

    /// The number of contexts currently waiting in the pool.
    pub fn idle(&self) -> usize {
        self.free.len()
    }

    pub fn capacity(&self) -> usize {
        self.free.capacity()
    }
}

impl Debug for ContextPool {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextPool")
            .field("capacity", &self.capacity())
            .field("idle", &self.idle())
            .field("allocated", &self.allocated())
            .finish()
    }
}

/// A [`Context`] borrowed from a [`ContextPool`], returned to it on drop.
pub struct PooledContext<'p> {
    pool: &'p ContextPool,
    ctx: Option<Box<Context>>,
}

impl PooledContext<'_> {
    /// Returns the context to its pool now instead of at the end of the scope.
    pub fn release(self) {
        drop(self);
    }
}

impl Deref for PooledContext<'_> {
    type Target = Context;

    fn deref(&self) -> &Context {
        self.ctx.as_deref().expect("context is only taken out on drop")
    }
}

impl DerefMut for PooledContext<'_> {
    fn deref_mut(&mut self) -> &mut Context {
        self.ctx.as_deref_mut().expect("context is only taken out on drop")
    }
}

impl Drop for PooledContext<'_> {
    fn drop(&mut self) {
        if let Some(mut ctx) = self.ctx.take() {
            ctx.vacate();
            self.pool.release(ctx);
        }
    }
}

impl Debug for PooledContext<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Debug::fmt(&**self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::{Chain, Middleware};
    use crate::types::{DataMap, RouteParams};
    use bytes::Bytes;
    use futures::future::{self, FutureExt};
    use http::{Request, StatusCode};
    use std::mem;
    use std::sync::Arc;
    use std::panic::{self, AssertUnwindSafe};
    use std::sync::Barrier;
    use std::thread;

    #[test]
    fn sequential_requests_reuse_one_context() {
        let pool = ContextPool::new(4);

        for round in 0..100 {
            let mut ctx = pool.acquire();
            assert!(ctx.params().is_empty());
            assert_eq!(ctx.cursor(), 0);
            assert!(ctx.get::<usize>("round").is_none());

            ctx.set("round", round);
            ctx.text(StatusCode::OK, "hello");
        }

        assert_eq!(pool.allocated(), 1);
        assert_eq!(pool.idle(), 1);
    }

    #[test]
    fn concurrent_acquires_allocate_at_most_one_per_thread() {
        let pool = ContextPool::new(16);
        let barrier = Barrier::new(8);

        thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    for _ in 0..50 {
                        let mut ctx = pool.acquire();
                        ctx.set("k", 1_u8);
                        barrier.wait();
                    }
                });
            }
        });

        assert!(pool.allocated() <= 8);
        assert_eq!(pool.idle(), pool.allocated());
    }

    #[test]
    fn panicking_occupant_still_releases_and_is_wiped() {
        let pool = ContextPool::new(2);

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            let mut ctx = pool.acquire();
            ctx.set("secret", String::from("from a crashed request"));
            ctx.text(StatusCode::OK, "partial");
            panic!("handler crashed");
        }));
        assert!(outcome.is_err());
        assert_eq!(pool.idle(), 1);

        let ctx = pool.acquire();
        assert!(ctx.get::<String>("secret").is_none());
        assert_eq!(ctx.render_count(), 0);
        assert_eq!(pool.allocated(), 1);
    }

    #[test]
    fn released_context_drops_request_state() {
        let pool = ContextPool::new(2);
        let conn = Arc::new(String::from("db connection"));
        let data = Arc::new(DataMap::new());

        {
            let mut ctx = pool.acquire();
            let chain = Chain::compose(&[], &Middleware::new(|_| future::ready(()).boxed()).handler);
            let req = Request::builder()
                .method("POST")
                .uri("/upload")
                .body(Bytes::from(vec![0_u8; 1024 * 1024]))
                .unwrap();
            let mut params = RouteParams::new();
            params.set("id", "42");

            ctx.prepare(req, None, params, chain, Arc::clone(&data));
            ctx.set("conn", Arc::clone(&conn));
            ctx.text(StatusCode::OK, "uploaded");
            assert_eq!(Arc::strong_count(&conn), 2);
        }

        assert_eq!(Arc::strong_count(&conn), 1);
        assert_eq!(Arc::strong_count(&data), 1);

        let idle = pool.free.pop().unwrap();
        assert!(idle.body().is_empty());
        assert!(idle.params().is_empty());
        assert!(idle.data::<u8>().is_none());
        assert!(idle.chain.is_none());
    }

    // Forgetting a guard doesn't corrupt the pool, it only defeats reuse; allocation counts expose the leak.
    #[test]
    fn leaked_context_forces_new_allocation() {
        let pool = ContextPool::new(2);

        mem::forget(pool.acquire());
        drop(pool.acquire());

        assert_eq!(pool.allocated(), 2);
        assert_eq!(pool.idle(), 1);
    }

    #[test]
    fn full_pool_drops_surplus() {
        let pool = ContextPool::new(1);

        let first = pool.acquire();
        let second = pool.acquire();
        first.release();
        second.release();

        assert_eq!(pool.allocated(), 2);
        assert_eq!(pool.idle(), 1);
    }
}
