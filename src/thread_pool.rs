//! Shared thread pool for parallel pair processing.
//!
//! Every parallel section of the crate (pair scan, table build, Markov
//! simulation) runs in one pool so nested sections do not oversubscribe.

#[cfg(feature = "parallel")]
use rayon::ThreadPool;

#[cfg(feature = "parallel")]
use std::sync::OnceLock;

#[cfg(feature = "parallel")]
static THREAD_POOL: OnceLock<ThreadPool> = OnceLock::new();

/// Get or initialize the shared thread pool.
///
/// The pool uses one thread per logical CPU and an 8 MB stack per thread,
/// since each worker holds a pair's resampling buffers.
#[cfg(feature = "parallel")]
pub fn get_thread_pool() -> &'static ThreadPool {
    THREAD_POOL.get_or_init(|| {
        rayon::ThreadPoolBuilder::new()
            .thread_name(|i| format!("lsa-worker-{i}"))
            .stack_size(8 * 1024 * 1024)
            .build()
            .expect("Failed to build analysis thread pool")
    })
}

/// Run `op` inside the shared pool.
#[cfg(feature = "parallel")]
pub fn install<OP, R>(op: OP) -> R
where
    OP: FnOnce() -> R + Send,
    R: Send,
{
    get_thread_pool().install(op)
}

/// Run `op` directly (built without the `parallel` feature).
#[cfg(not(feature = "parallel"))]
pub fn install<OP, R>(op: OP) -> R
where
    OP: FnOnce() -> R,
{
    op()
}
