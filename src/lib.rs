//! Priority-inheritance synchronization for real-time threads on Linux.
//!
//! This crate provides a mutex and a condition variable whose blocking
//! behaviour is delegated to the kernel's priority-inheriting futex
//! operations. When a high-priority thread blocks on a [`PiMutex`] held
//! by a lower-priority thread, the kernel temporarily boosts the owner to
//! the waiter's priority, so the lock is released promptly instead of the
//! owner being starved by medium-priority threads.
//!
//! The [`PiCond`] condition variable keeps that guarantee across the
//! wait/wake protocol: `signal` and `broadcast` move waiters from the
//! condition variable onto the mutex's wait queue atomically inside the
//! kernel (`FUTEX_CMP_REQUEUE_PI`), so a woken waiter returns from
//! [`wait`][PiCond::wait] already owning the mutex, with priority
//! inheritance applied throughout the transition.
//!
//! Deadlines are absolute only, on the monotonic clock by default or the
//! realtime clock with [`CondFlags::CLOCK_REALTIME`]. Both primitives are
//! caller-allocated, fixed-layout records that can live in a
//! shared-memory segment and be used across processes when created with
//! the `PSHARED` flag.
//!
//! The kernel side of the protocol is documented in the
//! *Priority-inheritance futexes* section of the
//! [Linux futex man page](http://man7.org/linux/man-pages/man2/futex.2.html).

mod cond;
mod errors;
mod flags;
mod futex;
mod mutex;
mod sys;
mod timeout;

pub use cond::PiCond;
pub use errors::Error;
pub use flags::{CondFlags, MutexFlags};
pub use mutex::PiMutex;
pub use timeout::Deadline;
