use std::fmt;

/// Errors returned by the mutex and condition variable operations.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Error {
	/// Unknown flag bits, mismatched process sharing, or a malformed deadline.
	InvalidArgument,
	/// The lock is held by another thread, or waiters are still queued on a
	/// condition variable being destroyed.
	Busy,
	/// The lock is already held by the calling thread.
	Deadlock,
	/// The absolute deadline passed before a wakeup arrived. The caller owns
	/// the mutex again.
	TimedOut,
	/// The wait was interrupted by a signal. The caller owns the mutex again.
	Interrupted,
	/// The calling thread does not own the mutex.
	Permission,
	/// Any other error reported by the kernel, as a raw errno value.
	Os(i32),
}

impl fmt::Display for Error {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self {
			Error::InvalidArgument => f.write_str("invalid argument"),
			Error::Busy => f.write_str("resource busy"),
			Error::Deadlock => f.write_str("lock already held by this thread"),
			Error::TimedOut => f.write_str("deadline expired"),
			Error::Interrupted => f.write_str("interrupted by a signal"),
			Error::Permission => f.write_str("lock not held by this thread"),
			Error::Os(e) => write!(f, "{}", std::io::Error::from_raw_os_error(*e)),
		}
	}
}

impl std::error::Error for Error {}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum LockPiError {
	/// The lock owner is about to exit, but has not yet handled the internal
	/// state cleanup. Try again.
	TryAgain,
	/// The lock is already held by the calling thread.
	Deadlock,
	/// Any other errno.
	Os(i32),
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TryLockPiError {
	/// The lock is held by another thread.
	Busy,
	/// The lock is already held by the calling thread.
	Deadlock,
	/// Any other errno.
	Os(i32),
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum UnlockPiError {
	/// The calling thread does not own the lock.
	Permission,
	/// Any other errno.
	Os(i32),
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum WaitRequeueError {
	/// The futex value did not match the expected value, or the thread was
	/// woken without being requeued to the PI futex first.
	TryAgain,
	/// The absolute deadline expired before the operation completed. Only
	/// produced by the timed wait.
	TimedOut,
	/// The operation was interrupted by a signal.
	Interrupted,
	/// Any other errno.
	Os(i32),
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum CmpRequeueError {
	/// The futex value did not match the expected value.
	TryAgain,
	/// Any other errno.
	Os(i32),
}
