//! Typed wrappers for the PI-futex subset of the `SYS_futex` interface.

use std::sync::atomic::AtomicU32;

use crate::errors::{CmpRequeueError, LockPiError, TryLockPiError, UnlockPiError, WaitRequeueError};
use crate::sys::{Error, FutexCall};
use crate::timeout::Deadline;

/// The op-word flag selecting process-private futexes.
///
/// This is the runtime counterpart of the `PSHARED` bit: a shared
/// primitive must leave the flag off so the kernel keys the futex on the
/// underlying page rather than the virtual address.
#[inline]
pub fn scope_flag(pshared: bool) -> i32 {
	if pshared {
		0
	} else {
		libc::FUTEX_PRIVATE_FLAG
	}
}

/// A plain 32-bit futex word, used as the condition variable's generation
/// counter. The kernel attaches no meaning to its value beyond the
/// equality checks requested by each operation.
#[repr(transparent)]
pub struct Futex {
	pub value: AtomicU32,
}

/// A priority-inheriting futex word.
///
/// Unlike a plain [`Futex`], the value of a [`PiFutex`] has meaning to
/// the Linux kernel: zero is unlocked, and a nonzero value holds the
/// owner's kernel thread id plus kernel-managed state bits. User-space
/// must follow the assumed protocol to allow the kernel to properly
/// implement priority inheritance.
///
/// See the *Priority-inheritance futexes* section of [the Linux futex man
/// page](http://man7.org/linux/man-pages/man2/futex.2.html) for details.
#[repr(transparent)]
pub struct PiFutex {
	pub value: AtomicU32,
}

impl Futex {
	#[inline]
	pub const fn new(value: u32) -> Self {
		Self {
			value: AtomicU32::new(value),
		}
	}

	/// Wait until this futex is awoken after being requeued to a [`PiFutex`].
	///
	/// A [`cmp_requeue_pi`][Futex::cmp_requeue_pi] call on this futex
	/// naming the same [`PiFutex`] wakes or requeues this waiter. On `Ok`,
	/// the kernel has already granted the caller ownership of the target,
	/// with priority inheritance applied during the transition.
	///
	/// The thread is only sent to sleep if the futex's value matches the
	/// expected value; otherwise this returns [`WaitRequeueError::TryAgain`].
	#[inline]
	pub fn wait_requeue_pi(
		&self,
		expected_value: u32,
		target: &PiFutex,
		scope: i32,
	) -> Result<(), WaitRequeueError> {
		let r = unsafe {
			FutexCall::new()
				.futex_op(libc::FUTEX_WAIT_REQUEUE_PI + scope)
				.uaddr(&self.value)
				.uaddr2(&target.value)
				.val(expected_value)
				.call()
		};
		match r {
			Err(Error(libc::EAGAIN)) => Err(WaitRequeueError::TryAgain),
			Err(Error(libc::EINTR)) => Err(WaitRequeueError::Interrupted),
			Err(Error(e)) => Err(WaitRequeueError::Os(e)),
			Ok(_) => Ok(()),
		}
	}

	/// Like [`wait_requeue_pi`][Futex::wait_requeue_pi], giving up at an
	/// absolute deadline.
	///
	/// The deadline's clock is encoded into the operation; the kernel
	/// treats requeue-PI timeouts as absolute on either clock.
	#[inline]
	pub fn wait_requeue_pi_until(
		&self,
		expected_value: u32,
		target: &PiFutex,
		deadline: &Deadline,
		scope: i32,
	) -> Result<(), WaitRequeueError> {
		let r = unsafe {
			FutexCall::new()
				.futex_op(libc::FUTEX_WAIT_REQUEUE_PI + deadline.clock_flag() + scope)
				.uaddr(&self.value)
				.uaddr2(&target.value)
				.val(expected_value)
				.timeout(deadline.timespec())
				.call()
		};
		match r {
			Err(Error(libc::EAGAIN)) => Err(WaitRequeueError::TryAgain),
			Err(Error(libc::ETIMEDOUT)) => Err(WaitRequeueError::TimedOut),
			Err(Error(libc::EINTR)) => Err(WaitRequeueError::Interrupted),
			Err(Error(e)) => Err(WaitRequeueError::Os(e)),
			Ok(_) => Ok(()),
		}
	}

	/// Wake one waiter and requeue up to `n_requeue` onto a [`PiFutex`].
	///
	/// Only affects waiters blocked in [`wait_requeue_pi`][Futex::wait_requeue_pi]
	/// or [`wait_requeue_pi_until`][Futex::wait_requeue_pi_until] naming
	/// the same target. The number of waiters to wake cannot be chosen and
	/// is always 1; if the target is uncontended, the kernel grants that
	/// waiter ownership directly.
	///
	/// The operation only executes if the futex's value matches the
	/// expected value. Returns the total number of waiters woken or
	/// requeued.
	#[inline]
	pub fn cmp_requeue_pi(
		&self,
		expected_value: u32,
		target: &PiFutex,
		n_requeue: i32,
		scope: i32,
	) -> Result<i32, CmpRequeueError> {
		let r = unsafe {
			FutexCall::new()
				.futex_op(libc::FUTEX_CMP_REQUEUE_PI + scope)
				.uaddr(&self.value)
				.uaddr2(&target.value)
				.val(1)
				.val2(n_requeue)
				.val3(expected_value)
				.call()
		};
		match r {
			Err(Error(libc::EAGAIN)) => Err(CmpRequeueError::TryAgain),
			Err(Error(e)) => Err(CmpRequeueError::Os(e)),
			Ok(v) => Ok(v),
		}
	}
}

impl PiFutex {
	/// The `FUTEX_WAITERS` bit the kernel sets while threads are blocked on
	/// the word.
	pub const WAITERS: u32 = 0x8000_0000;

	/// The bits holding the owner's thread id (`FUTEX_TID_MASK`).
	pub const TID_MASK: u32 = 0x3fff_ffff;

	#[inline]
	pub const fn new(value: u32) -> Self {
		Self {
			value: AtomicU32::new(value),
		}
	}

	/// See `FUTEX_LOCK_PI` in the [Linux futex man page](http://man7.org/linux/man-pages/man2/futex.2.html).
	#[inline]
	pub fn lock_pi(&self, scope: i32) -> Result<(), LockPiError> {
		let r = unsafe {
			FutexCall::new()
				.futex_op(libc::FUTEX_LOCK_PI + scope)
				.uaddr(&self.value)
				.call()
		};
		match r {
			Err(Error(libc::EAGAIN)) => Err(LockPiError::TryAgain),
			Err(Error(libc::EDEADLK)) => Err(LockPiError::Deadlock),
			Err(Error(e)) => Err(LockPiError::Os(e)),
			Ok(_) => Ok(()),
		}
	}

	/// See `FUTEX_TRYLOCK_PI` in the [Linux futex man page](http://man7.org/linux/man-pages/man2/futex.2.html).
	#[inline]
	pub fn trylock_pi(&self, scope: i32) -> Result<(), TryLockPiError> {
		let r = unsafe {
			FutexCall::new()
				.futex_op(libc::FUTEX_TRYLOCK_PI + scope)
				.uaddr(&self.value)
				.call()
		};
		match r {
			Err(Error(libc::EAGAIN)) => Err(TryLockPiError::Busy),
			Err(Error(libc::EDEADLK)) => Err(TryLockPiError::Deadlock),
			Err(Error(e)) => Err(TryLockPiError::Os(e)),
			Ok(_) => Ok(()),
		}
	}

	/// See `FUTEX_UNLOCK_PI` in the [Linux futex man page](http://man7.org/linux/man-pages/man2/futex.2.html).
	#[inline]
	pub fn unlock_pi(&self, scope: i32) -> Result<(), UnlockPiError> {
		let r = unsafe {
			FutexCall::new()
				.futex_op(libc::FUTEX_UNLOCK_PI + scope)
				.uaddr(&self.value)
				.call()
		};
		match r {
			Err(Error(libc::EPERM)) => Err(UnlockPiError::Permission),
			Err(Error(e)) => Err(UnlockPiError::Os(e)),
			Ok(_) => Ok(()),
		}
	}
}
