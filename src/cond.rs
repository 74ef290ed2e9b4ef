use std::fmt;
use std::marker::PhantomData;
use std::ptr;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::errors::{CmpRequeueError, Error, WaitRequeueError};
use crate::flags::{CondFlags, MutexFlags};
use crate::futex::{scope_flag, Futex};
use crate::mutex::PiMutex;
use crate::timeout::Deadline;

const COND_PAD: usize = 116 - std::mem::size_of::<*const ()>();

/// A condition variable for a [`PiMutex`], with priority inheritance
/// preserved across the wakeup.
///
/// The condition variable is bound to one mutex for its whole life. A
/// waiter must own that mutex; `wait` releases it, sleeps on an internal
/// generation counter, and returns owning it again. Signal and broadcast
/// go through `FUTEX_CMP_REQUEUE_PI`, which moves waiters onto the
/// mutex's wait queue inside the kernel, so a woken thread is handed the
/// mutex directly (or queued on it with priority inheritance applied)
/// instead of racing to relock it.
///
/// Every wait arrival and every wake advances the generation counter.
/// The kernel refuses to sleep a waiter, and refuses to wake for a
/// signaler, whose snapshot of the counter is stale; both sides then
/// reconcile through `wake_id`, the generation stamped by the most
/// recent wake. This is what makes concurrent signalers, and signalers
/// that do not hold the mutex, safe against lost wakeups.
///
/// Signalers are not required to hold the mutex; doing so gives the
/// classical guarantee that a predicate change and its wake cannot be
/// missed by a concurrent waiter.
#[repr(C, align(64))]
pub struct PiCond<'m> {
	mutex: *const PiMutex,
	cond: Futex,
	wake_id: AtomicU32,
	flags: u32,
	_pad: [u8; COND_PAD],
	_marker: PhantomData<&'m PiMutex>,
}

// The raw mutex pointer is only dereferenced while `'m` keeps the mutex
// alive, and all shared state is mutated through atomics or the kernel.
unsafe impl Send for PiCond<'_> {}
unsafe impl Sync for PiCond<'_> {}

impl<'m> PiCond<'m> {
	/// Create a condition variable bound to `mutex`. No syscall is
	/// involved.
	///
	/// Returns [`Error::InvalidArgument`] when the `PSHARED` flag does not
	/// match the mutex's: a shared condition variable cannot requeue onto
	/// a private futex, nor the other way around.
	pub fn new(mutex: &'m PiMutex, flags: CondFlags) -> Result<Self, Error> {
		if flags.contains(CondFlags::PSHARED) != mutex.flags().contains(MutexFlags::PSHARED) {
			return Err(Error::InvalidArgument);
		}
		Ok(Self {
			mutex: mutex as *const PiMutex,
			cond: Futex::new(0),
			wake_id: AtomicU32::new(0),
			flags: flags.bits(),
			_pad: [0; COND_PAD],
			_marker: PhantomData,
		})
	}

	/// The flags the condition variable was created with.
	#[inline]
	pub fn flags(&self) -> CondFlags {
		CondFlags::from_bits_truncate(self.flags)
	}

	#[inline]
	fn mutex(&self) -> Result<&'m PiMutex, Error> {
		if self.mutex.is_null() {
			return Err(Error::InvalidArgument);
		}
		Ok(unsafe { &*self.mutex })
	}

	#[inline]
	fn scope(&self) -> i32 {
		scope_flag(self.flags & CondFlags::PSHARED.bits() != 0)
	}

	#[inline]
	fn realtime(&self) -> bool {
		self.flags & CondFlags::CLOCK_REALTIME.bits() != 0
	}

	/// Release the mutex and sleep until a [`signal`][PiCond::signal] or
	/// [`broadcast`][PiCond::broadcast] arrives.
	///
	/// The calling thread must own the associated mutex, and owns it again
	/// on every return. Returns [`Error::Permission`] (with the mutex
	/// untouched) when the caller does not own it.
	pub fn wait(&self) -> Result<(), Error> {
		self.wait_inner(None)
	}

	/// Like [`wait`][PiCond::wait], giving up at an absolute deadline.
	///
	/// The deadline must live on the clock selected at creation: the
	/// monotonic clock by default, the realtime clock if the condition
	/// variable was created with [`CondFlags::CLOCK_REALTIME`]. A deadline
	/// on the wrong clock, or one with malformed seconds or nanoseconds,
	/// is reported as [`Error::InvalidArgument`] without releasing the
	/// mutex. On [`Error::TimedOut`] the caller owns the mutex again.
	pub fn timedwait(&self, deadline: Deadline) -> Result<(), Error> {
		if !deadline.is_valid() || deadline.is_realtime() != self.realtime() {
			return Err(Error::InvalidArgument);
		}
		self.wait_inner(Some(deadline))
	}

	fn wait_inner(&self, deadline: Option<Deadline>) -> Result<(), Error> {
		let mutex = self.mutex()?;

		// The snapshot must be taken before our arrival bumps the
		// generation, so it names a wake that predates this wait.
		let wake_snapshot = self.wake_id.load(Ordering::Relaxed);
		self.cond.value.fetch_add(1, Ordering::Relaxed);

		loop {
			let futex_id = self.cond.value.load(Ordering::Relaxed);
			mutex.unlock()?;

			let r = match &deadline {
				Some(d) => {
					self.cond
						.wait_requeue_pi_until(futex_id, &mutex.futex, d, self.scope())
				}
				None => self.cond.wait_requeue_pi(futex_id, &mutex.futex, self.scope()),
			};

			let err = match r {
				// Proper wakeup; the kernel handed us the mutex.
				Ok(()) => return Ok(()),
				Err(e) => e,
			};

			// Any other outcome leaves us off the mutex's queue.
			mutex.lock()?;

			match err {
				WaitRequeueError::TryAgain => {
					// The generation moved between our unlock and the
					// kernel's compare. A new wake_id means a waker ran
					// after us and may have counted us: stay awake.
					if self.wake_id.load(Ordering::Relaxed) != wake_snapshot {
						return Ok(());
					}
					self.cond.value.fetch_add(1, Ordering::Relaxed);
				}
				WaitRequeueError::TimedOut => return Err(Error::TimedOut),
				WaitRequeueError::Interrupted => return Err(Error::Interrupted),
				WaitRequeueError::Os(e) => return Err(Error::Os(e)),
			}
		}
	}

	/// Wake one waiter, handing it the mutex (or queueing it there if the
	/// mutex is currently owned).
	pub fn signal(&self) -> Result<(), Error> {
		self.wake_and_requeue(0).map(|_| ())
	}

	/// Wake every waiter: one is woken toward owning the mutex, the rest
	/// are requeued onto the mutex's wait queue and acquire it in priority
	/// order as it is released.
	pub fn broadcast(&self) -> Result<(), Error> {
		self.wake_and_requeue(i32::MAX).map(|_| ())
	}

	fn wake_and_requeue(&self, n_requeue: i32) -> Result<i32, Error> {
		let mutex = self.mutex()?;
		loop {
			let id = self.cond.value.fetch_add(1, Ordering::Relaxed).wrapping_add(1);
			self.wake_id.store(id, Ordering::Relaxed);
			match self.cond.cmp_requeue_pi(id, &mutex.futex, n_requeue, self.scope()) {
				Ok(n) => return Ok(n),
				// A concurrent waker or waiter moved the generation
				// under us; restamp and retry.
				Err(CmpRequeueError::TryAgain) => continue,
				Err(CmpRequeueError::Os(e)) => return Err(Error::Os(e)),
			}
		}
	}

	/// Invalidate the condition variable, zeroing its storage.
	///
	/// Current waiters are woken (requeued onto the mutex) first; if any
	/// were still queued, [`Error::Busy`] is returned and the record is
	/// left intact. The caller may or may not own the mutex.
	pub fn destroy(&mut self) -> Result<(), Error> {
		let mutex = self.mutex()?;
		let owned = mutex.lock_save()?;
		let drained = self.wake_and_requeue(i32::MAX);
		mutex.unlock_restore(owned)?;
		if drained? > 0 {
			return Err(Error::Busy);
		}
		self.mutex = ptr::null();
		*self.cond.value.get_mut() = 0;
		*self.wake_id.get_mut() = 0;
		self.flags = 0;
		Ok(())
	}
}

impl fmt::Debug for PiCond<'_> {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		f.debug_struct("PiCond")
			.field("cond", &self.cond.value)
			.field("wake_id", &self.wake_id)
			.field("flags", &self.flags())
			.finish()
	}
}
