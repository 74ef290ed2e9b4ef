use std::fmt;
use std::sync::atomic::Ordering;

use crate::errors::{Error, LockPiError, TryLockPiError, UnlockPiError};
use crate::flags::MutexFlags;
use crate::futex::{scope_flag, PiFutex};

thread_local! {
	static TID: u32 = unsafe { libc::syscall(libc::SYS_gettid) as u32 };
}

#[inline]
fn tid() -> u32 {
	TID.with(|t| *t)
}

const MUTEX_PAD: usize = 56;

/// A priority-inheriting mutex.
///
/// The mutex is a single kernel-governed futex word: zero when unlocked,
/// otherwise the owner's thread id with the `FUTEX_WAITERS` bit set by
/// the kernel while threads are blocked. Uncontended lock and
/// unlock are a single compare-and-swap in user space; contended paths go
/// through `FUTEX_LOCK_PI`/`FUTEX_UNLOCK_PI`, which boost the owner to
/// the highest blocked priority and hand the lock to the
/// highest-priority waiter on release.
///
/// The record is one cache line and the caller owns its storage, so it
/// can be placed in a shared-memory segment and used across processes
/// when created with [`MutexFlags::PSHARED`]. A zeroed record with the
/// flags word set is a validly initialized mutex.
#[repr(C, align(64))]
pub struct PiMutex {
	pub(crate) futex: PiFutex,
	flags: u32,
	_pad: [u8; MUTEX_PAD],
}

impl PiMutex {
	/// Create a new, unlocked mutex. No syscall is involved.
	#[inline]
	pub const fn new(flags: MutexFlags) -> Self {
		Self {
			futex: PiFutex::new(0),
			flags: flags.bits(),
			_pad: [0; MUTEX_PAD],
		}
	}

	/// The flags the mutex was created with.
	#[inline]
	pub fn flags(&self) -> MutexFlags {
		MutexFlags::from_bits_truncate(self.flags)
	}

	#[inline]
	fn scope(&self) -> i32 {
		scope_flag(self.flags & MutexFlags::PSHARED.bits() != 0)
	}

	/// Acquire the mutex, blocking with priority inheritance while another
	/// thread owns it.
	///
	/// Returns [`Error::Deadlock`] if the calling thread already owns the
	/// mutex.
	pub fn lock(&self) -> Result<(), Error> {
		if self
			.futex
			.value
			.compare_exchange(0, tid(), Ordering::Acquire, Ordering::Relaxed)
			.is_ok()
		{
			return Ok(());
		}
		loop {
			match self.futex.lock_pi(self.scope()) {
				Ok(()) => return Ok(()),
				Err(LockPiError::TryAgain) => continue,
				Err(LockPiError::Deadlock) => return Err(Error::Deadlock),
				Err(LockPiError::Os(e)) => return Err(Error::Os(e)),
			}
		}
	}

	/// Acquire the mutex only if it is free.
	///
	/// Returns [`Error::Busy`] if another thread owns it and
	/// [`Error::Deadlock`] if the calling thread does.
	pub fn try_lock(&self) -> Result<(), Error> {
		if self
			.futex
			.value
			.compare_exchange(0, tid(), Ordering::Acquire, Ordering::Relaxed)
			.is_ok()
		{
			return Ok(());
		}
		match self.futex.trylock_pi(self.scope()) {
			Ok(()) => Ok(()),
			Err(TryLockPiError::Busy) => Err(Error::Busy),
			Err(TryLockPiError::Deadlock) => Err(Error::Deadlock),
			Err(TryLockPiError::Os(e)) => Err(Error::Os(e)),
		}
	}

	/// Release the mutex.
	///
	/// With no waiters this is a single compare-and-swap; otherwise the
	/// kernel transfers ownership to the highest-priority waiter. Returns
	/// [`Error::Permission`] if the calling thread is not the owner.
	pub fn unlock(&self) -> Result<(), Error> {
		let tid = tid();
		let v = self.futex.value.load(Ordering::Relaxed);
		if v & PiFutex::TID_MASK != tid {
			return Err(Error::Permission);
		}
		if v & PiFutex::WAITERS == 0
			&& self
				.futex
				.value
				.compare_exchange(tid, 0, Ordering::Release, Ordering::Relaxed)
				.is_ok()
		{
			return Ok(());
		}
		match self.futex.unlock_pi(self.scope()) {
			Ok(()) => Ok(()),
			Err(UnlockPiError::Permission) => Err(Error::Permission),
			Err(UnlockPiError::Os(e)) => Err(Error::Os(e)),
		}
	}

	/// Invalidate the mutex, zeroing its storage.
	///
	/// Returns [`Error::Busy`] while any thread owns it.
	pub fn destroy(&mut self) -> Result<(), Error> {
		if *self.futex.value.get_mut() != 0 {
			return Err(Error::Busy);
		}
		self.flags = 0;
		Ok(())
	}

	/// Acquire the mutex even if the calling thread already owns it.
	///
	/// Returns `true` when the mutex was already owned, in which case the
	/// matching [`unlock_restore`][PiMutex::unlock_restore] leaves it
	/// locked.
	pub(crate) fn lock_save(&self) -> Result<bool, Error> {
		match self.try_lock() {
			Ok(()) => Ok(false),
			Err(Error::Deadlock) => Ok(true),
			Err(_) => self.lock().map(|()| false),
		}
	}

	/// Undo a [`lock_save`][PiMutex::lock_save].
	pub(crate) fn unlock_restore(&self, owned: bool) -> Result<(), Error> {
		if owned {
			Ok(())
		} else {
			self.unlock()
		}
	}
}

impl Default for PiMutex {
	fn default() -> Self {
		Self::new(MutexFlags::empty())
	}
}

impl fmt::Debug for PiMutex {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		f.debug_struct("PiMutex")
			.field("futex", &self.futex.value)
			.field("flags", &self.flags())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn layout() {
		assert_eq!(std::mem::size_of::<PiMutex>(), 64);
		assert_eq!(std::mem::align_of::<PiMutex>(), 64);
	}

	#[test]
	fn lock_unlock() {
		let m = PiMutex::new(MutexFlags::empty());
		m.lock().unwrap();
		m.unlock().unwrap();
		m.try_lock().unwrap();
		m.unlock().unwrap();
	}

	#[test]
	fn relock_is_deadlock() {
		let m = PiMutex::new(MutexFlags::empty());
		m.lock().unwrap();
		assert_eq!(m.lock(), Err(Error::Deadlock));
		assert_eq!(m.try_lock(), Err(Error::Deadlock));
		m.unlock().unwrap();
	}

	#[test]
	fn unlock_unowned_is_permission() {
		let m = PiMutex::new(MutexFlags::empty());
		assert_eq!(m.unlock(), Err(Error::Permission));
		m.lock().unwrap();
		m.unlock().unwrap();
		assert_eq!(m.unlock(), Err(Error::Permission));
	}

	#[test]
	fn destroy_owned_is_busy() {
		let mut m = PiMutex::new(MutexFlags::empty());
		m.lock().unwrap();
		assert_eq!(m.destroy(), Err(Error::Busy));
		m.unlock().unwrap();
		m.destroy().unwrap();
	}

	#[test]
	fn save_restore_is_idempotent() {
		let m = PiMutex::new(MutexFlags::empty());

		// Not owned: saves by acquiring, restore releases.
		let owned = m.lock_save().unwrap();
		assert!(!owned);
		m.unlock_restore(owned).unwrap();
		assert_eq!(m.unlock(), Err(Error::Permission));

		// Already owned: restore leaves the lock held.
		m.lock().unwrap();
		let owned = m.lock_save().unwrap();
		assert!(owned);
		m.unlock_restore(owned).unwrap();
		assert_eq!(m.lock(), Err(Error::Deadlock));
		m.unlock().unwrap();
	}

	#[test]
	fn pshared_flag_is_recorded() {
		let m = PiMutex::new(MutexFlags::PSHARED);
		assert_eq!(m.flags(), MutexFlags::PSHARED);
		m.lock().unwrap();
		m.unlock().unwrap();
	}
}
