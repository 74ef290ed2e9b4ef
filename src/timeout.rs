use libc::{c_long, time_t};
use std::fmt;
use std::time::{Duration, Instant, SystemTime};

/// An absolute point in time for [`PiCond::timedwait`][crate::PiCond::timedwait].
///
/// A deadline lives on one of two timelines: the monotonic clock
/// ([`Instant`]) or the realtime (wall) clock ([`SystemTime`]). Which
/// timeline a condition variable accepts is fixed at creation by
/// [`CondFlags::CLOCK_REALTIME`][crate::CondFlags::CLOCK_REALTIME];
/// passing a deadline from the other timeline is an error.
#[derive(Clone, Copy)]
pub struct Deadline {
	clock: Clock,
	ts: libc::timespec,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Clock {
	Monotonic,
	Realtime,
}

impl Deadline {
	/// A deadline on the monotonic clock, in seconds and nanoseconds since
	/// an unspecified starting point (usually boot).
	#[inline]
	pub const fn monotonic(secs: time_t, nanos: c_long) -> Self {
		Self {
			clock: Clock::Monotonic,
			ts: libc::timespec {
				tv_sec: secs,
				tv_nsec: nanos,
			},
		}
	}

	/// A deadline on the realtime clock, in seconds and nanoseconds since
	/// the Unix epoch.
	#[inline]
	pub const fn realtime(secs: time_t, nanos: c_long) -> Self {
		Self {
			clock: Clock::Realtime,
			ts: libc::timespec {
				tv_sec: secs,
				tv_nsec: nanos,
			},
		}
	}

	/// Whether this deadline is interpreted on the realtime clock.
	#[inline]
	pub fn is_realtime(&self) -> bool {
		self.clock == Clock::Realtime
	}

	pub(crate) fn is_valid(&self) -> bool {
		self.ts.tv_sec >= 0 && self.ts.tv_nsec >= 0 && self.ts.tv_nsec < 1_000_000_000
	}

	pub(crate) fn clock_flag(&self) -> i32 {
		match self.clock {
			Clock::Monotonic => 0,
			Clock::Realtime => libc::FUTEX_CLOCK_REALTIME,
		}
	}

	pub(crate) fn timespec(&self) -> *const libc::timespec {
		&self.ts
	}
}

impl From<Instant> for Deadline {
	#[inline]
	fn from(t: Instant) -> Self {
		Self {
			clock: Clock::Monotonic,
			ts: as_timespec(t.duration_since(unsafe { std::mem::zeroed() })),
		}
	}
}

impl From<SystemTime> for Deadline {
	#[inline]
	fn from(t: SystemTime) -> Self {
		// A pre-epoch time has no timespec representation; leave it
		// malformed so timedwait rejects it.
		let ts = match t.duration_since(SystemTime::UNIX_EPOCH) {
			Ok(d) => as_timespec(d),
			Err(_) => libc::timespec {
				tv_sec: -1,
				tv_nsec: 0,
			},
		};
		Self {
			clock: Clock::Realtime,
			ts,
		}
	}
}

impl fmt::Debug for Deadline {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		f.debug_struct("Deadline")
			.field("clock", &self.clock)
			.field("secs", &self.ts.tv_sec)
			.field("nanos", &self.ts.tv_nsec)
			.finish()
	}
}

#[inline]
fn as_timespec(d: Duration) -> libc::timespec {
	libc::timespec {
		tv_sec: d.as_secs() as time_t,
		tv_nsec: d.subsec_nanos() as c_long,
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn validation() {
		assert!(Deadline::monotonic(0, 0).is_valid());
		assert!(Deadline::realtime(1, 999_999_999).is_valid());
		assert!(!Deadline::monotonic(-1, 0).is_valid());
		assert!(!Deadline::realtime(0, -1).is_valid());
		assert!(!Deadline::realtime(0, 1_000_000_000).is_valid());
	}

	#[test]
	fn clock_tagging() {
		assert!(!Deadline::from(Instant::now()).is_realtime());
		assert!(Deadline::from(SystemTime::now()).is_realtime());
		assert!(Deadline::from(Instant::now()).is_valid());
		assert!(Deadline::from(SystemTime::now()).is_valid());
	}

	#[test]
	fn pre_epoch_is_malformed() {
		let t = SystemTime::UNIX_EPOCH - Duration::from_secs(1);
		assert!(!Deadline::from(t).is_valid());
	}
}
