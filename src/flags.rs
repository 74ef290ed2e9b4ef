use bitflags::bitflags;

bitflags! {
	/// Flags accepted by [`PiMutex::new`][crate::PiMutex::new].
	///
	/// Raw flag words (for example read back from shared memory) go through
	/// [`MutexFlags::from_bits`], which rejects unknown bits.
	#[derive(Clone, Copy, PartialEq, Eq, Debug)]
	pub struct MutexFlags: u32 {
		/// The mutex is placed in memory shared between processes and must
		/// be usable from any of them.
		const PSHARED = 1;
	}

	/// Flags accepted by [`PiCond::new`][crate::PiCond::new].
	///
	/// `PSHARED` must match the associated mutex.
	#[derive(Clone, Copy, PartialEq, Eq, Debug)]
	pub struct CondFlags: u32 {
		/// The condition variable is placed in memory shared between
		/// processes and must be usable from any of them.
		const PSHARED = 1;
		/// Absolute deadlines are interpreted on the realtime (wall) clock
		/// instead of the monotonic clock.
		const CLOCK_REALTIME = 2;
	}
}
