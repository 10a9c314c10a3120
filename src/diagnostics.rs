//! Event counters.

use core::cell::Cell;

use critical_section::Mutex;

/// A `u32` counter shared between interrupt and task context.
///
/// Cores without atomic read-modify-write (thumbv6m) are supported, so the
/// increment runs inside a critical section.
pub(crate) struct Counter(Mutex<Cell<u32>>);

impl Counter {
    pub(crate) const fn new() -> Self {
        Self(Mutex::new(Cell::new(0)))
    }

    pub(crate) fn increment(&self) {
        critical_section::with(|cs| {
            let cell = self.0.borrow(cs);
            cell.set(cell.get().wrapping_add(1));
        });
    }

    pub(crate) fn get(&self) -> u32 {
        critical_section::with(|cs| self.0.borrow(cs).get())
    }
}

/// Snapshot of everything the clock counts instead of reporting.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Diagnostics {
    /// Messages lost to a full clock mailbox
    pub mailbox_dropped: u32,
    /// Button falling edges discarded as contact bounce
    pub bounces_filtered: u32,
    /// Transport tags that named no event
    pub unknown_events: u32,
    /// RTC accesses that failed inside a handler
    pub rtc_faults: u32,
    /// Snapshots lost to a full display queue
    pub display_dropped: u32,
}

impl Diagnostics {
    /// Combines the producer-side and dispatcher-side halves.
    pub const fn merge(self, other: Self) -> Self {
        Self {
            mailbox_dropped: self.mailbox_dropped.wrapping_add(other.mailbox_dropped),
            bounces_filtered: self.bounces_filtered.wrapping_add(other.bounces_filtered),
            unknown_events: self.unknown_events.wrapping_add(other.unknown_events),
            rtc_faults: self.rtc_faults.wrapping_add(other.rtc_faults),
            display_dropped: self.display_dropped.wrapping_add(other.display_dropped),
        }
    }
}
