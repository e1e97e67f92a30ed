//! CP0 status and cause register bits
//!
//! The timer interrupt entry receives the raw CP0 `Status` and `Cause`
//! values of the interrupted context. Only the bits the scheduler looks at
//! are named.

use bitflags::bitflags;

bitflags! {
    /// CP0 Status register (register 12)
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Status: u32 {
        /// Global interrupt enable
        const IE  = 1 << 0;

        /// Exception level: set while handling an exception
        const EXL = 1 << 1;

        /// Error level
        const ERL = 1 << 2;

        /// Interrupt mask for the compare timer line (IP7)
        const IM7 = 1 << 15;
    }
}

bitflags! {
    /// CP0 Cause register (register 13)
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Cause: u32 {
        /// Software interrupt 0 pending
        const IP0 = 1 << 8;

        /// Software interrupt 1 pending
        const IP1 = 1 << 9;

        /// Compare timer interrupt pending
        const IP7 = 1 << 15;

        /// Count register disabled
        const DC  = 1 << 27;

        /// Exception occurred in a branch delay slot
        const BD  = 1 << 31;
    }
}

impl Status {
    /// Whether interrupts are delivered in this state
    #[inline]
    pub fn interrupts_enabled(self) -> bool {
        self.contains(Status::IE) && !self.intersects(Status::EXL | Status::ERL)
    }
}

impl Cause {
    /// Whether the compare timer is the pending source
    #[inline]
    pub fn is_timer(self) -> bool {
        self.contains(Cause::IP7)
    }
}
