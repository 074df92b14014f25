//! Timestamp service
//!
//! Reads the active port's free-running cycle counter for profiling. With the
//! `ts` feature disabled every read is the constant 0.

use crate::port::{ActivePort, Port};
use crate::types::OsTs;

/// Read the timestamp counter of port `P`
#[inline(always)]
pub fn read<P: Port>() -> OsTs {
    if cfg!(feature = "ts") {
        P::ts_read()
    } else {
        0
    }
}

/// Read the timestamp counter of the active port
#[inline(always)]
pub fn os_ts_get() -> OsTs {
    read::<ActivePort>()
}

/// Cycles elapsed since `start`, tolerant of one counter wrap
#[inline(always)]
pub fn elapsed_since<P: Port>(start: OsTs) -> OsTs {
    read::<P>().wrapping_sub(start)
}
