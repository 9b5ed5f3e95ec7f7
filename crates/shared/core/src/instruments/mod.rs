//! Instrument trading constraints
//!
//! The exchange decides how finely an order quantity may be expressed. The
//! sizer and the watchdog only need the lot step, the minimum size and the
//! contract multiplier.

mod constraints;

pub use constraints::InstrumentConstraints;
