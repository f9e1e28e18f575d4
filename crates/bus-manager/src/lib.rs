//! Keyed bus lifecycle manager for shared peripheral access.
//!
//! Several logical devices often sit on one physical bus (two sensors on
//! I2C bus 1, three chips behind one SPI controller). This crate makes sure
//! each bus is opened exactly once while it is in use and closed exactly once
//! when the last user lets go:
//!
//! - [`BusTable::acquire`] opens the bus for a key on first use and hands out
//!   a [`BusHandle`]; later acquires of the same key share the open bus.
//! - Releasing a handle (explicitly or on drop) decrements the user count; the
//!   last release closes the bus through the [`BusFactory`] and forgets the key.
//!
//! Each key has its own lock, so opening or closing one bus never blocks
//! callers working with a different bus.

mod error;
mod factory;
mod handle;
mod manager;
mod table;

pub use error::BusError;
pub use factory::BusFactory;
pub use handle::BusHandle;
pub use table::BusTable;
