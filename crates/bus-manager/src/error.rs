use core::fmt;

use derive_more::{Display, Error};

/// Errors that can occur during bus operations.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum BusError<E: fmt::Debug> {
    /// The bus factory failed to open or close the bus.
    #[display("bus factory error: {_0:?}")]
    FactoryError(#[error(not(source))] E),
    /// A bus slot is in an unrecoverable state.
    #[display("bus slot is poisoned")]
    Poisoned,
}
