use core::fmt::Debug;
use core::hash::Hash;

/// Abstracts bus opening and closing.
///
/// Implementors wrap the native calls that claim a physical bus (for example
/// opening `/dev/i2c-1`) and give it back. A [`BusTable`](crate::BusTable)
/// guarantees `open` runs once per key while the bus is in use and `close`
/// runs once when the last handle is released.
pub trait BusFactory: Send + Sync + 'static {
    /// Identifies one physical bus.
    type Key: Clone + Eq + Hash + Debug + Send + Sync + 'static;
    /// The open bus shared among handles.
    type Bus: Send + Sync + 'static;
    /// Error type for open/close failures.
    type Error: Debug + Send + 'static;

    /// Open the bus identified by `key`.
    fn open(&self, key: &Self::Key) -> Result<Self::Bus, Self::Error>;

    /// Close a bus previously returned by [`open`](Self::open).
    ///
    /// The bus is consumed whether or not closing succeeds.
    fn close(&self, key: &Self::Key, bus: Self::Bus) -> Result<(), Self::Error>;
}
