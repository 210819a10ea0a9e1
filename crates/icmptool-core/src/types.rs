use derive_more::{Add, AddAssign, Display};

/// `TimeToLive` (ttl) newtype.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Ord, PartialOrd, Hash, Add, AddAssign, Display,
)]
pub struct TimeToLive(pub u8);

/// `Sequence` number newtype.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Ord, PartialOrd, Hash, Display)]
pub struct Sequence(pub u16);

/// `TraceId` newtype.
///
/// The `ICMP` echo identifier shared by every probe of a single run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Ord, PartialOrd, Hash, Display)]
pub struct TraceId(pub u16);
