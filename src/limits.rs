//! Size ceilings for strings and container lengths.
//!
//! The varint encoding admits values far larger than any sane message
//! should carry; `Limits` is the codec's configurable answer to spec.md
//! §9's open question of how wide that ceiling should be.

/// Upper bound on a string length or a list/set/map size.
///
/// The compact-protocol wire format itself has no opinion here — this is
/// purely a defensive ceiling the codec enforces before trusting a
/// length/size it just decoded (or before emitting one a caller handed it).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Sizes strictly greater than this are rejected with
    /// `Error::SizeLimitExceeded`.
    pub max_size: i32,
}

impl Limits {
    /// The original source's limit, kept for bug-for-bug interop with
    /// peers built against it.
    pub const LEGACY: Limits = Limits { max_size: 0x7FFF };

    /// The full signed-32-bit limit the wire format's length fields allow.
    pub const WIDE: Limits = Limits {
        max_size: i32::MAX,
    };
}

impl Default for Limits {
    fn default() -> Self {
        Limits::WIDE
    }
}
