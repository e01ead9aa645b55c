//! Builds [`CompactProtocol`] instances sharing a common [`Limits`].

use crate::limits::Limits;
use crate::protocol::CompactProtocol;

/// Stamps out [`CompactProtocol`] wrappers around whatever transports a
/// caller hands it, all sharing the same size limits.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompactProtocolFactory {
    limits: Limits,
}

impl CompactProtocolFactory {
    /// A factory using the default (wide) limits.
    pub fn new() -> Self {
        Self::with_limits(Limits::default())
    }

    /// A factory enforcing `limits` on every protocol it produces.
    pub fn with_limits(limits: Limits) -> Self {
        Self { limits }
    }

    /// Wraps `transport` in a protocol using this factory's limits.
    pub fn get_protocol<T>(&self, transport: T) -> CompactProtocol<T> {
        CompactProtocol::with_limits(transport, self.limits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_factory_uses_wide_limits() {
        let factory = CompactProtocolFactory::new();
        let protocol = factory.get_protocol(Vec::<u8>::new());
        drop(protocol);
    }

    #[test]
    fn factory_shares_limits_across_protocols() {
        let factory = CompactProtocolFactory::with_limits(Limits::LEGACY);
        let a = factory.get_protocol(Vec::<u8>::new());
        let b = factory.get_protocol(Vec::<u8>::new());
        drop(a);
        drop(b);
    }
}
