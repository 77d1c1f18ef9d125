use std::fmt;

/// Represents a single packet identifier
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq)]
pub struct PacketId {
    value: u16,
}

impl PacketId {
    /// The packet id
    pub fn value(&self) -> u16 {
        self.value
    }
}

impl From<PacketId> for u16 {
    fn from(packet_id: PacketId) -> Self {
        packet_id.value
    }
}

impl From<u16> for PacketId {
    fn from(packet_id: u16) -> Self {
        PacketId { value: packet_id }
    }
}

impl fmt::Display for PacketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

/// Hands out packet identifiers, skipping zero which MQTT reserves
#[derive(Debug, Default)]
pub struct PacketsNumerator {
    value: u16,
}

impl PacketsNumerator {
    /// Creates a numerator starting at 1
    pub fn new() -> PacketsNumerator {
        PacketsNumerator { value: 0 }
    }

    /// The next packet identifier
    pub fn next(&mut self) -> PacketId {
        self.value = self.value.wrapping_add(1);
        if self.value == 0 {
            self.value = 1;
        }
        self.value.into()
    }
}

/// Determines if we start a clean session, or resume the previous session (dirty).
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SessionMode {
    /// Start a clean session
    Clean,

    /// Resume the previous session
    Dirty,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numerator_skips_zero_on_wrap() {
        let mut sut = PacketsNumerator { value: u16::MAX - 1 };
        assert_eq!(sut.next().value(), u16::MAX);
        assert_eq!(sut.next().value(), 1);
    }
}
