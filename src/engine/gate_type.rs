use serde::{Deserialize, Serialize};

/// Gate opcodes. The numeric values are part of the leaf wire format and of
/// the layout-commitment preimage, so they are frozen.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GateKind {
    And = 0,
    Xor = 1,
    Not = 2,
}

impl GateKind {
    /// Plaintext truth table over single-bit inputs. NOT ignores `b`.
    pub fn apply(&self, a: u8, b: u8) -> u8 {
        match self {
            GateKind::And => a & b & 1,
            GateKind::Xor => (a ^ b) & 1,
            GateKind::Not => (a ^ 1) & 1,
        }
    }

    /// Whether the garbled leaf carries encrypted rows. NOT leaves keep all
    /// four rows zero; their semantics live in the layout.
    pub fn has_rows(&self) -> bool {
        !matches!(self, GateKind::Not)
    }
}

impl TryFrom<u8> for GateKind {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, u8> {
        match value {
            0 => Ok(GateKind::And),
            1 => Ok(GateKind::Xor),
            2 => Ok(GateKind::Not),
            other => Err(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truth_tables() {
        for (a, b) in [(0u8, 0u8), (0, 1), (1, 0), (1, 1)] {
            assert_eq!(GateKind::And.apply(a, b), a & b);
            assert_eq!(GateKind::Xor.apply(a, b), a ^ b);
            assert_eq!(GateKind::Not.apply(a, b), 1 - a);
        }
    }

    #[test]
    fn test_opcode_round_trip() {
        for kind in [GateKind::And, GateKind::Xor, GateKind::Not] {
            assert_eq!(GateKind::try_from(kind as u8), Ok(kind));
        }
        assert_eq!(GateKind::try_from(3), Err(3));
    }
}
