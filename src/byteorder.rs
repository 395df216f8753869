/// Byte order of the host.
///
/// Some kernel ABIs take raw structure bytes, so values must be laid out in
/// whatever order the running CPU uses.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Endianness {
    Little,
    Big,
}

const PROBE: u16 = 0xABCD;

impl Endianness {
    /// Probe the host byte order.
    ///
    /// Splits a known 16-bit pattern into its in-memory bytes and checks
    /// which end the low byte landed on. Nothing is cached.
    ///
    /// # Panics
    ///
    /// Panics if neither expected pattern shows up, which would mean the
    /// platform is neither little- nor big-endian.
    pub fn native() -> Endianness {
        match Self::classify(PROBE.to_ne_bytes()) {
            Some(order) => order,
            None => panic!("could not determine native endianness"),
        }
    }

    fn classify(probe: [u8; 2]) -> Option<Endianness> {
        let low = (PROBE & 0xff) as u8;
        let high = (PROBE >> 8) as u8;

        if probe == [low, high] {
            Some(Endianness::Little)
        } else if probe == [high, low] {
            Some(Endianness::Big)
        } else {
            None
        }
    }

    #[inline]
    pub fn u32_bytes(self, v: u32) -> [u8; 4] {
        match self {
            Endianness::Little => v.to_le_bytes(),
            Endianness::Big => v.to_be_bytes(),
        }
    }

    #[inline]
    pub fn read_u32(self, bytes: [u8; 4]) -> u32 {
        match self {
            Endianness::Little => u32::from_le_bytes(bytes),
            Endianness::Big => u32::from_be_bytes(bytes),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn native_agrees_with_target() {
        let expected = if cfg!(target_endian = "little") {
            Endianness::Little
        } else {
            Endianness::Big
        };
        assert_eq!(Endianness::native(), expected);
    }

    #[test]
    fn classify_patterns() {
        assert_eq!(Endianness::classify([0xCD, 0xAB]), Some(Endianness::Little));
        assert_eq!(Endianness::classify([0xAB, 0xCD]), Some(Endianness::Big));
        assert_eq!(Endianness::classify([0xAB, 0xAB]), None);
    }

    #[test]
    fn u32_layout() {
        assert_eq!(Endianness::Little.u32_bytes(0x11223344), [0x44, 0x33, 0x22, 0x11]);
        assert_eq!(Endianness::Big.u32_bytes(0x11223344), [0x11, 0x22, 0x33, 0x44]);
        assert_eq!(Endianness::Big.read_u32([0x11, 0x22, 0x33, 0x44]), 0x11223344);
    }
}
