use std::{fmt, str::FromStr};

use itertools::Itertools;

use crate::byteorder::Endianness;
use crate::constants::*;
use crate::errors::{ConstructionError, ParseFrameError};

/// CanFrame
///
/// A classic CAN frame. On the wire it is the kernel's 16 byte
/// `struct can_frame`:
///
/// | bytes  | content                                   |
/// |--------|-------------------------------------------|
/// | 0..4   | CAN ID + EFF/RTR/ERR flags, host order    |
/// | 4      | data length code (0..=8)                  |
/// | 5..8   | padding / reserved, zero                  |
/// | 8..16  | payload, only the first `dlc` bytes valid |
#[derive(Debug, Copy, Clone)]
pub struct CanFrame {
    /// 32 bit CAN_ID + EFF/RTR/ERR flags
    id: u32,
    /// data length. Bytes beyond are not valid
    dlc: u8,
    /// buffer for data
    data: [u8; CAN_MAX_DLEN],
}

impl CanFrame {
    /// Build a data frame.
    ///
    /// Identifiers above the 11 bit range get the extended flag set
    /// automatically; an identifier that already carries `EFF_FLAG` is taken
    /// as is.
    pub fn new(id: u32, data: &[u8]) -> Result<CanFrame, ConstructionError> {
        if data.len() > CAN_MAX_DLEN {
            return Err(ConstructionError::TooMuchData);
        }

        let mut raw_id = id;
        if id & EFF_FLAG != 0 {
            if id & !EFF_FLAG > EFF_MASK {
                return Err(ConstructionError::IdTooLarge);
            }
        } else if id > EFF_MASK {
            return Err(ConstructionError::IdTooLarge);
        } else if id > SFF_MASK {
            // set EFF_FLAG on large message
            raw_id |= EFF_FLAG;
        }

        let mut full_data = [0; CAN_MAX_DLEN];
        full_data[..data.len()].copy_from_slice(data);

        Ok(CanFrame {
            id: raw_id,
            dlc: data.len() as u8,
            data: full_data,
        })
    }

    /// Assemble a frame from its wire fields without any validation.
    #[inline]
    pub fn from_raw_parts(raw_id: u32, dlc: u8, data: [u8; CAN_MAX_DLEN]) -> CanFrame {
        CanFrame { id: raw_id, dlc, data }
    }

    /// Serialize into the kernel's `struct can_frame` layout.
    pub fn encode(&self) -> [u8; CAN_MTU] {
        let mut buf = [0u8; CAN_MTU];
        buf[0..4].copy_from_slice(&Endianness::native().u32_bytes(self.id));
        buf[4] = self.dlc;
        let data = self.data();
        buf[8..8 + data.len()].copy_from_slice(data);
        buf
    }

    /// Parse a kernel `struct can_frame`.
    ///
    /// The reserved bytes are ignored. All 8 payload bytes are kept, bytes
    /// past the data length code are whatever the sender left there.
    pub fn decode(buf: &[u8; CAN_MTU]) -> CanFrame {
        let mut id = [0u8; 4];
        id.copy_from_slice(&buf[0..4]);
        let mut data = [0u8; CAN_MAX_DLEN];
        data.copy_from_slice(&buf[8..CAN_MTU]);

        CanFrame {
            id: Endianness::native().read_u32(id),
            dlc: buf[4],
            data,
        }
    }

    /// The identifier as sent on the wire, flags included.
    #[inline]
    pub fn raw_id(&self) -> u32 {
        self.id
    }

    /// Return the actual CAN ID (without EFF/RTR/ERR flags)
    #[inline]
    pub fn id(&self) -> u32 {
        if self.is_extended() {
            self.id & EFF_MASK
        } else {
            self.id & SFF_MASK
        }
    }

    /// Check if frame uses 29 bit extended frame format
    #[inline]
    pub fn is_extended(&self) -> bool {
        self.id & EFF_FLAG != 0
    }

    /// Check if frame is an error message
    #[inline]
    pub fn is_error(&self) -> bool {
        self.id & ERR_FLAG != 0
    }

    /// Check if frame is a remote transmission request
    #[inline]
    pub fn is_rtr(&self) -> bool {
        self.id & RTR_FLAG != 0
    }

    #[inline]
    pub fn dlc(&self) -> u8 {
        self.dlc
    }

    /// A slice into the actual data. Slice will always be <= 8 bytes in length
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data[..(self.dlc as usize).min(CAN_MAX_DLEN)]
    }

    /// The whole payload buffer, including bytes beyond the data length code.
    #[inline]
    pub fn payload(&self) -> &[u8; CAN_MAX_DLEN] {
        &self.data
    }
}

impl PartialEq for CanFrame {
    fn eq(&self, other: &CanFrame) -> bool {
        self.id == other.id && self.dlc == other.dlc && self.data() == other.data()
    }
}

impl Eq for CanFrame {}

impl fmt::UpperHex for CanFrame {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        write!(f, "{:X}#", self.id())?;

        let mut parts = self.data().iter().map(|v| format!("{:02X}", v));

        let sep = if f.alternate() { " " } else { "" };
        write!(f, "{}", parts.join(sep))
    }
}

/// Parses the `cansend` style descriptor `<hex id>#<hex bytes>`, e.g.
/// `123#DEADBEEF` or `1F334455#` for an empty extended frame.
impl FromStr for CanFrame {
    type Err = ParseFrameError;

    fn from_str(s: &str) -> Result<CanFrame, ParseFrameError> {
        let (id, data) = s.split_once('#').ok_or(ParseFrameError::MissingSeparator)?;

        // from_str_radix alone would also take a leading sign
        if !id.starts_with(|c: char| c.is_ascii_hexdigit()) {
            return Err(ParseFrameError::InvalidId(id.to_owned()));
        }
        let id = u32::from_str_radix(id, 16)
            .map_err(|_| ParseFrameError::InvalidId(id.to_owned()))?;
        let data = hex::decode(data)?;

        Ok(CanFrame::new(id, &data)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_flags_extended_ids() {
        let std = CanFrame::new(0x7FF, &[]).unwrap();
        assert!(!std.is_extended());
        assert_eq!(std.raw_id(), 0x7FF);

        let ext = CanFrame::new(0x800, &[1]).unwrap();
        assert!(ext.is_extended());
        assert_eq!(ext.raw_id(), 0x800 | EFF_FLAG);
        assert_eq!(ext.id(), 0x800);

        let flagged = CanFrame::new(0x123 | EFF_FLAG, &[]).unwrap();
        assert_eq!(flagged.id(), 0x123);
        assert!(flagged.is_extended());
    }

    #[test]
    fn new_rejects_bad_input() {
        assert_eq!(CanFrame::new(0x100, &[0; 9]), Err(ConstructionError::TooMuchData));
        assert_eq!(CanFrame::new(0x2000_0000, &[]), Err(ConstructionError::IdTooLarge));
        assert_eq!(
            CanFrame::new(EFF_FLAG | RTR_FLAG | 1, &[]),
            Err(ConstructionError::IdTooLarge)
        );
    }

    #[test]
    fn encode_layout() {
        let frame = CanFrame::new(0x123, &[0xDE, 0xAD, 0xBE]).unwrap();
        let wire = frame.encode();

        assert_eq!(&wire[0..4], &0x123u32.to_ne_bytes());
        assert_eq!(wire[4], 3);
        assert_eq!(&wire[5..8], &[0, 0, 0]);
        assert_eq!(&wire[8..11], &[0xDE, 0xAD, 0xBE]);
        assert_eq!(&wire[11..], &[0; 5]);
    }

    #[test]
    fn decode_ignores_reserved_and_keeps_stale_payload() {
        let mut wire = [0u8; CAN_MTU];
        wire[0..4].copy_from_slice(&(0x1234_5678 | EFF_FLAG).to_ne_bytes());
        wire[4] = 2;
        wire[5] = 0xFF;
        wire[6] = 0xEE;
        wire[8..].copy_from_slice(&[1, 2, 3, 4, 5, 6, 7, 8]);

        let frame = CanFrame::decode(&wire);
        assert_eq!(frame.raw_id(), 0x1234_5678 | EFF_FLAG);
        assert_eq!(frame.dlc(), 2);
        assert_eq!(frame.data(), &[1, 2]);
        assert_eq!(frame.payload(), &[1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn codec_round_trip() {
        let frames = [
            CanFrame::new(0x000, &[]).unwrap(),
            CanFrame::new(0x7FF, &[0xAA]).unwrap(),
            CanFrame::new(0x1FFF_FFFF, &[1, 2, 3, 4, 5, 6, 7, 8]).unwrap(),
        ];

        for frame in frames.iter() {
            let decoded = CanFrame::decode(&frame.encode());
            assert_eq!(decoded.raw_id(), frame.raw_id());
            assert_eq!(decoded.dlc(), frame.dlc());
            assert_eq!(decoded.data(), frame.data());
        }
    }

    #[test]
    fn decode_clamps_oversized_dlc() {
        let mut wire = [0u8; CAN_MTU];
        wire[4] = 15;
        let frame = CanFrame::decode(&wire);
        assert_eq!(frame.dlc(), 15);
        assert_eq!(frame.data().len(), 8);
    }

    #[test]
    fn upper_hex() {
        let frame = CanFrame::new(0x1A, &[0x01, 0xFF]).unwrap();
        assert_eq!(format!("{:X}", frame), "1A#01FF");
        assert_eq!(format!("{:#X}", frame), "1A#01 FF");
    }

    #[test]
    fn parse_descriptor() {
        let frame: CanFrame = "123#DEADBEEF".parse().unwrap();
        assert_eq!(frame.id(), 0x123);
        assert_eq!(frame.data(), &[0xDE, 0xAD, 0xBE, 0xEF]);

        let empty: CanFrame = "1F334455#".parse().unwrap();
        assert!(empty.is_extended());
        assert_eq!(empty.dlc(), 0);
    }

    #[test]
    fn parse_rejects_malformed() {
        assert_eq!("123".parse::<CanFrame>(), Err(ParseFrameError::MissingSeparator));
        assert_eq!(
            "XYZ#00".parse::<CanFrame>(),
            Err(ParseFrameError::InvalidId("XYZ".to_owned()))
        );
        assert_eq!(
            "#00".parse::<CanFrame>(),
            Err(ParseFrameError::InvalidId(String::new()))
        );
        assert_eq!(
            "+123#00".parse::<CanFrame>(),
            Err(ParseFrameError::InvalidId("+123".to_owned()))
        );
        assert_eq!(
            "-1#".parse::<CanFrame>(),
            Err(ParseFrameError::InvalidId("-1".to_owned()))
        );
        assert!(matches!(
            "123#ABC".parse::<CanFrame>(),
            Err(ParseFrameError::InvalidData(_))
        ));
        assert!(matches!(
            "123#zz".parse::<CanFrame>(),
            Err(ParseFrameError::InvalidData(_))
        ));
        assert_eq!(
            "123#000102030405060708".parse::<CanFrame>(),
            Err(ParseFrameError::Construction(ConstructionError::TooMuchData))
        );
    }
}
