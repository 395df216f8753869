//! ISO-TP addressing and the `CAN_ISOTP_OPTS` socket option.
//!
//! Segmentation, reassembly and flow control all happen in the kernel's
//! `can-isotp` module. All that is needed from userspace is a correctly
//! bound socket and, optionally, an option record.

use std::io;
use std::os::fd::RawFd;

use bitflags::bitflags;

use crate::byteorder::Endianness;
use crate::constants::{CAN_ISOTP_OPTS, EFF_FLAG, SFF_MASK, SOL_CAN_ISOTP};
use crate::util::set_socket_option_bytes;

bitflags! {
    /// `flags` member of `struct can_isotp_options`.
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
    pub struct IsotpFlags: u32 {
        /// listen only (do not send FC)
        const LISTEN_MODE = 0x001;
        /// enable extended addressing
        const EXTEND_ADDR = 0x002;
        /// enable CAN frame padding tx path
        const TX_PADDING = 0x004;
        /// enable CAN frame padding rx path
        const RX_PADDING = 0x008;
        /// check received CAN frame padding
        const CHK_PAD_LEN = 0x010;
        /// check received CAN frame padding
        const CHK_PAD_DATA = 0x020;
        /// half duplex error state handling
        const HALF_DUPLEX = 0x040;
        /// ignore stmin from received FC
        const FORCE_TXSTMIN = 0x080;
        /// ignore CFs depending on rx stmin
        const FORCE_RXSTMIN = 0x100;
        /// different rx extended addressing
        const RX_EXT_ADDR = 0x200;
    }
}

/// Size of `struct can_isotp_options`.
pub const ISOTP_OPTIONS_SIZE: usize = 12;

/// Contents of `struct can_isotp_options`.
///
/// ```text
/// struct can_isotp_options {
///     __u32 flags;
///     __u32 frame_txtime;   /* ns */
///     __u8  ext_address;
///     __u8  txpad_content;
///     __u8  rxpad_content;
///     __u8  rx_ext_address;
/// };
/// ```
///
/// The kernel has no partial update for this option, every call replaces
/// the whole record. Unset fields are zero.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct IsotpOptions {
    pub flags: IsotpFlags,
    pub frame_txtime: u32,
    pub ext_address: u8,
    pub txpad_content: u8,
    pub rxpad_content: u8,
    pub rx_ext_address: u8,
}

impl Default for IsotpOptions {
    fn default() -> Self {
        IsotpOptions {
            flags: IsotpFlags::empty(),
            frame_txtime: 0,
            ext_address: 0,
            txpad_content: 0,
            rxpad_content: 0,
            rx_ext_address: 0,
        }
    }
}

impl IsotpOptions {
    pub fn with_tx_padding(mut self, enabled: bool, fill: u8) -> Self {
        self.flags.set(IsotpFlags::TX_PADDING, enabled);
        self.txpad_content = fill;
        self
    }

    pub fn with_rx_padding(mut self, enabled: bool, fill: u8) -> Self {
        self.flags.set(IsotpFlags::RX_PADDING, enabled);
        self.rxpad_content = fill;
        self
    }

    /// Use extended addressing with the given address byte, or normal
    /// addressing for `None`.
    pub fn with_ext_address(mut self, address: Option<u8>) -> Self {
        self.flags.set(IsotpFlags::EXTEND_ADDR, address.is_some());
        self.ext_address = address.unwrap_or(0);
        self
    }

    /// Frame transmission time (N_As/N_Ar) in nanoseconds, 0 keeps the
    /// kernel default.
    pub fn with_frame_txtime(mut self, nanos: u32) -> Self {
        self.frame_txtime = nanos;
        self
    }

    /// Serialize in the exact layout of `struct can_isotp_options`, with
    /// the 32 bit members in `order`.
    pub fn encode(&self, order: Endianness) -> [u8; ISOTP_OPTIONS_SIZE] {
        let mut buf = [0u8; ISOTP_OPTIONS_SIZE];
        buf[0..4].copy_from_slice(&order.u32_bytes(self.flags.bits()));
        buf[4..8].copy_from_slice(&order.u32_bytes(self.frame_txtime));
        buf[8] = self.ext_address;
        buf[9] = self.txpad_content;
        buf[10] = self.rxpad_content;
        buf[11] = self.rx_ext_address;
        buf
    }

    /// Hand the record to the kernel via `setsockopt(SOL_CAN_ISOTP,
    /// CAN_ISOTP_OPTS)`.
    pub(crate) fn apply(&self, fd: RawFd) -> io::Result<()> {
        let record = self.encode(Endianness::native());
        log::debug!("setting isotp options {:?}", self);
        set_socket_option_bytes(fd, SOL_CAN_ISOTP, CAN_ISOTP_OPTS, &record)
    }
}

/// Receive/transmit identifier pair an ISO-TP socket is bound to.
///
/// Identifiers above the 11 bit range are flagged as extended before they
/// reach the kernel.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct IsotpAddress {
    rx_id: u32,
    tx_id: u32,
}

impl IsotpAddress {
    pub fn new(rx_id: u32, tx_id: u32) -> IsotpAddress {
        IsotpAddress {
            rx_id: flag_extended(rx_id),
            tx_id: flag_extended(tx_id),
        }
    }

    /// The identifier this socket listens on, flags included.
    #[inline]
    pub fn rx_id(&self) -> u32 {
        self.rx_id
    }

    /// The identifier this socket sends with, flags included.
    #[inline]
    pub fn tx_id(&self) -> u32 {
        self.tx_id
    }

    /// The same pair seen from the other end of the conversation.
    pub fn mirrored(&self) -> IsotpAddress {
        IsotpAddress {
            rx_id: self.tx_id,
            tx_id: self.rx_id,
        }
    }
}

#[inline]
fn flag_extended(id: u32) -> u32 {
    if id > SFF_MASK {
        id | EFF_FLAG
    } else {
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tx_padding_record() {
        let opts = IsotpOptions::default().with_tx_padding(true, 0xAA);
        let le = opts.encode(Endianness::Little);
        assert_eq!(le, [0x04, 0, 0, 0, 0, 0, 0, 0, 0, 0xAA, 0, 0]);

        let be = opts.encode(Endianness::Big);
        assert_eq!(be, [0, 0, 0, 0x04, 0, 0, 0, 0, 0, 0xAA, 0, 0]);
    }

    #[test]
    fn disabled_padding_keeps_fill_byte() {
        let opts = IsotpOptions::default().with_tx_padding(false, 0x55);
        assert!(opts.flags.is_empty());
        assert_eq!(opts.encode(Endianness::Little)[9], 0x55);
    }

    #[test]
    fn combined_record() {
        let opts = IsotpOptions::default()
            .with_tx_padding(true, 0xCC)
            .with_rx_padding(true, 0xDD)
            .with_ext_address(Some(0xF1))
            .with_frame_txtime(0x0102_0304);

        assert_eq!(
            opts.flags,
            IsotpFlags::TX_PADDING | IsotpFlags::RX_PADDING | IsotpFlags::EXTEND_ADDR
        );
        assert_eq!(
            opts.encode(Endianness::Little),
            [0x0E, 0, 0, 0, 0x04, 0x03, 0x02, 0x01, 0xF1, 0xCC, 0xDD, 0]
        );

        let normal = opts.with_ext_address(None);
        assert!(!normal.flags.contains(IsotpFlags::EXTEND_ADDR));
        assert_eq!(normal.ext_address, 0);
    }

    #[test]
    fn address_flags_extended_ids() {
        let addr = IsotpAddress::new(0x7FF, 0x800);
        assert_eq!(addr.rx_id(), 0x7FF);
        assert_eq!(addr.tx_id(), 0x800 | EFF_FLAG);

        let mirror = addr.mirrored();
        assert_eq!(mirror.rx_id(), 0x800 | EFF_FLAG);
        assert_eq!(mirror.tx_id(), 0x7FF);

        // already flagged ids pass through
        assert_eq!(IsotpAddress::new(0x18DA_F110 | EFF_FLAG, 0).rx_id(), 0x18DA_F110 | EFF_FLAG);
    }
}
