//! SocketCAN interfaces for raw frames and ISO-TP datagrams.
//!
//! The Linux kernel supports using CAN-devices through a network-like API
//! (see https://www.kernel.org/doc/Documentation/networking/can.txt). This
//! crate allows easy access to this functionality without having to wrestle
//! libc calls.
//!
//! # An introduction to CAN
//!
//! The CAN bus was originally designed to allow microcontrollers inside a
//! vehicle to communicate over a single shared bus. Messages called
//! *frames* are multicast to all devices on the bus.
//!
//! Every frame consists of an ID and a payload of up to 8 bytes. Longer
//! messages, such as diagnostic requests and responses, are carried by
//! ISO-TP (ISO 15765-2), which splits a datagram of up to 4095 bytes into a
//! sequence of frames and reassembles it on the other side.
//!
//! # Two transports
//!
//! A `RawInterface` sends and receives single `CanFrame`s and sees all
//! traffic on the bus. An `IsotpInterface` is bound to a receive/transmit
//! identifier pair and moves whole byte buffers; segmentation, flow control
//! and reassembly are done by the kernel's `can-isotp` module.
//!
//! Both own their socket. It is released by `close`, or when the value is
//! dropped. `Interface` wraps either one for code that only knows the
//! transport at runtime and rejects mismatched calls with
//! `InterfaceError::WrongMode`.
//!
//! ```no_run
//! use canif::{CanFrame, RawInterface};
//!
//! let bus = RawInterface::open("vcan0")?;
//! bus.send_frame(&CanFrame::new(0x123, &[0xDE, 0xAD])?)?;
//! let frame = bus.recv_frame()?;
//! println!("{:X}", frame);
//! bus.close()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # RawFd
//!
//! Raw access to the underlying file descriptor is available through the
//! `AsRawFd` and `AsFd` implementations.

pub extern crate libc;

mod byteorder;
mod constants;
mod errors;
mod frame;
mod ifname;
mod isotp;
mod socket;
mod util;


pub use crate::byteorder::Endianness;
pub use crate::constants::{CAN_MAX_DLEN, CAN_MTU, EFF_FLAG, EFF_MASK, ERR_FLAG, IFNAMSIZ,
                           ISOTP_MAX_DLEN, RTR_FLAG, SFF_MASK};
pub use crate::errors::{ConstructionError, InterfaceError, ParseFrameError, ResolveError,
                        Result, ShouldRetry};
pub use crate::frame::CanFrame;
pub use crate::ifname::{if_index, IfName};
pub use crate::isotp::{IsotpAddress, IsotpFlags, IsotpOptions, ISOTP_OPTIONS_SIZE};
pub use crate::socket::{CanInterface, Interface, IsotpInterface, Mode, RawInterface};
