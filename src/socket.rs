use std::{fmt, io, mem, time::Duration};
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, FromRawFd, IntoRawFd, OwnedFd, RawFd};

use crate::constants::*;
use crate::errors::{InterfaceError, Result};
use crate::frame::CanFrame;
use crate::ifname::{if_index, IfName};
use crate::isotp::{IsotpAddress, IsotpOptions};
use crate::util::{flag_value, read_fd, set_socket_option, timeval_from_duration, write_fd};

/// Transport an interface was opened for.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Single CAN frames, `CAN_RAW`.
    Raw,
    /// ISO 15765-2 datagrams, `CAN_ISOTP`.
    Isotp,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Mode::Raw => write!(f, "raw"),
            Mode::Isotp => write!(f, "isotp"),
        }
    }
}

/// `struct sockaddr_can` with the `tp` member of the address union.
#[repr(C)]
struct CanAddr {
    can_family: libc::sa_family_t,
    can_ifindex: libc::c_int,
    rx_id: u32,
    tx_id: u32,
    // rest of the union, `j1939` is the largest member
    _pad: [u8; 8],
}

fn open_socket(kind: libc::c_int, protocol: libc::c_int) -> io::Result<OwnedFd> {
    let fd = unsafe { libc::socket(AF_CAN, kind | libc::SOCK_CLOEXEC, protocol) };

    if fd == -1 {
        return Err(io::Error::last_os_error());
    }

    Ok(unsafe { OwnedFd::from_raw_fd(fd) })
}

fn bind_socket(fd: RawFd, if_index: libc::c_int, rx_id: u32, tx_id: u32) -> io::Result<()> {
    let addr = CanAddr {
        can_family: AF_CAN as libc::sa_family_t,
        can_ifindex: if_index,
        rx_id,
        tx_id,
        _pad: [0; 8],
    };

    let rv = unsafe {
        libc::bind(fd,
                   &addr as *const CanAddr as *const libc::sockaddr,
                   mem::size_of::<CanAddr>() as libc::socklen_t)
    };

    if rv == -1 {
        return Err(io::Error::last_os_error());
    }

    Ok(())
}

/// A bound CAN socket and the interface it belongs to.
///
/// The descriptor is released when this is dropped, or explicitly through
/// `close`.
#[derive(Debug)]
struct Socket {
    fd: OwnedFd,
    ifname: IfName,
    if_index: libc::c_int,
}

impl Socket {
    fn open(ifname: &str,
            kind: libc::c_int,
            protocol: libc::c_int,
            rx_id: u32,
            tx_id: u32,
            options: Option<&IsotpOptions>) -> Result<Socket> {
        // checked before any syscall, a truncated name could match another
        // interface
        let ifname = IfName::new(ifname)?;

        let fd = open_socket(kind, protocol).map_err(|e| {
            log::warn!("could not create CAN socket for {}: {}", ifname, e);
            InterfaceError::Open(e)
        })?;

        let if_index = if_index(fd.as_raw_fd(), &ifname)?;

        // the kernel only takes CAN_ISOTP_OPTS before the socket is bound
        if let Some(options) = options {
            options.apply(fd.as_raw_fd()).map_err(|e| {
                log::warn!("could not set isotp options on {}: {}", ifname, e);
                InterfaceError::Io(e)
            })?;
        }

        bind_socket(fd.as_raw_fd(), if_index, rx_id, tx_id).map_err(|e| {
            log::warn!("could not bind to {} (index {}): {}", ifname, if_index, e);
            InterfaceError::Bind(e)
        })?;

        Ok(Socket { fd, ifname, if_index })
    }

    fn raw(&self) -> RawFd {
        self.fd.as_raw_fd()
    }

    fn set_timeout(&self, name: libc::c_int, timeout: Duration) -> Result<()> {
        set_socket_option(self.raw(), libc::SOL_SOCKET, name, &timeval_from_duration(timeout))
            .map_err(InterfaceError::Io)
    }

    fn close(self) -> Result<()> {
        let fd = self.fd.into_raw_fd();

        if unsafe { libc::close(fd) } == -1 {
            return Err(InterfaceError::Io(io::Error::last_os_error()));
        }

        log::debug!("closed socket on {}", self.ifname);
        Ok(())
    }
}

/// Lifecycle shared by both transports.
pub trait CanInterface: AsRawFd {
    /// Transport this interface was opened for.
    fn mode(&self) -> Mode;

    /// Name the socket is bound to.
    fn ifname(&self) -> &IfName;

    /// Kernel index of the interface at the last (re)bind.
    fn if_index(&self) -> libc::c_int;

    /// Bound the time a receive may block. `Duration::ZERO` blocks forever.
    ///
    /// An expired receive fails with `InterfaceError::Timeout`.
    fn set_recv_timeout(&self, timeout: Duration) -> Result<()>;

    /// Bound the time a send may block. `Duration::ZERO` blocks forever.
    fn set_send_timeout(&self, timeout: Duration) -> Result<()>;
}

macro_rules! impl_can_interface {
    ($ty:ty, $mode:expr) => {
        impl CanInterface for $ty {
            fn mode(&self) -> Mode {
                $mode
            }

            fn ifname(&self) -> &IfName {
                &self.sock.ifname
            }

            fn if_index(&self) -> libc::c_int {
                self.sock.if_index
            }

            fn set_recv_timeout(&self, timeout: Duration) -> Result<()> {
                log::debug!("{}: receive timeout {:?}", self.sock.ifname, timeout);
                self.sock.set_timeout(libc::SO_RCVTIMEO, timeout)
            }

            fn set_send_timeout(&self, timeout: Duration) -> Result<()> {
                log::debug!("{}: send timeout {:?}", self.sock.ifname, timeout);
                self.sock.set_timeout(libc::SO_SNDTIMEO, timeout)
            }
        }

        impl AsRawFd for $ty {
            fn as_raw_fd(&self) -> RawFd {
                self.sock.raw()
            }
        }

        impl AsFd for $ty {
            fn as_fd(&self) -> BorrowedFd<'_> {
                self.sock.fd.as_fd()
            }
        }
    };
}

/// A `CAN_RAW` socket bound to one interface, receiving every frame on the
/// bus.
///
/// All operations take `&self`; reading and writing from separate threads
/// is fine.
#[derive(Debug)]
pub struct RawInterface {
    sock: Socket,
}

impl RawInterface {
    /// Open a named CAN device.
    ///
    /// Usually the more common case, opens a socket can device by name, such
    /// as "vcan0" or "socan0".
    pub fn open(ifname: &str) -> Result<RawInterface> {
        let sock = Socket::open(ifname, libc::SOCK_RAW, CAN_RAW, 0, 0, None)?;
        log::debug!("opened raw socket on {} (index {})", sock.ifname, sock.if_index);
        Ok(RawInterface { sock })
    }

    /// Write a single can frame.
    pub fn send_frame(&self, frame: &CanFrame) -> Result<()> {
        let wire = frame.encode();
        let sent = write_fd(self.sock.raw(), &wire).map_err(InterfaceError::from_transfer)?;

        if sent != CAN_MTU {
            return Err(InterfaceError::Io(io::Error::new(
                io::ErrorKind::WriteZero,
                format!("short write of CAN frame ({} of {} bytes)", sent, CAN_MTU),
            )));
        }

        log::trace!("{}: sent {:X}", self.sock.ifname, frame);
        Ok(())
    }

    /// Blocking read a single can frame.
    pub fn recv_frame(&self) -> Result<CanFrame> {
        let mut wire = [0u8; CAN_MTU];
        let received = read_fd(self.sock.raw(), &mut wire).map_err(InterfaceError::from_transfer)?;

        if received != CAN_MTU {
            return Err(InterfaceError::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("short read of CAN frame ({} of {} bytes)", received, CAN_MTU),
            )));
        }

        let frame = CanFrame::decode(&wire);
        log::trace!("{}: received {:X}", self.sock.ifname, frame);
        Ok(frame)
    }

    /// Enable or disable receiving of own frames.
    ///
    /// When enabled, frames sent through this socket are delivered back to
    /// it, which allows testing without a second endpoint. Default is off.
    pub fn set_loopback(&self, enabled: bool) -> Result<()> {
        log::debug!("{}: receive own messages {}", self.sock.ifname, enabled);
        set_socket_option(self.sock.raw(), SOL_CAN_RAW, CAN_RAW_RECV_OWN_MSGS, &flag_value(enabled))
            .map_err(InterfaceError::Io)
    }

    /// Enable or disable local loopback.
    ///
    /// By default, loopback is enabled, causing other applications that open
    /// the same CAN bus to see frames emitted by different applications on
    /// the same system.
    pub fn set_local_loopback(&self, enabled: bool) -> Result<()> {
        log::debug!("{}: local loopback {}", self.sock.ifname, enabled);
        set_socket_option(self.sock.raw(), SOL_CAN_RAW, CAN_RAW_LOOPBACK, &flag_value(enabled))
            .map_err(InterfaceError::Io)
    }

    /// Release the socket, reporting any error from `close(2)`.
    pub fn close(self) -> Result<()> {
        self.sock.close()
    }
}

impl_can_interface!(RawInterface, Mode::Raw);

/// A `CAN_ISOTP` socket exchanging whole datagrams with one peer.
///
/// The kernel splits outgoing buffers into single/first/consecutive frames
/// and reassembles incoming ones, so callers only ever see complete
/// payloads of up to 4095 bytes.
#[derive(Debug)]
pub struct IsotpInterface {
    sock: Socket,
    address: IsotpAddress,
}

impl IsotpInterface {
    /// Open an ISO-TP socket on `ifname`, listening on `rx_id` and sending
    /// with `tx_id`.
    pub fn open(ifname: &str, rx_id: u32, tx_id: u32) -> Result<IsotpInterface> {
        IsotpInterface::open_inner(ifname, rx_id, tx_id, None)
    }

    /// Like `open`, with `options` installed before the socket is bound.
    ///
    /// This is the way to configure padding or extended addressing on
    /// Linux 5.16 and later, which reject option changes on a bound socket.
    pub fn open_with_options(ifname: &str,
                             rx_id: u32,
                             tx_id: u32,
                             options: &IsotpOptions) -> Result<IsotpInterface> {
        IsotpInterface::open_inner(ifname, rx_id, tx_id, Some(options))
    }

    fn open_inner(ifname: &str,
                  rx_id: u32,
                  tx_id: u32,
                  options: Option<&IsotpOptions>) -> Result<IsotpInterface> {
        let address = IsotpAddress::new(rx_id, tx_id);
        let sock = Socket::open(ifname,
                                libc::SOCK_DGRAM,
                                CAN_ISOTP,
                                address.rx_id(),
                                address.tx_id(),
                                options)?;
        log::debug!("opened isotp socket on {} (index {}), rx {:#x} tx {:#x}",
                    sock.ifname, sock.if_index, address.rx_id(), address.tx_id());
        Ok(IsotpInterface { sock, address })
    }

    /// The address pair of the last successful bind.
    #[inline]
    pub fn address(&self) -> IsotpAddress {
        self.address
    }

    /// Bind the existing socket to a new address pair.
    ///
    /// The interface index is looked up again, in case the interface was
    /// recreated since the socket was opened. Unlike the other operations
    /// this takes `&mut self`, since it replaces the recorded address.
    pub fn rebind(&mut self, rx_id: u32, tx_id: u32) -> Result<()> {
        let address = IsotpAddress::new(rx_id, tx_id);
        let if_index = if_index(self.sock.raw(), &self.sock.ifname)?;

        bind_socket(self.sock.raw(), if_index, address.rx_id(), address.tx_id()).map_err(|e| {
            log::warn!("could not rebind {}: {}", self.sock.ifname, e);
            InterfaceError::Bind(e)
        })?;

        log::debug!("rebound isotp socket on {}, rx {:#x} tx {:#x}",
                    self.sock.ifname, address.rx_id(), address.tx_id());
        self.sock.if_index = if_index;
        self.address = address;
        Ok(())
    }

    /// Send one datagram.
    pub fn send_buf(&self, data: &[u8]) -> Result<()> {
        let sent = write_fd(self.sock.raw(), data).map_err(InterfaceError::from_transfer)?;

        if sent != data.len() {
            return Err(InterfaceError::Io(io::Error::new(
                io::ErrorKind::WriteZero,
                format!("short write of datagram ({} of {} bytes)", sent, data.len()),
            )));
        }

        log::trace!("{}: sent {} bytes", self.sock.ifname, sent);
        Ok(())
    }

    /// Blocking read of one datagram, returning exactly the bytes received.
    pub fn recv_buf(&self) -> Result<Vec<u8>> {
        let mut data = vec![0u8; ISOTP_MAX_DLEN];
        let received = read_fd(self.sock.raw(), &mut data).map_err(InterfaceError::from_transfer)?;

        data.truncate(received);
        log::trace!("{}: received {} bytes", self.sock.ifname, received);
        Ok(data)
    }

    /// Replace the socket's ISO-TP option record.
    ///
    /// Only older kernels accept this after `open`. Linux 5.16 and later
    /// answer `EISCONN`, reported as `InterfaceError::Unsupported`; use
    /// `open_with_options` there.
    pub fn set_options(&self, options: &IsotpOptions) -> Result<()> {
        options.apply(self.sock.raw()).map_err(InterfaceError::from_isotp_option)
    }

    /// Pad transmitted CAN frames to 8 bytes with `fill`.
    ///
    /// Like every ISO-TP option call this resets the other options to their
    /// zero values; use `set_options` to combine settings. Subject to the
    /// same bound-socket restriction as `set_options`.
    pub fn set_tx_padding(&self, enabled: bool, fill: u8) -> Result<()> {
        self.set_options(&IsotpOptions::default().with_tx_padding(enabled, fill))
    }

    /// Expect received CAN frames padded with `fill`.
    pub fn set_rx_padding(&self, enabled: bool, fill: u8) -> Result<()> {
        self.set_options(&IsotpOptions::default().with_rx_padding(enabled, fill))
    }

    /// Switch between extended (`Some(address)`) and normal addressing.
    pub fn set_ext_address(&self, address: Option<u8>) -> Result<()> {
        self.set_options(&IsotpOptions::default().with_ext_address(address))
    }

    /// Release the socket, reporting any error from `close(2)`.
    pub fn close(self) -> Result<()> {
        self.sock.close()
    }
}

impl_can_interface!(IsotpInterface, Mode::Isotp);

/// Either kind of interface, checked at call time.
///
/// Prefer `RawInterface` and `IsotpInterface` where the transport is known
/// statically; this type is for code that picks the transport at runtime.
/// Calls meant for the other transport fail with
/// `InterfaceError::WrongMode` and leave the socket untouched.
#[derive(Debug)]
pub enum Interface {
    Raw(RawInterface),
    Isotp(IsotpInterface),
}

#[inline]
fn wrong_mode(expected: Mode, actual: Mode) -> InterfaceError {
    InterfaceError::WrongMode { expected, actual }
}

impl Interface {
    pub fn open_raw(ifname: &str) -> Result<Interface> {
        RawInterface::open(ifname).map(Interface::Raw)
    }

    pub fn open_isotp(ifname: &str, rx_id: u32, tx_id: u32) -> Result<Interface> {
        IsotpInterface::open(ifname, rx_id, tx_id).map(Interface::Isotp)
    }

    pub fn open_isotp_with_options(ifname: &str,
                                   rx_id: u32,
                                   tx_id: u32,
                                   options: &IsotpOptions) -> Result<Interface> {
        IsotpInterface::open_with_options(ifname, rx_id, tx_id, options).map(Interface::Isotp)
    }

    fn common(&self) -> &dyn CanInterface {
        match self {
            Interface::Raw(i) => i,
            Interface::Isotp(i) => i,
        }
    }

    pub fn mode(&self) -> Mode {
        self.common().mode()
    }

    pub fn ifname(&self) -> &IfName {
        self.common().ifname()
    }

    pub fn rebind(&mut self, rx_id: u32, tx_id: u32) -> Result<()> {
        match self {
            Interface::Isotp(i) => i.rebind(rx_id, tx_id),
            Interface::Raw(_) => Err(wrong_mode(Mode::Isotp, Mode::Raw)),
        }
    }

    pub fn send_frame(&self, frame: &CanFrame) -> Result<()> {
        match self {
            Interface::Raw(i) => i.send_frame(frame),
            Interface::Isotp(_) => Err(wrong_mode(Mode::Raw, Mode::Isotp)),
        }
    }

    pub fn recv_frame(&self) -> Result<CanFrame> {
        match self {
            Interface::Raw(i) => i.recv_frame(),
            Interface::Isotp(_) => Err(wrong_mode(Mode::Raw, Mode::Isotp)),
        }
    }

    pub fn send_buf(&self, data: &[u8]) -> Result<()> {
        match self {
            Interface::Isotp(i) => i.send_buf(data),
            Interface::Raw(_) => Err(wrong_mode(Mode::Isotp, Mode::Raw)),
        }
    }

    pub fn recv_buf(&self) -> Result<Vec<u8>> {
        match self {
            Interface::Isotp(i) => i.recv_buf(),
            Interface::Raw(_) => Err(wrong_mode(Mode::Isotp, Mode::Raw)),
        }
    }

    pub fn set_loopback(&self, enabled: bool) -> Result<()> {
        match self {
            Interface::Raw(i) => i.set_loopback(enabled),
            Interface::Isotp(_) => Err(wrong_mode(Mode::Raw, Mode::Isotp)),
        }
    }

    pub fn set_recv_timeout(&self, timeout: Duration) -> Result<()> {
        self.common().set_recv_timeout(timeout)
    }

    pub fn set_send_timeout(&self, timeout: Duration) -> Result<()> {
        self.common().set_send_timeout(timeout)
    }

    pub fn set_isotp_options(&self, options: &IsotpOptions) -> Result<()> {
        match self {
            Interface::Isotp(i) => i.set_options(options),
            Interface::Raw(_) => Err(InterfaceError::Unsupported("isotp options on a raw socket")),
        }
    }

    pub fn set_tx_padding(&self, enabled: bool, fill: u8) -> Result<()> {
        match self {
            Interface::Isotp(i) => i.set_tx_padding(enabled, fill),
            Interface::Raw(_) => Err(InterfaceError::Unsupported("tx padding on a raw socket")),
        }
    }

    pub fn close(self) -> Result<()> {
        match self {
            Interface::Raw(i) => i.close(),
            Interface::Isotp(i) => i.close(),
        }
    }
}

impl From<RawInterface> for Interface {
    fn from(i: RawInterface) -> Interface {
        Interface::Raw(i)
    }
}

impl From<IsotpInterface> for Interface {
    fn from(i: IsotpInterface) -> Interface {
        Interface::Isotp(i)
    }
}

impl AsRawFd for Interface {
    fn as_raw_fd(&self) -> RawFd {
        self.common().as_raw_fd()
    }
}

/// Wrap an arbitrary descriptor without opening or binding anything.
#[cfg(test)]
pub(crate) fn test_socket(fd: OwnedFd, name: &str) -> (RawInterface, IsotpInterface) {
    let dup = fd.try_clone().unwrap();
    let ifname = IfName::new(name).unwrap();
    let raw = RawInterface {
        sock: Socket { fd, ifname: ifname.clone(), if_index: 0 },
    };
    let isotp = IsotpInterface {
        sock: Socket { fd: dup, ifname, if_index: 0 },
        address: IsotpAddress::new(0x100, 0x200),
    };
    (raw, isotp)
}
