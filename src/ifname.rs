//! Interface name to index resolution.
//!
//! Binding a CAN socket needs the kernel's interface index, which is looked
//! up with the `SIOCGIFINDEX` ioctl on an already open socket.

use std::{fmt, io};
use std::os::fd::RawFd;

use crate::constants::IFNAMSIZ;
use crate::errors::ResolveError;

mod sys {
    use crate::constants::IFNAMSIZ;

    /// `struct ifreq` as used by `SIOCGIFINDEX`: the name goes in, the index
    /// comes back in the first member of the `ifr_ifru` union.
    #[repr(C)]
    pub struct IfreqIndex {
        pub ifr_name: [u8; IFNAMSIZ],
        pub ifr_ifindex: libc::c_int,
        // rest of the union, largest member is `struct ifmap`
        pub _pad: [u8; 20],
    }

    nix::ioctl_readwrite_bad!(siocgifindex, libc::SIOCGIFINDEX, IfreqIndex);
}

/// A network interface name that fits into `ifr_name`.
///
/// The kernel copies at most 16 bytes, terminating NUL included, so longer
/// names are rejected up front instead of being truncated into the name of
/// some other interface.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct IfName(String);

impl IfName {
    pub fn new(name: &str) -> Result<IfName, ResolveError> {
        if name.is_empty() || name.bytes().any(|b| b == 0) {
            return Err(ResolveError::InvalidName);
        }

        if name.len() >= IFNAMSIZ {
            return Err(ResolveError::NameTooLong(name.len()));
        }

        Ok(IfName(name.to_owned()))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn to_ifr_name(&self) -> [u8; IFNAMSIZ] {
        let mut raw = [0u8; IFNAMSIZ];
        raw[..self.0.len()].copy_from_slice(self.0.as_bytes());
        raw
    }
}

impl fmt::Display for IfName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for IfName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Looks up the index of `name` with a single ioctl on `fd`.
///
/// OS failures are passed through unchanged inside `ResolveError::NotFound`.
pub fn if_index(fd: RawFd, name: &IfName) -> Result<libc::c_int, ResolveError> {
    let mut req = sys::IfreqIndex {
        ifr_name: name.to_ifr_name(),
        ifr_ifindex: 0,
        _pad: [0; 20],
    };

    unsafe { sys::siocgifindex(fd, &mut req) }
        .map_err(|errno| ResolveError::NotFound(io::Error::from(errno)))?;

    log::trace!("resolved {} to index {}", name, req.ifr_ifindex);
    Ok(req.ifr_ifindex)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_short_names() {
        let name = IfName::new("vcan0").unwrap();
        assert_eq!(name.as_str(), "vcan0");
        assert_eq!(&name.to_ifr_name()[..6], b"vcan0\0");
    }

    #[test]
    fn longest_name_leaves_room_for_nul() {
        assert!(IfName::new("abcdefghijklmno").is_ok());
        match IfName::new("abcdefghijklmnop") {
            Err(ResolveError::NameTooLong(16)) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn rejects_empty_and_nul() {
        assert!(matches!(IfName::new(""), Err(ResolveError::InvalidName)));
        assert!(matches!(IfName::new("can\00"), Err(ResolveError::InvalidName)));
    }

    #[test]
    fn ifreq_matches_kernel_size() {
        assert_eq!(std::mem::size_of::<sys::IfreqIndex>(), 40);
    }
}
