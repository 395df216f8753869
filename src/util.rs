use std::{io, mem, time::Duration};
use std::os::fd::RawFd;

/// `setsockopt` wrapper
///
/// The libc `setsockopt` function is set to set various options on a socket.
/// `set_socket_option` offers a somewhat type-safe wrapper that does not
/// require messing around with `*const c_void`s.
///
/// A proper `std::io::Error` will be returned on failure.
///
/// Example use:
///
/// ```text
/// let fd = ...;  // some file descriptor, this will be stdout
/// set_socket_option(fd, SOL_TCP, TCP_NO_DELAY, 1 as c_int)
/// ```
///
/// Note that the `val` parameter must be specified correctly; if an option
/// expects an integer, it is advisable to pass in a `c_int`, not the default
/// of `i32`.
pub fn set_socket_option<T>(fd: RawFd,
                            level: libc::c_int,
                            name: libc::c_int,
                            val: &T) -> io::Result<()> {
    let r = unsafe {
        let val_ptr: *const T = val as *const T;
        libc::setsockopt(fd,
                         level,
                         name,
                         val_ptr as *const libc::c_void,
                         mem::size_of::<T>() as libc::socklen_t)
    };

    if r != 0 {
        return Err(io::Error::last_os_error());
    }

    Ok(())
}

/// Like `set_socket_option`, for option values that are already serialized.
pub fn set_socket_option_bytes(fd: RawFd,
                               level: libc::c_int,
                               name: libc::c_int,
                               bytes: &[u8]) -> io::Result<()> {
    let r = unsafe {
        libc::setsockopt(fd,
                         level,
                         name,
                         bytes.as_ptr() as *const libc::c_void,
                         bytes.len() as libc::socklen_t)
    };

    if r != 0 {
        return Err(io::Error::last_os_error());
    }

    Ok(())
}

#[inline]
pub fn flag_value(enabled: bool) -> libc::c_int {
    if enabled { 1 } else { 0 }
}

/// Converts a timeout into the `timeval` expected by `SO_RCVTIMEO` and
/// `SO_SNDTIMEO`.
///
/// A zero duration stays zero, which the kernel treats as "no timeout".
/// Anything shorter than a microsecond is rounded up so that it still
/// expires, and seconds beyond `time_t` saturate instead of wrapping
/// negative.
pub fn timeval_from_duration(t: Duration) -> libc::timeval {
    if !t.is_zero() && t < Duration::from_micros(1) {
        return timeval_from_duration(Duration::from_micros(1));
    }

    libc::timeval {
        tv_sec: libc::time_t::try_from(t.as_secs()).unwrap_or(libc::time_t::MAX),
        tv_usec: t.subsec_micros() as libc::suseconds_t,
    }
}

/// `read(2)` into `buf`, returning the number of bytes received.
pub fn read_fd(fd: RawFd, buf: &mut [u8]) -> io::Result<usize> {
    let rv = unsafe { libc::read(fd, buf.as_mut_ptr() as *mut libc::c_void, buf.len()) };

    if rv < 0 {
        return Err(io::Error::last_os_error());
    }

    Ok(rv as usize)
}

/// `write(2)` from `buf`, returning the number of bytes sent.
pub fn write_fd(fd: RawFd, buf: &[u8]) -> io::Result<usize> {
    let rv = unsafe { libc::write(fd, buf.as_ptr() as *const libc::c_void, buf.len()) };

    if rv < 0 {
        return Err(io::Error::last_os_error());
    }

    Ok(rv as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeval_splits_seconds_and_micros() {
        let tv = timeval_from_duration(Duration::from_millis(1_050));
        assert_eq!(tv.tv_sec, 1);
        assert_eq!(tv.tv_usec, 50_000);
    }

    #[test]
    fn timeval_zero_means_forever() {
        let tv = timeval_from_duration(Duration::ZERO);
        assert_eq!((tv.tv_sec, tv.tv_usec), (0, 0));
    }

    #[test]
    fn timeval_rounds_up_sub_micro() {
        let tv = timeval_from_duration(Duration::from_nanos(10));
        assert_eq!((tv.tv_sec, tv.tv_usec), (0, 1));
    }

    #[test]
    fn timeval_saturates_huge_durations() {
        let tv = timeval_from_duration(Duration::MAX);
        assert_eq!(tv.tv_sec, libc::time_t::MAX);
        assert_eq!(tv.tv_usec, 999_999);

        let tv = timeval_from_duration(Duration::from_secs(u64::MAX / 2 + 1));
        assert!(tv.tv_sec > 0);
    }
}
