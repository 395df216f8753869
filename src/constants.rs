// Address family of the CAN protocol stack
pub const AF_CAN: libc::c_int = 29;

// Protocol of the PF_CAN Family: Standard?
pub const CAN_RAW: libc::c_int = 1;

// Protocol of the PF_CAN Family: ISO 15765-2 transport
pub const CAN_ISOTP: libc::c_int = 6;

pub const SOL_CAN_BASE: libc::c_int = 100;
pub const SOL_CAN_RAW: libc::c_int = SOL_CAN_BASE + CAN_RAW;
pub const CAN_RAW_LOOPBACK: libc::c_int = 3;
pub const CAN_RAW_RECV_OWN_MSGS: libc::c_int = 4;

pub const SOL_CAN_ISOTP: libc::c_int = SOL_CAN_BASE + CAN_ISOTP;
pub const CAN_ISOTP_OPTS: libc::c_int = 1;

/// Special address description flags for the CAN_ID
///
/// EFF/SFF is set in the MSB
pub const EFF_FLAG: u32 = 0x80000000;
/// remote transmission request
pub const RTR_FLAG: u32 = 0x40000000;
/// error message frame
pub const ERR_FLAG: u32 = 0x20000000;

/// valid bits in CAN ID for frame formats
/// standard frame format (SFF)
pub const SFF_MASK: u32 = 0x000007ff;
/// extended frame format (EFF)
pub const EFF_MASK: u32 = 0x1fffffff;

/// size of a classic `struct can_frame`
pub const CAN_MTU: usize = 16;
/// payload bytes of a classic CAN frame
pub const CAN_MAX_DLEN: usize = 8;

/// largest datagram a single ISO-TP transfer can carry
pub const ISOTP_MAX_DLEN: usize = 4095;

/// size of `ifr_name`, terminating NUL included
pub const IFNAMSIZ: usize = 16;
