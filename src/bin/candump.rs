//! Print every frame received on a CAN interface.
//!
//! ```text
//! $ candump vcan0
//!  vcan0  123   [4]  DE AD BE EF
//! ```
//!
//! Runs until receiving fails, then exits with a non-zero status.

use std::time::Duration;

use anyhow::Context;
use canif::{CanFrame, CanInterface, RawInterface};
use clap::Parser;
use itertools::Itertools;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// CAN interface, e.g. vcan0
    interface: String,

    /// Fail when no frame arrives within this many milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,
}

fn frame_to_string(ifname: &str, frame: &CanFrame) -> String {
    let id = if frame.is_extended() {
        format!("{:08X}", frame.id())
    } else {
        format!("{:03X}", frame.id())
    };
    let data = frame.data().iter().map(|b| format!("{:02X}", b)).join(" ");

    format!(" {}  {}   [{}]  {}", ifname, id, frame.dlc(), data)
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let bus = RawInterface::open(&args.interface)
        .with_context(|| format!("could not open interface {}", args.interface))?;

    if let Some(ms) = args.timeout_ms {
        bus.set_recv_timeout(Duration::from_millis(ms))
            .context("could not set receive timeout")?;
    }

    loop {
        let frame = bus.recv_frame().context("error receiving frame")?;
        println!("{}", frame_to_string(bus.ifname().as_str(), &frame));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_frame_line() {
        let frame = CanFrame::new(0x23, &[0xDE, 0xAD, 0xBE, 0xEF]).unwrap();
        assert_eq!(frame_to_string("vcan0", &frame), " vcan0  023   [4]  DE AD BE EF");
    }

    #[test]
    fn extended_frame_line() {
        let frame = CanFrame::new(0x18DAF110, &[]).unwrap();
        assert_eq!(frame_to_string("can1", &frame), " can1  18DAF110   [0]  ");
    }

    #[test]
    fn stale_payload_is_not_printed() {
        let frame = CanFrame::from_raw_parts(0x100, 2, [1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(frame_to_string("vcan0", &frame), " vcan0  100   [2]  01 02");
    }
}
