//! Send a single frame to a CAN interface.
//!
//! ```text
//! $ cansend vcan0 123#DEADBEEF
//! $ cansend vcan0 18DAF110#0210
//! ```

use anyhow::Context;
use canif::{CanFrame, RawInterface};
use clap::Parser;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// CAN interface, e.g. vcan0
    interface: String,

    /// Frame as <hex id>#<hex data>, e.g. 123#DEADBEEF
    frame: String,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let frame: CanFrame = args
        .frame
        .parse()
        .with_context(|| format!("could not parse frame '{}'", args.frame))?;

    let bus = RawInterface::open(&args.interface)
        .with_context(|| format!("could not open interface {}", args.interface))?;

    bus.send_frame(&frame).context("error sending frame")?;
    log::debug!("sent {:X} on {}", frame, args.interface);

    bus.close().context("error closing interface")?;
    Ok(())
}
