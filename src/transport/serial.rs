//! Serial port transport built on `tokio-serial`.
//!
//! # Example
//!
//! ```ignore
//! use x4lidar::transport::open_serial;
//!
//! let port = open_serial("/dev/ttyUSB0", 128_000)?;
//! ```

use tokio_serial::{DataBits, FlowControl, Parity, SerialPortBuilder, SerialPortBuilderExt, StopBits};

pub use tokio_serial::SerialStream;

use crate::error::Result;

/// Port settings used by X4-class devices, at the given baud rate.
pub fn serial_builder(path: &str, baud_rate: u32) -> SerialPortBuilder {
    tokio_serial::new(path, baud_rate)
        .data_bits(DataBits::Eight)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .flow_control(FlowControl::None)
}

/// Open the serial port at `path`.
pub fn open_serial(path: &str, baud_rate: u32) -> Result<SerialStream> {
    let stream = serial_builder(path, baud_rate).open_native_async()?;
    tracing::debug!("Opened {} at {} baud", path, baud_rate);
    Ok(stream)
}
