//! Transport module - serial link to the device.
//!
//! Any `AsyncRead + AsyncWrite` byte stream can carry the protocol; this
//! module opens the usual one, a serial port at 128000 baud, 8N1, no flow
//! control.

mod serial;

pub use serial::{open_serial, serial_builder, SerialStream};
