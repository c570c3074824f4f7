//! Link telemetry for the encoder adapter
//!
//! Provides the signal readings that drive profile selection and simple
//! reachability checks run at startup.

pub mod check;
mod error;
pub mod source;

pub use check::{CheckReport, ConnectionChecker};
pub use error::TelemetryError;
pub use source::{
    parse_interface_report, rssi_to_quality, RciSignalSource, SignalSource, WifiStatus,
    DEFAULT_INTERFACE,
};
