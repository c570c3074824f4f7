//! Adaptive encoder profiles driven by link quality
//!
//! This crate turns a base encoder profile into a ladder of progressively
//! degraded profiles and picks a rung for each Wi-Fi signal reading.
//!
//! # Components
//!
//! - [`profile`]: The resolution/bitrate/fps value type
//! - [`ladder`]: Ladder generation from a base profile and a step count
//! - [`policy`]: SNR to ladder index mapping and the [`ProfileSink`] seam
//! - [`config`]: Serde configuration for the base profile

pub mod config;
mod error;
pub mod ladder;
pub mod policy;
pub mod profile;

pub use config::ProfileConfig;
pub use error::ProfileError;
pub use ladder::ProfileLadder;
pub use policy::{ladder_index, PolicyEngine, ProfileSink, Selection, SignalReading};
pub use profile::Profile;
