//! `alarmsim` - A load generator that simulates a fleet of IoT alarm devices
//!
//! This library builds a fleet of devices placed randomly inside a bounding
//! box and periodically posts one device's alarm event, as a single-element
//! JSON array, to an event ingestion endpoint.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod cli;
pub mod config;
pub mod device;
pub mod error;
pub mod event;
pub mod geo;
pub mod logging;
pub mod simulator;
pub mod sink;

pub use config::Config;
pub use device::{Device, Fleet, ImageCatalog};
pub use error::{Error, Result};
pub use event::{AlarmData, AlarmEvent};
pub use geo::{BoundingBox, Coordinates};
pub use logging::init_logging;
pub use simulator::{seeded_rng, RunSummary, Simulator, StopReason};
pub use sink::{EventSink, HttpSink, JsonLinesSink};
