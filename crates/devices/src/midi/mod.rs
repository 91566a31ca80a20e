//! Grid pad protocols.
//!
//! Translates `(row, col, color)` into device wire messages and inbound
//! messages back into grid events, for each supported hardware generation.

pub mod classic;
pub mod colorful;
mod mapping;

pub use mapping::{AddressKind, DeviceKind, GridEvent, PadMapping};
