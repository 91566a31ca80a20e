//! Grid controller support for padctl.
//!
//! This crate provides:
//! - Pad protocols for the classic (red/green), colorful (RGB) and generic
//!   device generations
//! - A registry resolving configured device-type tags
//! - MIDI port management over midir
//! - The surface manager tying devices, layouts and actions together
//!
//! # Grid
//!
//! Every device is addressed through the same 9x9 grid. Row 0 is the top row
//! of function buttons and column 8 the right-hand side buttons.

pub mod midi;
pub mod ports;
pub mod registry;
pub mod surface;

pub use midi::{AddressKind, DeviceKind, GridEvent, PadMapping};
pub use ports::{ListenerHandle, PortManager};
pub use registry::device_for;
pub use surface::SurfaceManager;
