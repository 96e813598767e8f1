//! binled — bin-locator LED control for a shift-register or GPIO LED array.
//!
//! Maps (category, store) bin addresses to LED indices, packs them into bus
//! frames, and drives them through a single shared bus with an auto-off timer.

pub mod bus;
pub mod config;
pub mod error;
pub mod grid;
pub mod mask;
pub mod service;
pub mod sweep;
pub mod timer;

pub use error::BinledError;
