//! Data types shared across the droidbridge crates.
//!
//! These types describe what the adb transport reports about devices and what
//! the bootstrap protocol deploys onto them. They are:
//! - **Pure data**: no I/O, only parsing of the textual shapes adb emits
//! - **Serializable**: the CLI prints them as JSON
//!
//! Behavior (command execution, presence tracking, bootstrap) is built on top
//! of these types in `droidbridge-runtime` and `droidbridge`.

pub mod device;
pub mod forward;
pub mod service;

pub use device::*;
pub use forward::*;
pub use service::*;
