//! Native device backends.
//!
//! A backend enumerates devices and reads their raw control values. It is
//! opened on the hook thread and never leaves it, so thread-affine APIs such
//! as SDL2 can be used directly.
//!
//! # Feature flags
//! - **`sdl2-backend`** (default): [`Sdl2Backend`] on top of the SDL2
//!   joystick API.

use std::sync::Arc;

use crate::error::BackendError;
use crate::types::{NativeDevice, NativeId, RawState};

#[cfg(feature = "sdl2-backend")]
mod sdl;

#[cfg(test)]
pub(crate) mod scripted;

#[cfg(feature = "sdl2-backend")]
pub use sdl::Sdl2Backend;

pub trait Backend {
    /// Lists the devices present right now.
    fn enumerate(&mut self) -> Result<Vec<NativeDevice>, BackendError>;

    /// Reads the raw control values of one device.
    fn read_state(&mut self, id: NativeId) -> Result<RawState, BackendError>;

    /// Called once per tick before any device is read.
    fn refresh(&mut self) {}
}

/// Opens a backend. Called on the hook thread each time the hook starts.
pub type BackendFactory =
    Arc<dyn Fn() -> Result<Box<dyn Backend>, BackendError> + Send + Sync>;
