/*!
Platform layer: the seam between the trackers and the native window system.

- `traits.rs` - `WindowSystem`, `ProcessEnvironment`, snapshot and timestamp types
- `x11.rs` - X11/EWMH backend (`x11` feature), property decoding in `x11/mapping.rs`
*/

mod traits;

#[cfg(feature = "x11")]
mod x11;

pub use traits::{ProcFs, ProcessEnvironment, ScreenSnapshot, TimestampSource, WindowSystem};

#[cfg(feature = "x11")]
pub use x11::X11WindowSystem;
