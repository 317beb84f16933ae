//! The UI surface context.
//!
//! * [`panel`]     — [`ControlPanel`], the optimistic control state machine.
//! * [`notice`]    — autoplay affordance and transient failure notices.
//! * [`render`]    — the [`PanelRenderer`] seam.
//! * [`highlight`] — sentence highlighting in the host document.
//! * [`context`]   — [`SurfaceContext`], wiring all of the above to the bus.

pub mod context;
pub mod highlight;
pub mod notice;
pub mod panel;
pub mod render;

pub use context::{SurfaceContext, UserInput};
pub use notice::{Notice, NoticeBoard};
pub use panel::{Applied, Control, ControlPanel, PanelState};
pub use render::{Glyph, LogRenderer, PanelRenderer};
