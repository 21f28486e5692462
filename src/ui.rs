//! Terminal UI of keel.
//!
//! [render] draws a frame from the application state; [panes] holds the listing pane and the
//! width helpers it needs.

pub mod panes;
pub mod render;

pub use render::render;
