//! Event handlers of the [`Backdrop`](crate::Backdrop) controller, split by concern.

pub mod background;
pub mod header;
pub mod navigation;

pub use header::HeaderNodes;
