//! Scroll-reactive now-playing backdrop.
//!
//! Shows the current song's cover art as a blurred full-window background and
//! fades the artist/playlist header as the page scrolls. The host application
//! is reached only through the traits in [`host`]; [`host::memory`] provides a
//! headless implementation.

pub mod app;
pub mod handlers;
pub mod host;
pub mod interpolate;
pub mod notifications;
pub mod scope;
pub mod services;
pub mod state;
pub mod waiter;

pub use app::{Backdrop, Collaborators};
pub use handlers::HeaderNodes;
pub use host::{CoverFrame, CoverLookup, HostEvent, Location, NodeId};
pub use interpolate::{InterpolationChannel, ScrollConfig, StyleValue, Unit};
pub use notifications::{LogNotifications, NotificationSink, Severity};
pub use scope::{Disposable, Scope};
pub use services::ArtistImages;
pub use state::{BackdropConfig, BackdropError, BackdropResult, BackdropStatus, Phase, Settings, Toggle};
pub use waiter::{WaitHandle, WaitState, Waiter};
