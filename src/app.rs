//! The backdrop controller: owns scopes, the drawable and the event loop.

use std::cell::{Cell, RefCell};
use std::future::Future;
use std::rc::Rc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::host::{
    ArtistImageProvider, CoverArtProvider, Drawable, DrawableFactory, HostEvent, HostView, Location, NodeId,
};
use crate::notifications::NotificationSink;
use crate::scope::Scope;
use crate::state::{BackdropConfig, BackdropStatus, Phase, Toggle};
use crate::waiter::Waiter;

/// The host services the controller depends on.
#[derive(Clone)]
pub struct Collaborators {
    pub view: Rc<dyn HostView>,
    pub drawables: Rc<dyn DrawableFactory>,
    pub covers: Rc<dyn CoverArtProvider>,
    pub artists: Rc<dyn ArtistImageProvider>,
    pub notifications: Rc<dyn NotificationSink>,
}

/// The single background instance and what it currently shows.
#[derive(Default)]
pub(crate) struct BackgroundBinding {
    pub(crate) phase: Phase,
    pub(crate) cover: Option<String>,
    pub(crate) pending_cover: Option<String>,
    /// Sequence number of the most recent apply request.
    pub(crate) request: u64,
    pub(crate) drawable: Option<Rc<dyn Drawable>>,
    pub(crate) container: Option<NodeId>,
    /// Whether the current drawable's canvas sits in the container yet.
    pub(crate) canvas_mounted: bool,
}

pub(crate) struct Inner {
    pub(crate) config: BackdropConfig,
    pub(crate) host: Collaborators,
    pub(crate) toggle: Toggle,
    /// Unbounded waits for long-lived mount points.
    pub(crate) waiter: Waiter,
    /// Watchdog-bounded waits for per-page header elements.
    pub(crate) header_waiter: Waiter,
    /// Lives as long as the feature.
    pub(crate) root: Scope,
    /// Owns the wait for the app root issued by the latest apply.
    pub(crate) apply_scope: RefCell<Option<Scope>>,
    /// Owns the background container node.
    pub(crate) surface: RefCell<Option<Scope>>,
    /// Owns the drawable's internal resources; rebuilt on replacement.
    pub(crate) drawable_scope: RefCell<Option<Scope>>,
    /// Owns header waiters and scroll listeners for the current page.
    pub(crate) navigation: RefCell<Option<Scope>>,
    pub(crate) binding: RefCell<BackgroundBinding>,
    pub(crate) last_pathname: RefCell<Option<String>>,
    /// Delayed re-apply scheduled by enabling the toggle.
    pub(crate) settle_task: RefCell<Option<JoinHandle<()>>>,
    pub(crate) status: RefCell<BackdropStatus>,
    /// Bumped on every full teardown so in-flight applies can tell they are stale.
    pub(crate) epoch: Cell<u64>,
}

/// Scroll-reactive now-playing backdrop.
///
/// Cheap to clone; clones share state. Everything runs on one thread, and the
/// async entry points must be driven from inside a `tokio::task::LocalSet`.
#[derive(Clone)]
pub struct Backdrop {
    pub(crate) inner: Rc<Inner>,
}

impl Backdrop {
    pub fn new(config: BackdropConfig, host: Collaborators, toggle: Toggle) -> Self {
        let waiter = Waiter::new(config.poll_interval());
        let header_waiter = waiter.with_watchdog(config.watchdog());
        let status = BackdropStatus {
            enabled: toggle.is_enabled(),
            ..BackdropStatus::default()
        };

        Self {
            inner: Rc::new(Inner {
                config,
                host,
                toggle,
                waiter,
                header_waiter,
                root: Scope::new("backdrop"),
                apply_scope: RefCell::new(None),
                surface: RefCell::new(None),
                drawable_scope: RefCell::new(None),
                navigation: RefCell::new(None),
                binding: RefCell::new(BackgroundBinding::default()),
                last_pathname: RefCell::new(None),
                settle_task: RefCell::new(None),
                status: RefCell::new(status),
                epoch: Cell::new(0),
            }),
        }
    }

    pub fn config(&self) -> &BackdropConfig {
        &self.inner.config
    }

    pub fn toggle(&self) -> &Toggle {
        &self.inner.toggle
    }

    /// Diagnostic snapshot of the current state.
    pub fn status(&self) -> BackdropStatus {
        let binding = self.inner.binding.borrow();
        let mut status = self.inner.status.borrow().clone();
        status.phase = binding.phase;
        status.enabled = self.inner.toggle.is_enabled();
        status.cover = binding.cover.clone();
        status.pending_cover = binding.pending_cover.clone();
        status.drawable_active = binding.drawable.is_some();
        status.container_mounted = binding.container.is_some();
        status.pathname = self.inner.last_pathname.borrow().clone();
        status
    }

    /// Drives the controller from host events until the stream closes.
    ///
    /// Nothing is set up before `ready` resolves. The initial location is
    /// bound right after, and the background is applied as soon as the
    /// current song has cover art.
    pub async fn run<R>(self, ready: R, initial: Location, mut events: mpsc::UnboundedReceiver<HostEvent>)
    where
        R: Future<Output = ()>,
    {
        ready.await;
        info!("host ready, starting backdrop");

        self.navigate(&initial);
        self.apply_when_song_available();

        while let Some(event) = events.recv().await {
            match event {
                HostEvent::SongChanged => self.apply(),
                HostEvent::Toggled => self.on_toggle(),
                HostEvent::Navigated(location) => self.navigate(&location),
            }
        }

        debug!("host event stream closed");
        self.shutdown();
    }

    /// Tears the whole feature down: every scope, the drawable, the artist
    /// cache and the recorded state.
    pub fn shutdown(&self) {
        info!("shutting down backdrop");
        self.inner.epoch.set(self.inner.epoch.get() + 1);
        let settle = self.inner.settle_task.borrow_mut().take();
        if let Some(task) = settle {
            task.abort();
        }
        self.inner.root.destroy();

        self.release_background();
        self.inner.navigation.borrow_mut().take();
        self.inner.last_pathname.borrow_mut().take();
        self.inner.host.artists.clear();
        *self.inner.status.borrow_mut() = BackdropStatus::default();
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.root.is_destroyed()
    }

    pub(crate) fn view(&self) -> &dyn HostView {
        self.inner.host.view.as_ref()
    }
}
