//! Route handling and the enabled toggle.

use tracing::{debug, info};

use crate::app::Backdrop;
use crate::host::Location;

impl Backdrop {
    /// Rebinds the header effect when the route actually changed.
    pub fn navigate(&self, location: &Location) {
        if self.is_shut_down() {
            return;
        }
        {
            let mut last = self.inner.last_pathname.borrow_mut();
            if last.as_deref() == Some(location.pathname.as_str()) {
                debug!(pathname = %location.pathname, "same route, keeping header binding");
                return;
            }
            *last = Some(location.pathname.clone());
        }
        debug!(pathname = %location.pathname, "navigated");
        self.bind_header(location.clone());
    }

    /// Disposes the current page's waiters, listeners and inserted nodes.
    pub(crate) fn end_navigation(&self) {
        let scope = self.inner.navigation.borrow_mut().take();
        if let Some(scope) = scope {
            scope.destroy();
        }
        self.inner.status.borrow_mut().header_bound = false;
    }

    /// Reacts to the enabled flag changing.
    ///
    /// Both directions drop the current background first. Disabling also
    /// clears the header effect; enabling re-applies after a short settle
    /// delay so the host can finish re-rendering.
    pub fn on_toggle(&self) {
        if self.is_shut_down() {
            return;
        }
        let enabled = self.inner.toggle.is_enabled();
        info!(enabled, "backdrop toggled");

        self.inner.epoch.set(self.inner.epoch.get() + 1);
        let previous = self.inner.settle_task.borrow_mut().take();
        if let Some(task) = previous {
            task.abort();
        }
        self.release_background();

        if !enabled {
            self.end_navigation();
            self.reset_header();
            return;
        }

        let this = self.clone();
        let delay = self.inner.config.toggle_settle();
        let task = tokio::task::spawn_local(async move {
            tokio::time::sleep(delay).await;
            if this.is_shut_down() || !this.inner.toggle.is_enabled() {
                return;
            }
            this.apply();
            let pathname = this.inner.last_pathname.borrow().clone();
            if let Some(pathname) = pathname {
                this.bind_header(Location { pathname });
            }
        });
        *self.inner.settle_task.borrow_mut() = Some(task);
    }
}
