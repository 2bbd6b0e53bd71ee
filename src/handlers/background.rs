//! Background drawable lifecycle: apply, in-place update, replacement.

use std::rc::Rc;

use chrono::Utc;
use tracing::{debug, error, info, warn};

use crate::app::{BackgroundBinding, Backdrop};
use crate::host::{query_any, CoverFrame, Drawable, MountedNode, NodeId};
use crate::scope::Scope;
use crate::state::{BackdropError, BackdropResult, Phase};

impl Backdrop {
    /// Shows the current song's cover art.
    ///
    /// Does nothing when disabled, or when the drawable already shows this
    /// cover or is about to. Otherwise waits for the app root and then updates
    /// the existing drawable in place or builds the first one.
    pub fn apply(&self) {
        if self.is_shut_down() {
            return;
        }
        if !self.inner.toggle.is_enabled() {
            debug!("backdrop disabled, ignoring apply");
            return;
        }

        let lookup = self.inner.host.covers.cover_art_for_song();
        let Some(image) = lookup.image else {
            warn!(error = %BackdropError::MissingCoverArt, "cannot apply background");
            return;
        };

        let request = {
            let mut binding = self.inner.binding.borrow_mut();
            if binding.pending_cover.as_deref() == Some(image.as_str()) {
                debug!(cover = %image, "apply for this cover already in flight");
                return;
            }
            if binding.pending_cover.is_none()
                && binding.drawable.is_some()
                && binding.cover.as_deref() == Some(image.as_str())
            {
                debug!(cover = %image, "cover unchanged, nothing to apply");
                return;
            }
            // Supersedes any in-flight request, so its result is not recorded.
            binding.request += 1;
            binding.pending_cover = Some(image.clone());
            if binding.drawable.is_none() {
                binding.phase = Phase::Mounting;
            }
            binding.request
        };

        // A newer cover supersedes a wait that never found the root.
        let previous = self.inner.apply_scope.borrow_mut().take();
        if let Some(previous) = previous {
            previous.destroy();
        }
        let scope = self.inner.root.child("apply");
        *self.inner.apply_scope.borrow_mut() = Some(scope.clone());

        let frame = CoverFrame {
            image,
            placeholder_hue_shift: lookup.hue_shift,
        };
        let epoch = self.inner.epoch.get();
        let query = self.clone();
        let this = self.clone();
        scope.give(self.inner.waiter.when(
            "app root",
            move || query_any(query.view(), &query.inner.config.selectors.app_root, None),
            move |root| {
                tokio::task::spawn_local(async move {
                    this.mount(root, frame, request, epoch).await;
                });
            },
        ));
    }

    /// Applies once the host reports a song with cover art.
    pub fn apply_when_song_available(&self) {
        let covers = self.inner.host.covers.clone();
        let this = self.clone();
        self.inner.root.give(self.inner.waiter.when(
            "current song",
            move || covers.cover_art_for_song().image,
            move |_| this.apply(),
        ));
    }

    async fn mount(&self, root: NodeId, frame: CoverFrame, request: u64, epoch: u64) {
        if self.inner.epoch.get() != epoch {
            return;
        }
        let container = match self.ensure_container(root) {
            Ok(container) => container,
            Err(e) => {
                warn!(error = %e, "could not mount background container");
                self.abandon(request);
                return;
            }
        };

        let existing = self.inner.binding.borrow().drawable.clone();
        let drawable = match existing {
            Some(drawable) => drawable,
            None => match self.build() {
                Ok(drawable) => drawable,
                Err(e) => {
                    warn!(error = %e, "could not build background drawable, retrying once");
                    self.replace(None, container, frame, request, epoch).await;
                    return;
                }
            },
        };

        let result = drawable.update(frame.clone()).await;
        if self.inner.epoch.get() != epoch {
            debug!("background torn down while applying");
            return;
        }

        match result {
            Ok(()) => {
                if let Err(e) = self.attach_canvas(container, &drawable) {
                    warn!(error = %e, "could not mount background canvas");
                }
                self.settle(&frame.image, request);
            }
            Err(e) if self.is_latest(request) => {
                warn!(error = %e, cover = %frame.image, "background apply failed, replacing drawable");
                self.replace(Some(drawable), container, frame, request, epoch).await;
            }
            Err(e) => {
                debug!(error = %e, cover = %frame.image, "superseded apply failed, leaving drawable to the newer one");
            }
        }
    }

    /// Builds a drawable and records it as the single instance. Its canvas is
    /// mounted after the first successful update.
    fn build(&self) -> BackdropResult<Rc<dyn Drawable>> {
        let scope = self.drawable_scope();
        let drawable = self.inner.host.drawables.create(&self.inner.config.drawable, &scope)?;
        for class in &self.inner.config.classes.background_layer {
            self.view().add_class(drawable.canvas(), class);
        }
        let mut binding = self.inner.binding.borrow_mut();
        binding.drawable = Some(drawable.clone());
        binding.canvas_mounted = false;
        Ok(drawable)
    }

    fn attach_canvas(&self, container: NodeId, drawable: &Rc<dyn Drawable>) -> BackdropResult<()> {
        if !self.is_current(drawable) || self.inner.binding.borrow().canvas_mounted {
            return Ok(());
        }
        self.view().append_child(container, drawable.canvas())?;
        self.inner.binding.borrow_mut().canvas_mounted = true;
        info!(canvas = %drawable.canvas(), "background drawable mounted");
        Ok(())
    }

    fn is_current(&self, drawable: &Rc<dyn Drawable>) -> bool {
        self.inner
            .binding
            .borrow()
            .drawable
            .as_ref()
            .is_some_and(|current| Rc::ptr_eq(current, drawable))
    }

    fn is_latest(&self, request: u64) -> bool {
        self.inner.binding.borrow().request == request
    }

    /// Swaps the failed drawable for a fresh one inside a fresh scope. If
    /// that fails as well the feature carries on without a background.
    ///
    /// `failed` is the instance that failed, or `None` when none could be
    /// built. Nothing happens when the binding has already moved past it.
    async fn replace(
        &self,
        failed: Option<Rc<dyn Drawable>>,
        container: NodeId,
        frame: CoverFrame,
        request: u64,
        epoch: u64,
    ) {
        {
            let mut binding = self.inner.binding.borrow_mut();
            let still_current = match (&failed, &binding.drawable) {
                (Some(failed), Some(current)) => Rc::ptr_eq(failed, current),
                (None, None) => true,
                _ => false,
            };
            if !still_current {
                debug!(cover = %frame.image, "failed drawable already replaced");
                return;
            }
            binding.phase = Phase::Replacing;
        }
        self.inner.status.borrow_mut().replacements += 1;
        self.discard_drawable();

        let drawable = match self.build() {
            Ok(drawable) => drawable,
            Err(e) => {
                error!(error = %e, "replacement drawable failed, continuing without background");
                self.degrade(request);
                return;
            }
        };

        let result = drawable.update(frame.clone()).await;
        if self.inner.epoch.get() != epoch {
            return;
        }
        match result {
            Ok(()) => {
                if let Err(e) = self.attach_canvas(container, &drawable) {
                    warn!(error = %e, "could not mount background canvas");
                }
                info!(cover = %frame.image, "background drawable replaced");
                self.settle(&frame.image, request);
            }
            Err(e) => {
                error!(error = %e, "replacement drawable failed, continuing without background");
                if self.is_current(&drawable) {
                    self.discard_drawable();
                    self.degrade(request);
                }
            }
        }
    }

    fn degrade(&self, request: u64) {
        let mut binding = self.inner.binding.borrow_mut();
        binding.phase = Phase::Idle;
        binding.cover = None;
        if binding.request == request {
            binding.pending_cover = None;
        }
    }

    fn settle(&self, image: &str, request: u64) {
        {
            let mut binding = self.inner.binding.borrow_mut();
            binding.phase = Phase::Active;
            if binding.request != request {
                debug!(cover = %image, "newer apply pending, not recording stale cover");
                return;
            }
            binding.cover = Some(image.to_string());
            binding.pending_cover = None;
        }
        self.inner.status.borrow_mut().last_applied_at = Some(Utc::now());
        debug!(cover = %image, "background applied");
    }

    fn abandon(&self, request: u64) {
        let mut binding = self.inner.binding.borrow_mut();
        if binding.request == request {
            binding.pending_cover = None;
            if binding.drawable.is_none() {
                binding.phase = Phase::Idle;
            }
        }
    }

    fn ensure_container(&self, root: NodeId) -> BackdropResult<NodeId> {
        if let Some(container) = self.inner.binding.borrow().container {
            return Ok(container);
        }

        let view = self.view();
        let container = view.create_element("div");
        for class in &self.inner.config.classes.background_container {
            view.add_class(container, class);
        }
        view.append_child(root, container)?;

        let surface = self.inner.root.child("surface");
        surface.give(MountedNode {
            view: self.inner.host.view.clone(),
            node: container,
        });
        *self.inner.surface.borrow_mut() = Some(surface);
        self.inner.binding.borrow_mut().container = Some(container);
        Ok(container)
    }

    fn drawable_scope(&self) -> Scope {
        let mut slot = self.inner.drawable_scope.borrow_mut();
        match slot.as_ref() {
            Some(scope) if !scope.is_destroyed() => scope.clone(),
            _ => {
                let scope = self.inner.root.child("drawable");
                *slot = Some(scope.clone());
                scope
            }
        }
    }

    /// Destroys the drawable and everything its scope owns.
    pub(crate) fn discard_drawable(&self) {
        let drawable = {
            let mut binding = self.inner.binding.borrow_mut();
            binding.canvas_mounted = false;
            binding.drawable.take()
        };
        if let Some(drawable) = drawable {
            if let Err(e) = drawable.destroy() {
                warn!(error = %e, "failed to destroy background drawable");
            }
        }
        let scope = self.inner.drawable_scope.borrow_mut().take();
        if let Some(scope) = scope {
            scope.destroy();
        }
    }

    /// Drops every background resource: pending waits, the drawable, its
    /// container. Leaves the per-page header bindings alone.
    pub(crate) fn release_background(&self) {
        let apply = self.inner.apply_scope.borrow_mut().take();
        if let Some(scope) = apply {
            scope.destroy();
        }
        self.discard_drawable();
        let surface = self.inner.surface.borrow_mut().take();
        if let Some(scope) = surface {
            scope.destroy();
        }

        let mut binding = self.inner.binding.borrow_mut();
        *binding = BackgroundBinding {
            request: binding.request,
            ..BackgroundBinding::default()
        };
    }
}
