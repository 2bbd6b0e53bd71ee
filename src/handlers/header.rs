//! Per-page header effect: element discovery, scroll-driven styles, artist picture.

use std::rc::Rc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::app::Backdrop;
use crate::host::{query_any, HostView, Location, MountedNode, NodeId, ScrollListener};
use crate::interpolate;
use crate::notifications::Severity;
use crate::scope::Scope;
use crate::services::artist_id_from_path;
use crate::state::BackdropResult;

/// The header elements a page binding drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderNodes {
    /// Element whose scroll offset drives the effect.
    pub scroll: NodeId,
    /// Header background image; receives the interpolated styles.
    pub background: NodeId,
    /// Header content; receives the scrolled-past class.
    pub header: NodeId,
}

/// State shared by every step of one page's discovery chain.
#[derive(Clone)]
struct Discovery {
    scope: Scope,
    location: Location,
    abort: CancellationToken,
}

impl Backdrop {
    /// Starts a fresh header binding for `location`, disposing the previous
    /// page's waiters and listeners first.
    pub(crate) fn bind_header(&self, location: Location) {
        self.end_navigation();
        if !self.inner.toggle.is_enabled() {
            debug!(pathname = %location.pathname, "backdrop disabled, header left untouched");
            return;
        }

        let scope = self.inner.root.child("navigation");
        *self.inner.navigation.borrow_mut() = Some(scope.clone());
        let abort = scope.give(CancellationToken::new());

        debug!(pathname = %location.pathname, "discovering header elements");
        self.discover_scroll_container(Discovery { scope, location, abort });
    }

    fn discover_scroll_container(&self, d: Discovery) {
        let query = self.clone();
        let this = self.clone();
        let scope = d.scope.clone();
        scope.give(self.inner.header_waiter.when(
            "scroll container",
            move || query_any(query.view(), &query.inner.config.selectors.scroll_container, None),
            move |scroll| this.discover_wrapper(d, scroll),
        ));
    }

    fn discover_wrapper(&self, d: Discovery, scroll: NodeId) {
        let query = self.clone();
        let this = self.clone();
        let scope = d.scope.clone();
        scope.give(self.inner.header_waiter.when(
            "secondary wrapper",
            move || query_any(query.view(), &query.inner.config.selectors.secondary_wrapper, None),
            move |wrapper| this.discover_background(d, scroll, wrapper),
        ));
    }

    fn discover_background(&self, d: Discovery, scroll: NodeId, wrapper: NodeId) {
        let query = self.clone();
        let this = self.clone();
        let scope = d.scope.clone();
        scope.give(self.inner.header_waiter.when(
            "header background",
            move || query_any(query.view(), &query.inner.config.selectors.header_background, Some(wrapper)),
            move |background| this.discover_header(d, scroll, background),
        ));
    }

    fn discover_header(&self, d: Discovery, scroll: NodeId, background: NodeId) {
        let query = self.clone();
        let this = self.clone();
        let scope = d.scope.clone();
        scope.give(self.inner.header_waiter.when(
            "header content",
            move || query_any(query.view(), &query.inner.config.selectors.header_content, None),
            move |header| {
                this.attach_header(
                    d,
                    HeaderNodes {
                        scroll,
                        background,
                        header,
                    },
                )
            },
        ));
    }

    fn attach_header(&self, d: Discovery, nodes: HeaderNodes) {
        if d.scope.is_destroyed() {
            return;
        }
        info!(pathname = %d.location.pathname, "header bound");
        self.inner.status.borrow_mut().header_bound = true;

        if let Some(artist_id) = artist_id_from_path(&d.location.pathname) {
            match query_any(self.view(), &self.inner.config.selectors.content_spacing, Some(nodes.header)) {
                Some(spacing) => self.show_artist_picture(&d.scope, nodes.header, spacing, artist_id.to_string()),
                None => debug!(artist_id, "no content spacing in header, skipping artist picture"),
            }
        }

        self.apply_header_frame(&nodes);

        let this = self.clone();
        let abort = d.abort.clone();
        let id = self.view().add_scroll_listener(
            nodes.scroll,
            Box::new(move || {
                if abort.is_cancelled() {
                    return;
                }
                this.apply_header_frame(&nodes);
            }),
        );
        d.scope.give(ScrollListener {
            view: self.inner.host.view.clone(),
            id,
        });
    }

    /// Recomputes every channel from the current scroll position and writes
    /// the results.
    pub(crate) fn apply_header_frame(&self, nodes: &HeaderNodes) {
        let view = self.view();
        let config = &self.inner.config;
        let offset = view.scroll_top(nodes.scroll);
        let extent = view.offset_height(nodes.background);
        let frame = interpolate::compute(offset, extent, &config.channels, &config.scroll);

        for value in &frame.values {
            view.set_style(nodes.background, value.property, &value.value.to_string());
        }
        if frame.past_threshold {
            view.add_class(nodes.header, &config.classes.scrolled_past);
        } else {
            view.remove_class(nodes.header, &config.classes.scrolled_past);
        }
        trace!(offset, fade = frame.fade_percentage, "header frame applied");
    }

    /// Clears everything the header effect wrote on the current page.
    pub(crate) fn reset_header(&self) {
        let view = self.view();
        let config = &self.inner.config;

        if let Some(header) = query_any(view, &config.selectors.header_content, None) {
            view.remove_class(header, &config.classes.scrolled_past);
            view.remove_class(header, &config.classes.profile_picture_applied);
        }
        let background = query_any(view, &config.selectors.secondary_wrapper, None)
            .and_then(|wrapper| query_any(view, &config.selectors.header_background, Some(wrapper)));
        if let Some(background) = background {
            for channel in &config.channels {
                view.remove_style(background, &channel.property);
            }
        }
    }

    fn show_artist_picture(&self, scope: &Scope, header: NodeId, spacing: NodeId, artist_id: String) {
        let this = self.clone();
        let page = scope.clone();
        let task = tokio::task::spawn_local(async move {
            let artists = this.inner.host.artists.clone();
            let result = artists.artist_image(&artist_id).await;
            if page.is_destroyed() {
                debug!(artist_id, "page changed before artist image arrived");
                return;
            }
            match result {
                Ok(Some(url)) => {
                    if let Err(e) = this.insert_profile_picture(&page, header, spacing, &url) {
                        warn!(error = %e, artist_id, "could not insert artist picture");
                    }
                }
                Ok(None) => debug!(artist_id, "artist has no profile picture"),
                Err(e) => {
                    error!(error = %e, artist_id, "failed to get artist profile picture");
                    this.view()
                        .remove_class(header, &this.inner.config.classes.profile_picture_applied);
                    this.inner.host.notifications.show(
                        &format!("Failed to get the artist profile picture for {}", artist_id),
                        Severity::Error,
                        this.inner.config.notification_duration(),
                    );
                }
            }
        });
        scope.give_teardown(move || task.abort());
    }

    fn insert_profile_picture(&self, scope: &Scope, header: NodeId, spacing: NodeId, url: &str) -> BackdropResult<()> {
        let view = self.view();
        let config = &self.inner.config;

        if let Some(existing) = query_any(view, &config.selectors.profile_picture, Some(spacing)) {
            view.remove(existing);
        }

        let container = element(view, "div", &config.classes.profile_picture_container);
        view.set_attribute(container, "draggable", "false");
        let wrapper = element(view, "div", &config.classes.profile_picture_wrapper);
        view.set_attribute(wrapper, "draggable", "false");
        let image = element(view, "img", &config.classes.profile_picture_image);
        for (name, value) in [
            ("src", url),
            ("alt", ""),
            ("aria-hidden", "false"),
            ("draggable", "false"),
            ("loading", "lazy"),
        ] {
            view.set_attribute(image, name, value);
        }
        view.append_child(wrapper, image)?;
        view.append_child(container, wrapper)?;
        view.insert_before_last(spacing, container)?;

        scope.give(MountedNode {
            view: Rc::clone(&self.inner.host.view),
            node: container,
        });
        view.add_class(header, &config.classes.profile_picture_applied);
        Ok(())
    }
}

fn element(view: &dyn HostView, tag: &str, classes: &[String]) -> NodeId {
    let node = view.create_element(tag);
    for class in classes {
        view.add_class(node, class);
    }
    node
}
