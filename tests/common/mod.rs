#![allow(dead_code)]

use std::rc::Rc;
use std::time::Duration;

use cover_backdrop::host::memory::{
    DrawableLog, MemoryArtistSource, MemoryCovers, MemoryDrawableFactory, MemoryNotifications, MemoryView,
};
use cover_backdrop::host::{HostView, NodeId};
use cover_backdrop::{ArtistImages, Backdrop, BackdropConfig, Collaborators, Toggle};

pub struct Harness {
    pub view: Rc<MemoryView>,
    pub factory: Rc<MemoryDrawableFactory>,
    pub covers: Rc<MemoryCovers>,
    pub source: Rc<MemoryArtistSource>,
    pub notifications: Rc<MemoryNotifications>,
    pub toggle: Toggle,
    pub backdrop: Backdrop,
}

/// Host markup of an artist or playlist page.
#[derive(Debug, Clone, Copy)]
pub struct Page {
    pub scroll: NodeId,
    pub wrapper: NodeId,
    pub background: NodeId,
    pub header: NodeId,
    pub spacing: NodeId,
    pub title: NodeId,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(BackdropConfig::default())
    }

    pub fn with_config(config: BackdropConfig) -> Self {
        let view = Rc::new(MemoryView::new());
        let factory = Rc::new(MemoryDrawableFactory::new(view.clone()));
        let covers = Rc::new(MemoryCovers::new());
        let source = Rc::new(MemoryArtistSource::default());
        let notifications = Rc::new(MemoryNotifications::default());
        let toggle = Toggle::new(true);

        let host_view: Rc<dyn HostView> = view.clone();
        let host = Collaborators {
            view: host_view,
            drawables: factory.clone(),
            covers: covers.clone(),
            artists: Rc::new(ArtistImages::new(source.clone())),
            notifications: notifications.clone(),
        };
        let backdrop = Backdrop::new(config, host, toggle.clone());

        Self {
            view,
            factory,
            covers,
            source,
            notifications,
            toggle,
            backdrop,
        }
    }

    pub fn log(&self) -> Rc<DrawableLog> {
        self.factory.log()
    }

    fn selector(list: &[String]) -> &str {
        list.first().map(String::as_str).unwrap_or_default()
    }

    pub fn mount_app_root(&self) -> NodeId {
        let selectors = &self.backdrop.config().selectors;
        self.view.mount(Self::selector(&selectors.app_root), None)
    }

    /// Mounts the scroll container and a full entity header.
    pub fn mount_page(&self) -> Page {
        let scroll = self.mount_scroll_container();
        self.mount_header(scroll)
    }

    pub fn mount_scroll_container(&self) -> NodeId {
        let selectors = &self.backdrop.config().selectors;
        self.view.mount(Self::selector(&selectors.scroll_container), None)
    }

    /// Mounts the entity header inside an existing scroll container.
    pub fn mount_header(&self, scroll: NodeId) -> Page {
        let selectors = &self.backdrop.config().selectors;
        let wrapper = self.view.mount(Self::selector(&selectors.secondary_wrapper), Some(scroll));
        let background = self.view.mount(Self::selector(&selectors.header_background), Some(wrapper));
        let header = self.view.mount(Self::selector(&selectors.header_content), Some(wrapper));
        let spacing = self.view.mount(Self::selector(&selectors.content_spacing), Some(header));
        let title = self.view.mount("#title", Some(spacing));
        self.view.set_offset_height(background, 400.0);
        Page {
            scroll,
            wrapper,
            background,
            header,
            spacing,
            title,
        }
    }

    pub fn container(&self) -> Option<NodeId> {
        self.view.query(".CoverBackdropContainer", None)
    }
}

/// Lets spawned local tasks run while the paused clock moves forward.
pub async fn advance(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}
