//! Interfaces the backdrop consumes from its host application.
//!
//! The host owns the real view tree, playback state and network access; the
//! controller only ever talks to it through these traits.

pub mod memory;

use std::fmt;
use std::rc::Rc;

use futures::future::LocalBoxFuture;
use serde::{Deserialize, Serialize};

use crate::scope::{Disposable, Scope};
use crate::state::{BackdropResult, DrawableOptions};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// The host's view tree.
///
/// All methods take `&self`; implementations use interior mutability. Scroll
/// listeners may call back into the view.
pub trait HostView {
    /// First attached node matching `selector`, searched under `within` when given.
    fn query(&self, selector: &str, within: Option<NodeId>) -> Option<NodeId>;
    fn create_element(&self, tag: &str) -> NodeId;
    fn append_child(&self, parent: NodeId, child: NodeId) -> BackdropResult<()>;
    /// Inserts `child` before the last child of `parent`, or appends when
    /// `parent` has no children.
    fn insert_before_last(&self, parent: NodeId, child: NodeId) -> BackdropResult<()>;
    /// Removes `node` and its subtree from the tree. The host may release
    /// them; removing an already-removed node does nothing.
    fn remove(&self, node: NodeId);
    fn set_style(&self, node: NodeId, property: &str, value: &str);
    fn remove_style(&self, node: NodeId, property: &str);
    fn add_class(&self, node: NodeId, class: &str);
    fn remove_class(&self, node: NodeId, class: &str);
    fn set_attribute(&self, node: NodeId, name: &str, value: &str);
    fn scroll_top(&self, node: NodeId) -> f64;
    fn offset_height(&self, node: NodeId) -> f64;
    fn add_scroll_listener(&self, node: NodeId, listener: Box<dyn FnMut()>) -> ListenerId;
    fn remove_scroll_listener(&self, id: ListenerId);
}

/// First match among fallback selectors, tried in order.
pub fn query_any(view: &dyn HostView, selectors: &[String], within: Option<NodeId>) -> Option<NodeId> {
    selectors.iter().find_map(|selector| view.query(selector, within))
}

/// A node this crate inserted; disposing it detaches the node.
#[derive(Clone)]
pub struct MountedNode {
    pub view: Rc<dyn HostView>,
    pub node: NodeId,
}

impl Disposable for MountedNode {
    fn dispose(&self) -> BackdropResult<()> {
        self.view.remove(self.node);
        Ok(())
    }
}

/// A registered scroll listener; disposing it unregisters the listener.
#[derive(Clone)]
pub struct ScrollListener {
    pub view: Rc<dyn HostView>,
    pub id: ListenerId,
}

impl Disposable for ScrollListener {
    fn dispose(&self) -> BackdropResult<()> {
        self.view.remove_scroll_listener(self.id);
        Ok(())
    }
}

/// Route notification from the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub pathname: String,
}

impl Location {
    pub fn new(pathname: impl Into<String>) -> Self {
        Self {
            pathname: pathname.into(),
        }
    }
}

/// Events the host pushes to the controller after it is ready.
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    SongChanged,
    Toggled,
    Navigated(Location),
}

/// Result of a cover-art lookup for the current playback item.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CoverLookup {
    pub image: Option<String>,
    pub hue_shift: f64,
}

pub trait CoverArtProvider {
    fn cover_art_for_song(&self) -> CoverLookup;
}

/// Memoised artist-image lookup. `Ok(None)` means "no image", never an error.
pub trait ArtistImageProvider {
    fn artist_image<'a>(&'a self, artist_id: &'a str) -> LocalBoxFuture<'a, BackdropResult<Option<String>>>;

    /// Drops anything memoised so far.
    fn clear(&self) {}
}

/// What the drawable should show.
#[derive(Debug, Clone, PartialEq)]
pub struct CoverFrame {
    pub image: String,
    pub placeholder_hue_shift: f64,
}

/// The opaque background renderer.
pub trait Drawable {
    fn update(&self, frame: CoverFrame) -> LocalBoxFuture<'_, BackdropResult<()>>;
    /// Node that gets mounted into the background container.
    fn canvas(&self) -> NodeId;
    fn destroy(&self) -> BackdropResult<()>;
}

pub trait DrawableFactory {
    /// Builds a drawable whose internal resources are owned by `scope`.
    fn create(&self, options: &DrawableOptions, scope: &Scope) -> BackdropResult<Rc<dyn Drawable>>;
}
