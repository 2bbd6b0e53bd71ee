//! Headless, in-memory host.
//!
//! Backs the integration tests and the demo binary. Nodes answer to the
//! selectors they were mounted with, and to simple compound class selectors
//! (`.a.b`) built from their class list.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::rc::Rc;
use std::time::Duration;

use futures::future::LocalBoxFuture;

use crate::host::{
    CoverArtProvider, CoverFrame, CoverLookup, Drawable, DrawableFactory, HostView, ListenerId,
    MountedNode, NodeId,
};
use crate::notifications::{NotificationSink, Severity};
use crate::scope::Scope;
use crate::services::{ArtistImageSource, FetchResponse};
use crate::state::{BackdropError, BackdropResult, DrawableOptions};

type Listener = Rc<RefCell<Box<dyn FnMut()>>>;

#[derive(Default)]
struct Node {
    tag: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    selectors: Vec<String>,
    classes: BTreeSet<String>,
    styles: BTreeMap<String, String>,
    attributes: BTreeMap<String, String>,
    scroll_top: f64,
    offset_height: f64,
}

impl Node {
    fn matches(&self, selector: &str) -> bool {
        if self.selectors.iter().any(|s| s == selector) {
            return true;
        }
        let Some(compound) = selector.strip_prefix('.') else {
            return false;
        };
        if compound.contains(char::is_whitespace) {
            return false;
        }
        compound.split('.').all(|class| !class.is_empty() && self.classes.contains(class))
    }
}

#[derive(Default)]
struct ViewState {
    nodes: BTreeMap<NodeId, Node>,
    next_node: u64,
    listeners: BTreeMap<u64, (NodeId, Listener)>,
    next_listener: u64,
}

impl ViewState {
    fn insert(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.next_node);
        self.next_node += 1;
        self.nodes.insert(id, node);
        id
    }

    fn detach(&mut self, id: NodeId) {
        let parent = self.nodes.get_mut(&id).and_then(|node| node.parent.take());
        if let Some(parent) = parent.and_then(|p| self.nodes.get_mut(&p)) {
            parent.children.retain(|child| *child != id);
        }
    }

    /// Forgets `id` and everything below it.
    fn drop_subtree(&mut self, id: NodeId) {
        let mut pending = vec![id];
        while let Some(next) = pending.pop() {
            if let Some(node) = self.nodes.remove(&next) {
                pending.extend(node.children);
            }
        }
    }

    fn is_descendant(&self, id: NodeId, ancestor: NodeId) -> bool {
        let mut current = self.nodes.get(&id).and_then(|n| n.parent);
        while let Some(p) = current {
            if p == ancestor {
                return true;
            }
            current = self.nodes.get(&p).and_then(|n| n.parent);
        }
        false
    }
}

/// In-memory view tree with a single document root.
pub struct MemoryView {
    state: RefCell<ViewState>,
    root: NodeId,
}

impl Default for MemoryView {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryView {
    pub fn new() -> Self {
        let mut state = ViewState::default();
        let root = state.insert(Node {
            tag: "document".to_string(),
            ..Node::default()
        });
        Self {
            state: RefCell::new(state),
            root,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Adds a node that answers to `selector` under `parent` (the document root
    /// when `None`).
    pub fn mount(&self, selector: &str, parent: Option<NodeId>) -> NodeId {
        let parent = parent.unwrap_or(self.root);
        let mut state = self.state.borrow_mut();
        let id = state.insert(Node {
            tag: "div".to_string(),
            parent: Some(parent),
            selectors: vec![selector.to_string()],
            ..Node::default()
        });
        if let Some(p) = state.nodes.get_mut(&parent) {
            p.children.push(id);
        }
        id
    }

    pub fn set_offset_height(&self, node: NodeId, height: f64) {
        if let Some(n) = self.state.borrow_mut().nodes.get_mut(&node) {
            n.offset_height = height;
        }
    }

    /// Moves the scroll position and dispatches the node's scroll listeners.
    pub fn scroll_to(&self, node: NodeId, offset: f64) {
        let listeners: Vec<(u64, Listener)> = {
            let mut state = self.state.borrow_mut();
            if let Some(n) = state.nodes.get_mut(&node) {
                n.scroll_top = offset;
            }
            state
                .listeners
                .iter()
                .filter(|(_, (target, _))| *target == node)
                .map(|(id, (_, listener))| (*id, listener.clone()))
                .collect()
        };
        for (id, listener) in listeners {
            // An earlier listener may have unregistered this one.
            if !self.state.borrow().listeners.contains_key(&id) {
                continue;
            }
            if let Ok(mut callback) = listener.try_borrow_mut() {
                callback();
            }
        }
    }

    pub fn style(&self, node: NodeId, property: &str) -> Option<String> {
        self.state.borrow().nodes.get(&node).and_then(|n| n.styles.get(property).cloned())
    }

    pub fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.state
            .borrow()
            .nodes
            .get(&node)
            .is_some_and(|n| n.classes.contains(class))
    }

    pub fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.state.borrow().nodes.get(&node).and_then(|n| n.attributes.get(name).cloned())
    }

    pub fn tag(&self, node: NodeId) -> Option<String> {
        self.state.borrow().nodes.get(&node).map(|n| n.tag.clone())
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.state.borrow().nodes.get(&node).and_then(|n| n.parent)
    }

    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.state
            .borrow()
            .nodes
            .get(&node)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    pub fn is_connected(&self, node: NodeId) -> bool {
        node == self.root || self.state.borrow().is_descendant(node, self.root)
    }

    pub fn listener_count(&self, node: NodeId) -> usize {
        self.state
            .borrow()
            .listeners
            .values()
            .filter(|(target, _)| *target == node)
            .count()
    }

    /// Nodes the view still tracks, the document root included.
    pub fn node_count(&self) -> usize {
        self.state.borrow().nodes.len()
    }

    pub fn total_listeners(&self) -> usize {
        self.state.borrow().listeners.len()
    }
}

impl HostView for MemoryView {
    fn query(&self, selector: &str, within: Option<NodeId>) -> Option<NodeId> {
        let state = self.state.borrow();
        state
            .nodes
            .iter()
            .filter(|(_, node)| node.matches(selector))
            .map(|(id, _)| *id)
            .find(|id| match within {
                Some(ancestor) => state.is_descendant(*id, ancestor),
                None => state.is_descendant(*id, self.root),
            })
    }

    fn create_element(&self, tag: &str) -> NodeId {
        self.state.borrow_mut().insert(Node {
            tag: tag.to_string(),
            ..Node::default()
        })
    }

    fn append_child(&self, parent: NodeId, child: NodeId) -> BackdropResult<()> {
        let mut state = self.state.borrow_mut();
        if !state.nodes.contains_key(&parent) || !state.nodes.contains_key(&child) {
            return Err(BackdropError::Host(format!("cannot append {} to {}", child, parent)));
        }
        state.detach(child);
        if let Some(c) = state.nodes.get_mut(&child) {
            c.parent = Some(parent);
        }
        if let Some(p) = state.nodes.get_mut(&parent) {
            p.children.push(child);
        }
        Ok(())
    }

    fn insert_before_last(&self, parent: NodeId, child: NodeId) -> BackdropResult<()> {
        let mut state = self.state.borrow_mut();
        if !state.nodes.contains_key(&parent) || !state.nodes.contains_key(&child) {
            return Err(BackdropError::Host(format!("cannot insert {} into {}", child, parent)));
        }
        state.detach(child);
        if let Some(c) = state.nodes.get_mut(&child) {
            c.parent = Some(parent);
        }
        if let Some(p) = state.nodes.get_mut(&parent) {
            let at = p.children.len().saturating_sub(1);
            p.children.insert(at, child);
        }
        Ok(())
    }

    fn remove(&self, node: NodeId) {
        if node == self.root {
            return;
        }
        let mut state = self.state.borrow_mut();
        state.detach(node);
        state.drop_subtree(node);
    }

    fn set_style(&self, node: NodeId, property: &str, value: &str) {
        if let Some(n) = self.state.borrow_mut().nodes.get_mut(&node) {
            n.styles.insert(property.to_string(), value.to_string());
        }
    }

    fn remove_style(&self, node: NodeId, property: &str) {
        if let Some(n) = self.state.borrow_mut().nodes.get_mut(&node) {
            n.styles.remove(property);
        }
    }

    fn add_class(&self, node: NodeId, class: &str) {
        if let Some(n) = self.state.borrow_mut().nodes.get_mut(&node) {
            n.classes.insert(class.to_string());
        }
    }

    fn remove_class(&self, node: NodeId, class: &str) {
        if let Some(n) = self.state.borrow_mut().nodes.get_mut(&node) {
            n.classes.remove(class);
        }
    }

    fn set_attribute(&self, node: NodeId, name: &str, value: &str) {
        if let Some(n) = self.state.borrow_mut().nodes.get_mut(&node) {
            n.attributes.insert(name.to_string(), value.to_string());
        }
    }

    fn scroll_top(&self, node: NodeId) -> f64 {
        self.state.borrow().nodes.get(&node).map_or(0.0, |n| n.scroll_top)
    }

    fn offset_height(&self, node: NodeId) -> f64 {
        self.state.borrow().nodes.get(&node).map_or(0.0, |n| n.offset_height)
    }

    fn add_scroll_listener(&self, node: NodeId, listener: Box<dyn FnMut()>) -> ListenerId {
        let mut state = self.state.borrow_mut();
        let id = state.next_listener;
        state.next_listener += 1;
        state.listeners.insert(id, (node, Rc::new(RefCell::new(listener))));
        ListenerId(id)
    }

    fn remove_scroll_listener(&self, id: ListenerId) {
        self.state.borrow_mut().listeners.remove(&id.0);
    }
}

/// Counters shared by a [`MemoryDrawableFactory`] and every drawable it built.
#[derive(Debug, Default)]
pub struct DrawableLog {
    created: Cell<u32>,
    updates: Cell<u32>,
    destroyed: Cell<u32>,
    failing_updates: Cell<u32>,
    failing_creates: Cell<u32>,
    update_delay: Cell<Duration>,
}

impl DrawableLog {
    pub fn created(&self) -> u32 {
        self.created.get()
    }

    pub fn updates(&self) -> u32 {
        self.updates.get()
    }

    pub fn destroyed(&self) -> u32 {
        self.destroyed.get()
    }

    /// Drawables constructed and not yet destroyed.
    pub fn live(&self) -> u32 {
        self.created.get() - self.destroyed.get()
    }

    /// Makes the next `count` updates fail.
    pub fn fail_next_updates(&self, count: u32) {
        self.failing_updates.set(count);
    }

    pub fn fail_next_creates(&self, count: u32) {
        self.failing_creates.set(count);
    }

    pub fn set_update_delay(&self, delay: Duration) {
        self.update_delay.set(delay);
    }

    fn take(counter: &Cell<u32>) -> bool {
        let remaining = counter.get();
        if remaining > 0 {
            counter.set(remaining - 1);
            true
        } else {
            false
        }
    }
}

pub struct MemoryDrawable {
    view: Rc<MemoryView>,
    canvas: NodeId,
    log: Rc<DrawableLog>,
    image: RefCell<Option<String>>,
    destroyed: Cell<bool>,
}

impl MemoryDrawable {
    pub fn image(&self) -> Option<String> {
        self.image.borrow().clone()
    }
}

impl Drawable for MemoryDrawable {
    fn update(&self, frame: CoverFrame) -> LocalBoxFuture<'_, BackdropResult<()>> {
        Box::pin(async move {
            let delay = self.log.update_delay.get();
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            if self.destroyed.get() {
                return Err(BackdropError::Drawable("update on destroyed drawable".into()));
            }
            if DrawableLog::take(&self.log.failing_updates) {
                return Err(BackdropError::Drawable(format!("could not load {}", frame.image)));
            }
            self.view.set_attribute(self.canvas, "data-image", &frame.image);
            *self.image.borrow_mut() = Some(frame.image);
            self.log.updates.set(self.log.updates.get() + 1);
            Ok(())
        })
    }

    fn canvas(&self) -> NodeId {
        self.canvas
    }

    fn destroy(&self) -> BackdropResult<()> {
        if !self.destroyed.replace(true) {
            self.view.remove(self.canvas);
            self.log.destroyed.set(self.log.destroyed.get() + 1);
        }
        Ok(())
    }
}

pub struct MemoryDrawableFactory {
    view: Rc<MemoryView>,
    log: Rc<DrawableLog>,
    last_options: RefCell<Option<DrawableOptions>>,
}

impl MemoryDrawableFactory {
    pub fn new(view: Rc<MemoryView>) -> Self {
        Self {
            view,
            log: Rc::new(DrawableLog::default()),
            last_options: RefCell::new(None),
        }
    }

    pub fn log(&self) -> Rc<DrawableLog> {
        self.log.clone()
    }

    pub fn last_options(&self) -> Option<DrawableOptions> {
        self.last_options.borrow().clone()
    }
}

impl DrawableFactory for MemoryDrawableFactory {
    fn create(&self, options: &DrawableOptions, scope: &Scope) -> BackdropResult<Rc<dyn Drawable>> {
        if DrawableLog::take(&self.log.failing_creates) {
            return Err(BackdropError::Drawable("renderer unavailable".into()));
        }
        *self.last_options.borrow_mut() = Some(options.clone());

        let canvas = self.view.create_element("canvas");
        let view: Rc<dyn HostView> = self.view.clone();
        scope.give(MountedNode { view, node: canvas });
        self.log.created.set(self.log.created.get() + 1);

        Ok(Rc::new(MemoryDrawable {
            view: self.view.clone(),
            canvas,
            log: self.log.clone(),
            image: RefCell::new(None),
            destroyed: Cell::new(false),
        }))
    }
}

/// Playback state with a settable current cover.
#[derive(Debug, Default)]
pub struct MemoryCovers {
    current: RefCell<CoverLookup>,
}

impl MemoryCovers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, image: Option<&str>, hue_shift: f64) {
        *self.current.borrow_mut() = CoverLookup {
            image: image.map(str::to_string),
            hue_shift,
        };
    }
}

impl CoverArtProvider for MemoryCovers {
    fn cover_art_for_song(&self) -> CoverLookup {
        self.current.borrow().clone()
    }
}

/// Canned artist documents keyed by id.
#[derive(Debug, Default)]
pub struct MemoryArtistSource {
    responses: RefCell<HashMap<String, FetchResponse>>,
    failing: RefCell<HashSet<String>>,
    calls: RefCell<HashMap<String, u32>>,
}

impl MemoryArtistSource {
    pub fn insert(&self, artist_id: &str, response: FetchResponse) {
        self.responses.borrow_mut().insert(artist_id.to_string(), response);
    }

    /// Makes lookups for `artist_id` fail at the transport level.
    pub fn fail(&self, artist_id: &str) {
        self.failing.borrow_mut().insert(artist_id.to_string());
    }

    pub fn calls(&self, artist_id: &str) -> u32 {
        self.calls.borrow().get(artist_id).copied().unwrap_or(0)
    }
}

impl ArtistImageSource for MemoryArtistSource {
    fn fetch_artist<'a>(&'a self, artist_id: &'a str) -> LocalBoxFuture<'a, BackdropResult<FetchResponse>> {
        Box::pin(async move {
            *self.calls.borrow_mut().entry(artist_id.to_string()).or_insert(0) += 1;
            if self.failing.borrow().contains(artist_id) {
                return Err(BackdropError::Host("connection reset".into()));
            }
            Ok(self
                .responses
                .borrow()
                .get(artist_id)
                .cloned()
                .unwrap_or(FetchResponse {
                    status: 404,
                    body: String::new(),
                }))
        })
    }
}

impl<S: ArtistImageSource> ArtistImageSource for Rc<S> {
    fn fetch_artist<'a>(&'a self, artist_id: &'a str) -> LocalBoxFuture<'a, BackdropResult<FetchResponse>> {
        self.as_ref().fetch_artist(artist_id)
    }
}

/// Records every notification it is asked to show.
#[derive(Debug, Default)]
pub struct MemoryNotifications {
    shown: RefCell<Vec<(String, Severity, Duration)>>,
}

impl MemoryNotifications {
    pub fn shown(&self) -> Vec<(String, Severity, Duration)> {
        self.shown.borrow().clone()
    }
}

impl NotificationSink for MemoryNotifications {
    fn show(&self, message: &str, severity: Severity, duration: Duration) {
        self.shown.borrow_mut().push((message.to_string(), severity, duration));
    }
}
