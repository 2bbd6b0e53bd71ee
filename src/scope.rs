//! Owning containers of disposable resources.
//!
//! A [`Scope`] collects teardown work as it is acquired and releases all of it
//! in one `destroy()` call. Resources are released in reverse order of
//! acquisition, so anything acquired later (which may depend on what came
//! before) goes first. Scopes nest: destroying a parent destroys every child
//! it created; destroying a child leaves the parent and siblings untouched.
//!
//! Scopes are single-threaded (`Rc` based) and are never torn down by `Drop`:
//! whoever owns a scope is responsible for destroying it.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::state::BackdropResult;

/// Something that knows how to release itself.
pub trait Disposable {
    fn dispose(&self) -> BackdropResult<()>;
}

impl Disposable for CancellationToken {
    fn dispose(&self) -> BackdropResult<()> {
        self.cancel();
        Ok(())
    }
}

enum Entry {
    Teardown(Box<dyn FnOnce() -> BackdropResult<()>>),
    Object(Box<dyn Disposable>),
    Owned(Box<dyn Any>),
    Child(Scope),
}

impl Entry {
    fn release(self) -> BackdropResult<()> {
        match self {
            Entry::Teardown(action) => action(),
            Entry::Object(object) => object.dispose(),
            Entry::Owned(value) => {
                drop(value);
                Ok(())
            }
            Entry::Child(scope) => {
                scope.destroy();
                Ok(())
            }
        }
    }
}

struct ScopeInner {
    name: String,
    entries: RefCell<Vec<Entry>>,
    destroyed: Cell<bool>,
}

#[derive(Clone)]
pub struct Scope {
    inner: Rc<ScopeInner>,
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("name", &self.inner.name)
            .field("entries", &self.len())
            .field("destroyed", &self.is_destroyed())
            .finish()
    }
}

impl Scope {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            inner: Rc::new(ScopeInner {
                name: name.into(),
                entries: RefCell::new(Vec::new()),
                destroyed: Cell::new(false),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Registers `resource` for disposal and hands it back.
    ///
    /// The scope keeps its own clone, so handle-like types (`Rc` wrappers,
    /// tokens, wait handles) work naturally. If the scope is already destroyed
    /// the resource is disposed on the spot.
    pub fn give<D>(&self, resource: D) -> D
    where
        D: Disposable + Clone + 'static,
    {
        self.push(Entry::Object(Box::new(resource.clone())));
        resource
    }

    /// Registers an infallible teardown action.
    pub fn give_teardown<F>(&self, action: F)
    where
        F: FnOnce() + 'static,
    {
        self.push(Entry::Teardown(Box::new(move || {
            action();
            Ok(())
        })));
    }

    /// Registers a teardown action whose failure is logged during `destroy()`.
    pub fn give_fallible<F>(&self, action: F)
    where
        F: FnOnce() -> BackdropResult<()> + 'static,
    {
        self.push(Entry::Teardown(Box::new(action)));
    }

    /// Keeps `value` alive until the scope is destroyed. Nothing else happens
    /// on disposal beyond dropping it.
    pub fn own<T: 'static>(&self, value: T) {
        self.push(Entry::Owned(Box::new(value)));
    }

    /// Creates a scope whose lifetime is bounded by this one.
    pub fn child(&self, name: impl Into<String>) -> Scope {
        let child = Scope::new(name);
        if !self.is_destroyed() {
            // Children destroyed on their own are done; keep the list from
            // growing with every navigation.
            self.inner
                .entries
                .borrow_mut()
                .retain(|entry| !matches!(entry, Entry::Child(c) if c.is_destroyed()));
        }
        self.push(Entry::Child(child.clone()));
        child
    }

    /// Releases every registered resource exactly once. Later calls do nothing.
    pub fn destroy(&self) {
        if self.inner.destroyed.replace(true) {
            return;
        }
        let entries = std::mem::take(&mut *self.inner.entries.borrow_mut());
        debug!(scope = %self.inner.name, resources = entries.len(), "destroying scope");
        for entry in entries.into_iter().rev() {
            if let Err(e) = entry.release() {
                warn!(scope = %self.inner.name, error = %e, "resource disposal failed");
            }
        }
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner.destroyed.get()
    }

    /// Number of resources currently registered.
    pub fn len(&self) -> usize {
        self.inner.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn push(&self, entry: Entry) {
        if self.is_destroyed() {
            debug!(scope = %self.inner.name, "scope already destroyed, releasing immediately");
            if let Err(e) = entry.release() {
                warn!(scope = %self.inner.name, error = %e, "resource disposal failed");
            }
            return;
        }
        self.inner.entries.borrow_mut().push(entry);
    }
}

impl Disposable for Scope {
    fn dispose(&self) -> BackdropResult<()> {
        self.destroy();
        Ok(())
    }
}
