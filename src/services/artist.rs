//! Artist profile pictures: route parsing and memoised lookup.

use std::cell::RefCell;
use std::collections::HashMap;

use futures::future::LocalBoxFuture;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use tracing::debug;

use crate::host::ArtistImageProvider;
use crate::state::{BackdropError, BackdropResult};

static ARTIST_PATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^/artist/([A-Za-z0-9]+)").expect("artist path pattern is valid"));

/// Artist id of an `/artist/<id>` route, ignoring any trailing sub-page.
pub fn artist_id_from_path(pathname: &str) -> Option<&str> {
    ARTIST_PATH
        .captures(pathname)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Raw answer from the host's authenticated web API fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchResponse {
    pub status: u16,
    pub body: String,
}

impl FetchResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }
}

/// Fetches the artist document for an id. Supplied by the host.
pub trait ArtistImageSource {
    fn fetch_artist<'a>(&'a self, artist_id: &'a str) -> LocalBoxFuture<'a, BackdropResult<FetchResponse>>;
}

#[derive(Debug, Default, Deserialize)]
struct ArtistDocument {
    #[serde(default)]
    images: Vec<ArtistImage>,
}

#[derive(Debug, Deserialize)]
struct ArtistImage {
    url: String,
}

/// Picks the profile picture out of an artist document.
///
/// The medium size (second entry) is preferred, then the small one, then
/// whatever comes first.
pub fn pick_profile_picture(body: &str) -> Result<Option<String>, serde_json::Error> {
    let doc: ArtistDocument = serde_json::from_str(body)?;
    let pick = doc
        .images
        .get(1)
        .or_else(|| doc.images.get(2))
        .or_else(|| doc.images.first())
        .map(|image| image.url.clone());
    Ok(pick)
}

/// Artist image lookup memoised by artist id for as long as it lives.
pub struct ArtistImages<S> {
    source: S,
    cache: RefCell<HashMap<String, String>>,
}

impl<S: ArtistImageSource> ArtistImages<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            cache: RefCell::new(HashMap::new()),
        }
    }

    pub fn cached(&self, artist_id: &str) -> Option<String> {
        self.cache.borrow().get(artist_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.cache.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.borrow().is_empty()
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub async fn lookup(&self, artist_id: &str) -> BackdropResult<Option<String>> {
        if let Some(url) = self.cached(artist_id) {
            return Ok(Some(url));
        }

        let response = self
            .source
            .fetch_artist(artist_id)
            .await
            .map_err(|e| BackdropError::ArtistImage {
                artist_id: artist_id.to_string(),
                reason: e.to_string(),
            })?;

        if response.status != 200 {
            debug!(artist_id, status = response.status, "artist lookup returned no document");
            return Ok(None);
        }

        let picture = pick_profile_picture(&response.body).map_err(|e| BackdropError::ArtistImage {
            artist_id: artist_id.to_string(),
            reason: format!("unreadable artist document: {}", e),
        })?;

        match picture {
            Some(url) => {
                self.cache.borrow_mut().insert(artist_id.to_string(), url.clone());
                Ok(Some(url))
            }
            None => {
                debug!(artist_id, "artist has no images");
                Ok(None)
            }
        }
    }
}

impl<S: ArtistImageSource> ArtistImageProvider for ArtistImages<S> {
    fn artist_image<'a>(&'a self, artist_id: &'a str) -> LocalBoxFuture<'a, BackdropResult<Option<String>>> {
        Box::pin(self.lookup(artist_id))
    }

    fn clear(&self) {
        self.cache.borrow_mut().clear();
    }
}
