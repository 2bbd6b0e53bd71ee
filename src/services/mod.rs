//! Host-facing lookups.

pub mod artist;

pub use artist::{artist_id_from_path, ArtistImageSource, ArtistImages, FetchResponse};
