//! Core types - pure abstractions shared across the codebase.

mod geometry;
mod url;

use std::future::Future;
use std::pin::Pin;

pub use geometry::{RequestedBox, Size};
pub use url::{DeckUrl, SlideRef};

/// Boxed future returned by collaborator traits (fetcher, PDF backend, layout probe).
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
