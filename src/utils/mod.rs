//! Shared helpers: HTML escaping and MIME classification.

pub mod html;
pub mod mime;
