//! Command-line interface module.

mod args;
pub mod inspect;
pub mod render;

pub use args::{Cli, Commands, RenderArgs};
