//! Document model module.
//!
//! Provides:
//! - An arena-backed element tree with mutation records
//! - Layout boxes for spatial checks
//! - The markup seam describing posts, viewers and players

pub mod document;
pub mod markup;

pub use document::{Document, Mutation, NodeId, Rect};
pub use markup::{DefaultMarkup, Markup};
