//! VAST document model, parsing, wrapper resolution and lifecycle tracking.

pub mod fetch;
pub mod model;
pub mod parser;
pub mod pixel;
pub mod resolver;
pub mod time;
pub mod tracker;
