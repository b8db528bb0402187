//! WebVTT caption parsing and cue-box layout.

pub mod cue;
pub mod layout;
pub mod parser;
