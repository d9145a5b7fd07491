pub mod client;
pub mod extractor;

pub use client::*;
pub use extractor::*;
