//! Core data model and the display pipeline

mod dates;
mod filter;
mod item;
mod organize;
mod params;

pub use dates::*;
pub use filter::*;
pub use item::*;
pub use organize::*;
pub use params::*;
