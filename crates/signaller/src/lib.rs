pub mod consolidation;
pub mod entry;
pub mod pipeline;
pub mod riser;


pub use consolidation::*;
pub use entry::*;
pub use pipeline::*;
pub use riser::*;
