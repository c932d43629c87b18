pub mod engine;
pub mod models;

#[cfg(test)]
mod tests;

pub use engine::*;
pub use models::*;
