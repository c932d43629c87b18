pub mod screener;


pub use screener::*;
