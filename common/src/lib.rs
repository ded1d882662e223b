mod constants;
mod contestant;

pub use constants::*;
pub use contestant::*;
