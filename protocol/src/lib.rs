// Pkgwatch Protocol
// Types that cross the dispatcher boundary

pub mod protocol;

pub use protocol::*;
