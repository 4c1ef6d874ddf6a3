// Pkgwatch Core Library

pub mod deadline;
pub mod gate;
pub mod housekeeping;
pub mod shape;
pub mod tools;
pub mod updates;
pub mod upstream;

pub use deadline::{DeadlineExceeded, with_deadline, with_detached_deadline};
pub use gate::{GateTicket, PacedGate};
pub use tools::dispatcher::ToolDispatcher;
pub use tools::{ToolServices, build_dispatcher};
