// Pkgwatch Protocol Layer
// Response envelope and protocol-level errors

pub mod envelope;
pub mod error;

pub use envelope::{ContentSegment, ResponseEnvelope, SegmentKind};
pub use error::{FieldIssue, ProtocolError};
