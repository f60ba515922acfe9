pub mod sink;

pub use sink::{AuditRecorder, BufferedAuditSink, BufferedAuditSinkConfig};
