pub mod driver;
pub mod queue;
pub mod record;
pub mod restorer;
pub mod scanner;

pub use driver::{run, SyncOptions, SyncReport};
pub use queue::{handoff, RecordReceiver, RecordSender};
pub use record::SerializedRecord;
pub use restorer::drain_and_restore;
pub use scanner::{scan_and_emit, ScanOptions};
