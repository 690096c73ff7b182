pub mod event_ingestor;
pub mod normalize;

pub use event_ingestor::{EventIngestor, IngestorConfig, IngestorState, TickSummary};
pub use normalize::{normalize_record, NormalizeError};
