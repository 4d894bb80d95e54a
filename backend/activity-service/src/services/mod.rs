pub mod aggregator;
pub mod classifier;
pub mod lookup;
pub mod orchestrator;
pub mod synthesizer;

pub use aggregator::ActionAggregator;
pub use lookup::{ActionLookup, LookupStrategy};
pub use orchestrator::{BatchOrchestrator, BatchOutcome, Bucket};
