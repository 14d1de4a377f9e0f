pub mod aggregator;

pub use aggregator::{AggregateError, SleepMoodAggregator};
