//! Service layer: upstream clients and the aggregation pipeline.

pub mod aggregator;
pub mod bbox_resolver;
pub mod ngd_client;
pub mod pre_process;
pub mod summarizer;
