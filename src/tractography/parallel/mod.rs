//! parallel — assignment of seeds to worker threads.

pub mod work_distribution;

pub use self::work_distribution::partition;
