pub mod tracker;

pub use tracker::JobTracker;
