mod dedup;
mod streams;

pub use dedup::DedupWindow;
pub use streams::StreamTracker;
