//! State module for tracking crawl progress
//!
//! `PageState` is the lifecycle of a single URL inside the frontier. The
//! frontier itself lives in `crawler::frontier` and enforces these
//! transitions under its lock.

mod page_state;

pub use page_state::PageState;
