//! Shorts Studio Library
//!
//! Turns one long video (a local file or a URL) into a folder of
//! fixed-length, center-cropped portrait clips ready for short-form
//! platforms. Segments are transcoded concurrently by a supervised pool of
//! ffmpeg jobs; a failing segment never aborts its siblings.

pub mod adapters;
pub mod app;
pub mod cli;
pub mod config_initialization;
pub mod domain;
pub mod engine;
pub mod error;
pub mod planner;
pub mod ports;
pub mod utils;

// Re-export commonly used types
pub use domain::errors::JobFailure;
pub use domain::model::{
    BatchResult, BatchStatus, CropAspect, JobOutcome, MediaAsset, ProgressEvent,
    SegmentDescriptor, SegmentPlan,
};
pub use error::{StudioError, StudioResult};
