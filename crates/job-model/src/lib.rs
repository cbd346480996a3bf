//! Promoreel Job Model
//!
//! Defines the core data contracts for Promoreel renders:
//! - **Job:** The render request, its typed options, and its status machine
//! - **Template:** The immutable style registry (BPM, grade, transition, track)
//! - **Repository:** Where job records live between status updates

pub mod job;
pub mod repository;
pub mod template;

pub use job::*;
pub use repository::*;
pub use template::*;
