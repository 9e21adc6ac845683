//! Application layer: the render pipeline and its document delegates.

pub mod docx;
pub mod error;
pub mod render;
pub mod xlsx;
