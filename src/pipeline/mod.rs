//! Pipeline stages for PDF translation.
//!
//! Each submodule implements exactly one transformation step and is tested
//! on its own. Rendering lives in [`crate::render`] because it has several
//! interchangeable tiers.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──▶ segment ──▶ translate ──▶ segment::reassemble
//! (path)    (pdfium)    (lines)     (backend)     (Markdown)
//! ```
//!
//! 1. [`input`] checks the user-supplied path or bytes point at a readable PDF
//! 2. [`extract`] turns text objects into Markdown lines using font size and
//!    weight; runs in `spawn_blocking` because pdfium is not async-safe
//! 3. [`segment`] splits lines into text runs and structural lines
//! 4. [`translate`] sends text segments to the backend, one at a time, with
//!    optional script verification; [`postprocess`] cleans each reply
//! 5. [`markdown`] parses the reassembled Markdown into blocks for the
//!    DOCX and PDF writers

pub mod extract;
pub mod input;
pub mod markdown;
pub mod postprocess;
pub mod segment;
pub mod translate;
