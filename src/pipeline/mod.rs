//! Pipeline stages for PDF-to-image conversion.
//!
//! Each submodule implements exactly one step, so each can be tested with an
//! engine double and the backend can change without touching the others.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ session ──▶ render ──▶ encode
//! (bytes)   (open/close) (pixels)  (PNG + data URL)
//! ```
//!
//! 1. [`input`]   — the uploaded bytes and their name; optional disk loading
//! 2. [`session`] — open the document, validate page numbers, guarantee teardown
//! 3. [`render`]  — scaled viewport, rasterise onto an opaque white surface
//! 4. [`encode`]  — PNG artifact, derived file name, addressable reference
//!
//! Sessions, renders and encodes are blocking; [`crate::Converter`] runs
//! them inside `spawn_blocking`.

pub mod encode;
pub mod input;
pub mod render;
pub mod session;
