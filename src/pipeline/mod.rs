//! Pipeline stages around the engine call.
//!
//! Each submodule implements exactly one step and is testable on its own.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ engine ──▶ sanitize ──▶ write
//! (path)    (opaque)   (JSON only)  (atomic)
//! ```
//!
//! 1. [`input`]: check the input path exists and is readable
//! 2. engine: see [`crate::engine`]
//! 3. [`sanitize`]: strip layout geometry and root bookkeeping from the
//!    block tree
//! 4. [`write`]: route on the file suffix and persist with temp + rename

pub mod input;
pub mod sanitize;
pub mod write;
