//! Pipeline stages for page-by-page PDF translation.
//!
//! Each submodule implements one step and is testable on its own.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──▶ llm ──▶ compose ──▶ document
//! (scan)    (lopdf)     (LLM)   (decode +    (write PDF)
//!                               layout)
//! ```
//!
//! 1. [`input`]: list the source PDFs and name their outputs
//! 2. [`extract`]: per-page text and raw image records; runs in
//!    `spawn_blocking` because `lopdf` is synchronous
//! 3. [`llm`]: translate the page text with bounded retry; the only
//!    stage with network I/O
//! 4. [`compose`]: decode images ([`decode`]), scale them and flow them
//!    with the translated paragraphs into one page ([`layout`])
//! 5. [`document`]: collect composed pages and write the output PDF

pub mod compose;
pub mod decode;
pub mod document;
pub mod extract;
pub mod input;
pub mod layout;
pub mod llm;
