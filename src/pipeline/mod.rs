//! Pipeline stages for rebuilding a document from its embed endpoint.
//!
//! Each submodule implements exactly one step. Parsing is pure and lives in
//! [`scan`]; network access goes through the [`fetch::Fetcher`] seam so every
//! stage above it can be tested with canned bodies.
//!
//! ## Data Flow
//!
//! ```text
//! identifier ──▶ descriptor ──▶ direct ──▶ indirect ──▶ scratch ──▶ assemble
//!  (URL seg)      (fetch)      (images)   (JSONP→orig)  (slots)     (lopdf)
//! ```
//!
//! 1. [`identifier`] derive the content identifier from the reference URL
//! 2. [`fetch`]      the `Fetcher` trait and its reqwest implementation
//! 3. [`scan`]       pure extraction of image URLs, page descriptors and
//!    the `orig` URL inside an escaped JSONP fragment
//! 4. [`download`]   bounded fan-out shared by both phases; the direct phase
//! 5. [`resolve`]    the indirect phase: descriptor → image URL → slot
//! 6. [`scratch`]    slot store for one run, removed on every exit path
//! 7. [`assemble`]   order, decode and write one PDF page per image; runs in
//!    `spawn_blocking` because decoding is CPU-bound

pub mod assemble;
pub mod download;
pub mod fetch;
pub mod identifier;
pub mod resolve;
pub mod scan;
pub mod scratch;
