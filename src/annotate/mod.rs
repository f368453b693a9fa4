//! Post-crawl annotation of the downloaded archive.
//!
//! Two stages run over the year directories a crawl leaves behind:
//!
//! 1. [`extract`]: pull a title and abstract out of every PDF through a
//!    pluggable [`extract::TextExtractor`]
//! 2. [`classify`]: ask a language model, through a pluggable
//!    [`classify::ModelClient`], for a research area and the authors
//!
//! The PDF text engine and the model transport are supplied by the caller.
//! This module owns the directory walk, the parsing of replies and the
//! rate-limit backoff around the model.

pub mod classify;
pub mod extract;
