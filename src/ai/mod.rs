//! Optional AI enrichment of a finished analysis
//!
//! The [`TextGenerator`] trait abstracts the model server; [`OllamaClient`] is
//! the HTTP implementation and [`MockTextGenerator`] a scripted one for tests.

pub mod client;
pub mod enrich;
pub mod error;
pub mod ollama;
pub mod prompts;

pub use client::{MockTextGenerator, TextGenerator};
pub use enrich::Enricher;
pub use error::BackendError;
pub use ollama::OllamaClient;
pub use prompts::{build_prompt, InsightKind};
