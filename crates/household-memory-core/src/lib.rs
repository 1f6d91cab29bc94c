//! # Household Memory Core
//!
//! The retrieval-and-grounding pipeline behind Household Memory: data
//! models, query normalization, optional query expansion, concurrent
//! multi-query search, consensus ranking, evidence evaluation and grounded
//! answer assembly.
//!
//! This crate contains no SQLite, HTTP or filesystem code. Storage and
//! text generation are reached through the traits in [`store`] and
//! [`expand`]; the `household-memory` app crate supplies the concrete
//! backends.
//!
//! ```text
//! question ─▶ normalize ─┬──────────────▶ executor ─▶ merge ─▶ evidence ─▶ assemble ─▶ Answer
//!                        └─▶ expand (best-effort, timed) ─┘
//! ```

pub mod assemble;
pub mod error;
pub mod evidence;
pub mod executor;
pub mod expand;
pub mod merge;
pub mod models;
pub mod normalize;
pub mod pipeline;
pub mod store;

pub use error::{RecallError, RecallResult};
pub use models::{Answer, Confidence, Hit, RawHit, Record, SourceKind};
pub use pipeline::{PipelineConfig, RecallPipeline};
