//! # Household Memory
//!
//! A local-first memory for household facts: service visits, receipts,
//! warranties, appliance models. Records are stored in SQLite with an FTS5
//! index, and questions are answered only from stored records, with
//! citations, or refused with a suggestion of what to store.
//!
//! The retrieval-and-grounding logic lives in `household-memory-core`.
//! This crate supplies the SQLite store, HTTP text-generation providers,
//! configuration, the `hm` CLI and the HTTP API.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────────────────────┐   ┌──────────┐
//! │ hm add   │──▶│  SQLite records + FTS5   │◀──│ POST     │
//! └──────────┘   └────────────┬─────────────┘   │ /records │
//!                             │                 └──────────┘
//!                             ▼
//!                  ┌──────────────────────┐     ┌───────────────┐
//!                  │  RecallPipeline      │◀────│ OpenAI/Ollama │
//!                  │  (core crate)        │     │ (expansion)   │
//!                  └──────────┬───────────┘     └───────────────┘
//!                     ┌───────┴────────┐
//!                     ▼                ▼
//!                ┌──────────┐    ┌──────────┐
//!                │ hm ask   │    │ POST     │
//!                │ hm search│    │ /ask     │
//!                └──────────┘    └──────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema and FTS triggers |
//! | [`sqlite_store`] | `SearchIndex` / `RecordStore` over SQLite |
//! | [`generation`] | OpenAI and Ollama expansion providers |
//! | [`records`] | Adding and fetching records |
//! | [`search`] | Direct retrieval |
//! | [`ask`] | Grounded answers |
//! | [`server`] | HTTP API |

pub mod ask;
pub mod config;
pub mod db;
pub mod generation;
pub mod migrate;
pub mod records;
pub mod search;
pub mod server;
pub mod sqlite_store;
