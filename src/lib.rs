//! # Casebook
//!
//! Hybrid semantic + keyword search over a library of markdown case
//! studies, served to coding agents over HTTP and MCP and to people over
//! a CLI.
//!
//! Each case is a markdown file with YAML frontmatter (`id`, `title`,
//! `category`, `tags`, `difficulty`, `last_updated`, ...). Cases are loaded
//! into memory at startup; search merges nearest-neighbour hits from a
//! vector index with keyword scores computed over the loaded documents.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────┐   ┌───────────────┐
//! │  cases/**   │──▶│ Loader +     │──▶│ InMemoryCase  │
//! │  *.md       │   │ frontmatter  │   │ Store         │
//! └─────────────┘   └──────────────┘   └──────┬────────┘
//!                                             │
//!   ┌──────────────┐   ┌──────────────┐       ▼
//!   │ Embedder     │──▶│ VectorIndex  │──▶ SearchEngine ──▶ CaseService
//!   │ OpenAI/Ollama│   │ memory/rest  │                        │
//!   └──────────────┘   └──────────────┘          ┌─────────────┼──────────┐
//!                                                ▼             ▼          ▼
//!                                              CLI        /tools/*      /mcp
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`logging`] | `tracing` subscriber setup |
//! | [`loader`] | Walks the case directory and parses files |
//! | [`embedding`] | OpenAI and Ollama embedding providers |
//! | [`index_rest`] | REST vector index client |
//! | [`reindex`] | Batched bulk indexing |
//! | [`service`] | Query operations shared by every front end |
//! | [`tools`] | Tool trait, built-in tools, registry |
//! | [`server`] | HTTP API |
//! | [`mcp`] | MCP bridge over the tool registry |
//!
//! The ranking, parsing and model types live in [`casebook_core`].

pub mod catalog;
pub mod config;
pub mod embedding;
pub mod get;
pub mod index_cmd;
pub mod index_rest;
pub mod loader;
pub mod logging;
pub mod mcp;
pub mod reindex;
pub mod search;
pub mod server;
pub mod service;
pub mod tools;
