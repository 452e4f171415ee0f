//! Core library for breakdown
//!
//! This crate is the **Functional Core** of the breakdown extractor: it turns
//! positioned words from a time-tracking report into the project breakdown
//! table. It never opens files or parses PDF bytes; pages reach it through
//! the [`token::RenderedPage`] and [`pipeline::PageSource`] traits, which the
//! `breakdown` binary implements on top of the `pdf` crate.
//!
//! # Data flow
//!
//! ```text
//! PageSource ─▶ page_tokens ─▶ is_breakdown_page ─▶ locate_columns
//!                                                       │
//!               ResultTable ◀─ classify ◀─ assemble_rows ◀┘
//! ```
//!
//! # Module Organization
//!
//! - [`config`]: Tuning constants with TOML overrides
//! - [`token`]: Positioned words, value patterns, page body cropping
//! - [`classify`]: Page detection and row labelling
//! - [`columns`]: Per-page column boundaries
//! - [`rows`]: Band extraction and anchor pairing
//! - [`pipeline`]: Page traversal and the result table
//! - [`cache`]: Content-keyed get-or-compute store
//!
//! # Example Usage
//!
//! ```rust,ignore
//! use breakdown_core::config::ExtractConfig;
//! use breakdown_core::pipeline::process_pages;
//!
//! let table = process_pages(&document, &ExtractConfig::default());
//! for record in table.records() {
//!     println!("{}", record.join("\t"));
//! }
//! ```

pub mod cache;
pub mod classify;
pub mod columns;
pub mod config;
pub mod pipeline;
pub mod rows;
pub mod token;
