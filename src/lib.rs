//! # TRACE
//!
//! Multi-source OSINT aggregation for four identifier kinds: username,
//! email, phone number and image.
//!
//! Every search fans one normalized identifier out to all registered
//! providers at once, maps each heterogeneous answer onto a single
//! quad-state [`models::SourceResult`], and folds the confirmed results
//! into a deduplicated [`models::SummaryReport`]. Nothing is stored,
//! cached or retried: each call is a fresh, best-effort sweep.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   ┌──────────┐   ┌────────────┐   ┌─────────┐
//! │ identifier │──▶│  fanout  │──▶│ normalize  │──▶│ summary │
//! │ classify   │   │ N probes │   │ quad-state │   │ dedup   │
//! └────────────┘   └────┬─────┘   └────────────┘   └─────────┘
//!                       │
//!                 ┌─────┴─────┐
//!                 │ providers │
//!                 └───────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! trace search username octocat
//! trace search email ada@example.com
//! trace search phone "+1 415 555 0100"
//! trace search image ./portrait.jpg
//! trace serve
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration and credential resolution |
//! | [`models`] | Requests, quad-state results, summaries |
//! | [`error`] | Validation, probe and search errors |
//! | [`identifier`] | Input classification per kind |
//! | [`countries`] | Dialing-code table and prefix detection |
//! | [`probe`] | The `Probe` trait, registries, HTTP clients |
//! | [`fanout`] | Concurrent, time-bounded probe execution |
//! | [`normalize`] | Raw outcome to `SourceResult` rules |
//! | [`summary`] | Cross-provider summary |
//! | [`providers`] | Built-in probes |
//! | [`search`] | `SearchEngine` and report shapes |
//! | [`sources`] | Provider listing |
//! | [`server`] | HTTP transport |

pub mod config;
pub mod countries;
pub mod error;
pub mod fanout;
pub mod identifier;
pub mod models;
pub mod normalize;
pub mod probe;
pub mod providers;
pub mod search;
pub mod server;
pub mod sources;
pub mod summary;
