//! LifeStream Core - Shared domain library.
//!
//! This crate provides the types and pure rules used across all LifeStream
//! components:
//! - `portal` - Record store adapter, application context, notifier, HTTP surface
//! - `cli` - Command-line tools for migrations, seeding, and eligibility checks
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no store
//! access, no mail transport. Everything here is deterministic given its
//! inputs (the eligibility engine takes "today" as a parameter).
//!
//! # Modules
//!
//! - [`types`] - Newtype keys, email, blood group, statuses, and entities
//! - [`eligibility`] - Donor age and donation-interval rules
//! - [`forms`] - Field validation for the donor, request, bank, and sign-up forms
//! - [`directory`] - Blood bank directory filtering
//! - [`stats`] - Dashboard counters over request and donor snapshots

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod directory;
pub mod eligibility;
pub mod forms;
pub mod stats;
pub mod types;

pub use types::*;
