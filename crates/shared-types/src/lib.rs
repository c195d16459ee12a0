// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Shared types for the WHOIS lookup service
//!
//! This crate provides the record schema returned to callers and stored in the
//! record cache, shared by the provider clients, the resolver and the HTTP API.

pub mod cache_status;
pub mod record;

pub use cache_status::CacheStatus;
pub use record::{Contact, WhoisRecord};
