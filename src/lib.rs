// SPDX-License-Identifier: AGPL-3.0-or-later

//! Bankbridge - Bank-Linking Backend Service
//!
//! This crate provides an HTTP API for signing up users, linking external
//! bank accounts through a bank-data aggregator, and creating ACH funding
//! sources at a payment-rail provider. User and bank-account records live
//! in a remote, provider-owned document store; the service holds no local
//! authoritative copy.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Session cookie and authenticated-user extraction
//! - `exchange` - The token-exchange orchestration sequence
//! - `providers` - Remote provider clients (identity store, aggregator,
//!   payment rail)

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod exchange;
pub mod models;
pub mod providers;
pub mod sharing;
pub mod state;
