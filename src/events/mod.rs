// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Healing Buds

//! Webhook event handling: signature verification, routing, and the
//! client/KYC and order state updaters.

pub mod clients;
pub mod orders;
pub mod route;
pub mod signature;

pub use route::{classify, EventRoute};
