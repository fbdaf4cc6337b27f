// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Healing Buds

//! Healing Buds gateway to the Dr. Green partner platform.
//!
//! Receives signed webhook event deliveries, mirrors client/KYC and order
//! state locally, sends branded patient notifications, and exposes a signed
//! pass-through proxy plus on-demand integration diagnostics.

pub mod api;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod events;
pub mod models;
pub mod notify;
pub mod partner;
pub mod state;
pub mod storage;
