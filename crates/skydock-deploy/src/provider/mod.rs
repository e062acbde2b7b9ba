// Copyright (C) 2026 Skydock Contributors
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Provider module - cloud deployment backends.

pub mod simulated;
mod traits;

pub use simulated::SimulatedProvider;
pub use traits::*;
