// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// folio-session — The digitization session: which spreads exist, what state
// each one is in, where their images live, and the operations that move
// them through scan → process → adjust → approve.

pub mod acquire;
pub mod persist;
pub mod state;
pub mod store;
pub mod workflow;

pub use acquire::{Acquirer, CommandAcquirer, UnconfiguredAcquirer};
pub use state::{SessionSnapshot, SessionState};
pub use store::{ImageArea, SpreadStore};
pub use workflow::WorkflowController;
