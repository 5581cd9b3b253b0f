// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Service layer — wires configuration to the session crates for both the CLI
// and the HTTP surface.

pub mod config_dir;
pub mod session;
