// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// HTTP control surface for the operator page.
//
// | Method | Path                          | Body                     |
// |--------|-------------------------------|--------------------------|
// | POST   | /api/scan                     | `{rescan_for_index?}`    |
// | POST   | /api/scan/cancel              |                          |
// | POST   | /api/process                  | `{index, to_grayscale?}` |
// | POST   | /api/process/rotate-180       | `{index}`                |
// | POST   | /api/process/deskew           | `{index}`                |
// | POST   | /api/process/crop-borders     | `{index}`                |
// | POST   | /api/approve                  | `{index}`                |
// | GET    | /api/state                    |                          |
// | PUT    | /api/state                    | `{next_scan_index}`      |
// | GET    | /api/spreads[/{index}]        |                          |
// | GET    | /api/serve/{area}/{file}      |                          |
// | GET    | /                             | operator page            |

mod error;
mod handlers;
mod router;
mod types;

pub use router::serve;
