// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Session persistence — `session.json` in the work directory.

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use folio_core::error::{FolioError, Result};

use crate::state::SessionState;
use crate::store::{SpreadStore, write_atomic};

const FORMAT_VERSION: u32 = 1;

#[derive(Serialize)]
struct SessionFileRef<'a> {
    version: u32,
    session: &'a SessionState,
}

#[derive(Deserialize)]
struct SessionFile {
    version: u32,
    session: SessionState,
}

/// Write the session next to the images it describes.
pub fn save(store: &SpreadStore, state: &SessionState) -> Result<()> {
    let json = serde_json::to_vec_pretty(&SessionFileRef {
        version: FORMAT_VERSION,
        session: state,
    })?;
    write_atomic(&store.session_file(), &json)
}

/// Read the saved session, or `None` if none was saved yet.
pub fn load(store: &SpreadStore) -> Result<Option<SessionState>> {
    let path = store.session_file();
    let data = match std::fs::read(&path) {
        Ok(data) => data,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err.into()),
    };
    let file: SessionFile = serde_json::from_slice(&data)?;
    if file.version != FORMAT_VERSION {
        return Err(FolioError::Config(format!(
            "{} has format version {}, expected {}",
            path.display(),
            file.version,
            FORMAT_VERSION
        )));
    }
    file.session.validate()?;
    Ok(Some(file.session))
}

/// Resume the saved session, falling back to the images on disk.
#[instrument(skip_all, fields(work_dir = %store.root().display()))]
pub fn load_or_rebuild(store: &SpreadStore) -> Result<SessionState> {
    match load(store)? {
        Some(state) => {
            info!(
                session_id = %state.id(),
                spreads = state.spreads().len(),
                next_index = %state.next_index(),
                "Session resumed"
            );
            Ok(state)
        }
        None => SessionState::from_store(store),
    }
}
