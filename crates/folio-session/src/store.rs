// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// On-disk spread images.
//
// Layout under the work directory:
//
//   scans/image_001.png     raw acquisition, overwritten on rescan
//   cleaned/image_001.png   output of process and later adjustments
//   session.json            persisted session (see `persist`)
//
// Every write goes to a hidden temp file in the target directory and is then
// renamed into place, so a failed write never leaves a truncated image.

use std::fs;
use std::path::{Path, PathBuf};

use folio_core::error::{FolioError, Result};
use folio_core::types::SpreadIndex;
use tracing::{debug, instrument};

const SCANS_DIR: &str = "scans";
const CLEANED_DIR: &str = "cleaned";
const SESSION_FILE: &str = "session.json";

/// Which of the two image directories a file lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageArea {
    Scans,
    Cleaned,
}

impl ImageArea {
    pub fn dir_name(self) -> &'static str {
        match self {
            Self::Scans => SCANS_DIR,
            Self::Cleaned => CLEANED_DIR,
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            SCANS_DIR => Some(Self::Scans),
            CLEANED_DIR => Some(Self::Cleaned),
            _ => None,
        }
    }
}

/// Filesystem access for spread images, keyed by index.
#[derive(Debug, Clone)]
pub struct SpreadStore {
    root: PathBuf,
    index_digits: usize,
}

impl SpreadStore {
    pub fn new(root: impl Into<PathBuf>, index_digits: usize) -> Self {
        Self {
            root: root.into(),
            index_digits,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn session_file(&self) -> PathBuf {
        self.root.join(SESSION_FILE)
    }

    pub fn area_dir(&self, area: ImageArea) -> PathBuf {
        self.root.join(area.dir_name())
    }

    fn path_in(&self, area: ImageArea, index: SpreadIndex) -> PathBuf {
        self.area_dir(area).join(index.file_name(self.index_digits))
    }

    pub fn raw_path(&self, index: SpreadIndex) -> PathBuf {
        self.path_in(ImageArea::Scans, index)
    }

    pub fn cleaned_path(&self, index: SpreadIndex) -> PathBuf {
        self.path_in(ImageArea::Cleaned, index)
    }

    #[instrument(skip(self, bytes), fields(len = bytes.len()))]
    pub fn save_raw(&self, index: SpreadIndex, bytes: &[u8]) -> Result<PathBuf> {
        let path = self.raw_path(index);
        write_atomic(&path, bytes)?;
        Ok(path)
    }

    #[instrument(skip(self, bytes), fields(len = bytes.len()))]
    pub fn save_cleaned(&self, index: SpreadIndex, bytes: &[u8]) -> Result<PathBuf> {
        let path = self.cleaned_path(index);
        write_atomic(&path, bytes)?;
        Ok(path)
    }

    pub fn load_raw(&self, index: SpreadIndex) -> Result<Vec<u8>> {
        read_image(&self.raw_path(index), index, "raw scan")
    }

    pub fn load_cleaned(&self, index: SpreadIndex) -> Result<Vec<u8>> {
        read_image(&self.cleaned_path(index), index, "cleaned image")
    }

    pub fn has_raw(&self, index: SpreadIndex) -> bool {
        self.raw_path(index).is_file()
    }

    pub fn has_cleaned(&self, index: SpreadIndex) -> bool {
        self.cleaned_path(index).is_file()
    }

    /// Indices with an image in `area`, ascending. A missing directory is
    /// empty; names outside the `image_<n>.png` scheme are ignored.
    pub fn indices_on_disk(&self, area: ImageArea) -> Result<Vec<SpreadIndex>> {
        let dir = self.area_dir(area);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut indices = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if let Some(index) = entry.file_name().to_str().and_then(SpreadIndex::from_file_name) {
                indices.push(index);
            }
        }
        indices.sort_unstable();
        indices.dedup();
        Ok(indices)
    }

    /// Path of an image to serve over HTTP, given untrusted area and file
    /// names. Only existing `image_<n>.png` files in the two image
    /// directories resolve.
    pub fn resolve_served(&self, area: &str, file_name: &str) -> Result<PathBuf> {
        let area = ImageArea::parse(area)
            .ok_or_else(|| FolioError::NotFound(format!("no image area named {area:?}")))?;
        if SpreadIndex::from_file_name(file_name).is_none() {
            return Err(FolioError::NotFound(format!("no image named {file_name:?}")));
        }
        let path = self.area_dir(area).join(file_name);
        if !path.is_file() {
            return Err(FolioError::NotFound(format!(
                "{}/{} does not exist",
                area.dir_name(),
                file_name
            )));
        }
        Ok(path)
    }
}

fn read_image(path: &Path, index: SpreadIndex, what: &str) -> Result<Vec<u8>> {
    match fs::read(path) {
        Ok(bytes) => Ok(bytes),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Err(FolioError::NotFound(
            format!("no {what} for spread {index} at {}", path.display()),
        )),
        Err(err) => Err(err.into()),
    }
}

/// Write `bytes` to `path` via a temp file and rename, creating the parent
/// directory if needed.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)?;

    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| FolioError::InvalidArgument(format!("bad file path {}", path.display())))?;
    let tmp = parent.join(format!(".{file_name}.tmp"));

    if let Err(err) = fs::write(&tmp, bytes).and_then(|()| fs::rename(&tmp, path)) {
        let _ = fs::remove_file(&tmp);
        return Err(err.into());
    }
    debug!(path = %path.display(), len = bytes.len(), "File written");
    Ok(())
}
