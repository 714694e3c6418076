use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{Error, Result};
use crate::model::Store;
use crate::store;

const DIR_NAME: &str = ".familycart";
const STORE_FILENAME: &str = "store.json";

/// Directory holding `.familycart/`: `FC_DIR` if set, else the working directory.
pub fn root() -> Result<PathBuf> {
    match std::env::var_os("FC_DIR") {
        Some(dir) if !dir.is_empty() => Ok(PathBuf::from(dir)),
        _ => std::env::current_dir().map_err(|e| Error::io(".", e)),
    }
}

pub fn data_dir(root: &Path) -> PathBuf {
    root.join(DIR_NAME)
}

fn store_path(root: &Path) -> PathBuf {
    data_dir(root).join(STORE_FILENAME)
}

pub fn is_initialized(root: &Path) -> bool {
    store_path(root).is_file()
}

pub fn init(root: &Path, initial: &Store) -> Result<PathBuf> {
    let dir = data_dir(root);
    if is_initialized(root) {
        return Err(Error::AlreadyInitialized(dir));
    }
    fs::create_dir_all(&dir).map_err(|e| Error::io(&dir, e))?;
    save(root, initial)?;
    Ok(dir)
}

pub fn load(root: &Path) -> Result<Store> {
    let path = store_path(root);
    let json = match fs::read_to_string(&path) {
        Ok(json) => json,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(Error::NotInitialized),
        Err(e) => return Err(Error::io(path, e)),
    };
    let s = store::from_json(&json)?;
    debug!(path = %path.display(), items = s.items.len(), "store loaded");
    Ok(s)
}

/// Write to a sibling temp file, then rename over the store.
pub fn save(root: &Path, s: &Store) -> Result<()> {
    let path = store_path(root);
    let tmp = path.with_extension("json.tmp");
    let json = store::to_json(s)?;
    fs::write(&tmp, json).map_err(|e| Error::io(&tmp, e))?;
    fs::rename(&tmp, &path).map_err(|e| Error::io(&path, e))?;
    debug!(path = %path.display(), items = s.items.len(), "store saved");
    Ok(())
}
