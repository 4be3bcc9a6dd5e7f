use anyhow::Context;
use std::ffi::OsString;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Writes `bytes` to `dst` so that readers see either the old or the new
/// content, never a partial file.
///
/// The data is flushed to a sibling temp file and renamed over `dst` in one
/// step, so `dst` exists at every point of the save.
pub fn write_atomically(dst: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    if let Some(parent) = dst.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory: {}", parent.display()))?;
    }

    let tmp = sibling(dst, ".tmp");
    let written = fs::File::create(&tmp).and_then(|mut f| {
        f.write_all(bytes)?;
        f.sync_all()
    });
    if let Err(e) = written {
        let _ = fs::remove_file(&tmp);
        return Err(anyhow::Error::new(e).context(format!("write temp: {}", tmp.display())));
    }

    if let Err(e) = fs::rename(&tmp, dst) {
        let _ = fs::remove_file(&tmp);
        return Err(anyhow::Error::new(e).context(format!(
            "failed rename {} -> {}",
            tmp.display(),
            dst.display()
        )));
    }
    Ok(())
}

/// Reads `path`, falling back to `<path>.bak` when `path` itself is missing.
///
/// A save interrupted between moving the old file aside and moving the new one
/// in leaves only the backup behind; it is put back in place before reading.
/// Returns `None` when neither file exists.
pub fn read_recovering_backup(path: &Path) -> anyhow::Result<Option<Vec<u8>>> {
    match fs::read(path) {
        Ok(bytes) => return Ok(Some(bytes)),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => {
            return Err(anyhow::Error::new(e).context(format!("read {}", path.display())));
        }
    }

    let backup = sibling(path, ".bak");
    let bytes = match fs::read(&backup) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(anyhow::Error::new(e).context(format!("read {}", backup.display())));
        }
    };

    log::warn!(
        "{} is missing; recovering from {}",
        path.display(),
        backup.display()
    );
    if let Err(e) = fs::rename(&backup, path) {
        log::warn!("could not restore {}: {e}", path.display());
    }
    Ok(Some(bytes))
}

// `notes.md` -> `notes.md.tmp`
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(suffix);
    path.with_file_name(name)
}
