use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use log::{debug, warn};

use crate::checkpoint::record::CheckpointRecord;
use crate::error::{NetError, Result};
use crate::network::Network;

/// Writes `network` (architecture + every parameter) to `path` as one JSON
/// record, replacing any existing file.
///
/// The record goes to a sibling temporary file which is synced and then
/// renamed over `path`, so readers see either the old checkpoint or the new
/// one, never a partial write.
pub fn save(path: impl AsRef<Path>, network: &Network) -> Result<()> {
    let path = path.as_ref();
    let record = CheckpointRecord::from_network(network)?;
    write_atomic(path, &record).map_err(|source| NetError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(
        "saved checkpoint '{}' ({} parameters)",
        path.display(),
        network.parameter_count()
    );
    Ok(())
}

/// Reads the checkpoint at `path` and reconstructs the network it
/// describes. The architecture comes from the record itself.
pub fn load(path: impl AsRef<Path>) -> Result<Network> {
    let path = path.as_ref();
    let record = load_record(path)?;
    let network = record.into_network().map_err(|e| e.at_path(path))?;
    debug!(
        "loaded checkpoint '{}' ({} -> {:?} -> {})",
        path.display(),
        network.input_size(),
        network.hidden_sizes(),
        network.output_size()
    );
    Ok(network)
}

/// Reads the record at `path` and checks its architecture and parameter
/// shapes without building a network.
pub fn load_record(path: impl AsRef<Path>) -> Result<CheckpointRecord> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| NetError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let reader = BufReader::new(file);
    let record: CheckpointRecord = serde_json::from_reader(reader).map_err(|e| {
        if e.is_io() {
            NetError::Io { path: path.to_path_buf(), source: e.into() }
        } else {
            NetError::CorruptCheckpoint {
                path: Some(path.to_path_buf()),
                reason: e.to_string(),
            }
        }
    })?;
    record.check().map_err(|e| e.at_path(path))?;
    Ok(record)
}

fn write_atomic(path: &Path, record: &CheckpointRecord) -> io::Result<()> {
    let tmp = temp_path(path);
    let result = write_synced(&tmp, record).and_then(|()| fs::rename(&tmp, path));
    if result.is_err() && tmp.exists() {
        if let Err(e) = fs::remove_file(&tmp) {
            warn!("could not remove temporary checkpoint '{}': {e}", tmp.display());
        }
    }
    result
}

fn write_synced(tmp: &Path, record: &CheckpointRecord) -> io::Result<()> {
    let mut writer = BufWriter::new(File::create(tmp)?);
    serde_json::to_writer_pretty(&mut writer, record)?;
    writer.flush()?;
    writer.get_ref().sync_all()
}

/// Distinguishes concurrent saves from the same process.
static SAVE_SEQ: AtomicU64 = AtomicU64::new(0);

/// `dir/.name.<pid>.<seq>.tmp` next to the target, so the final rename stays
/// on one filesystem. Every call gets its own file.
fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "checkpoint".to_owned());
    let seq = SAVE_SEQ.fetch_add(1, Ordering::Relaxed);
    path.with_file_name(format!(".{name}.{}.{seq}.tmp", std::process::id()))
}
