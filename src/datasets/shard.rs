//! Shard component files and group archives.
//!
//! One shard is a tuple of arrays. Component `c` of shard `index` is
//! persisted as `x{c}_{index}.arr` (CBOR-encoded), and component files
//! are bundled flat into gzip-compressed tars for transfer.

use crate::errors::{ForefrontError, Result};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use ndarray::ArrayD;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tar::{Archive, Builder};

/// Extension of a serialized array component file.
pub const COMPONENT_EXTENSION: &str = "arr";

/// Save each component of one shard as its own file in `dir`.
///
/// Returns the component paths in component order; they feed the batch
/// accumulator.
pub fn save_shard_components(
    shard: &[ArrayD<f32>],
    index: usize,
    dir: &Path,
) -> Result<Vec<PathBuf>> {
    if shard.is_empty() {
        return Err(ForefrontError::Config(
            "Shard must contain at least one array component".to_string(),
        ));
    }

    fs::create_dir_all(dir)?;

    let mut paths = Vec::with_capacity(shard.len());
    for (component, array) in shard.iter().enumerate() {
        let path = dir.join(format!("x{}_{}.{}", component, index, COMPONENT_EXTENSION));

        let mut bytes = Vec::new();
        ciborium::into_writer(array, &mut bytes)
            .map_err(|e| ForefrontError::Serialization(e.to_string()))?;
        fs::write(&path, &bytes)?;

        paths.push(path);
    }

    Ok(paths)
}

/// Load every component file in `dir` back into arrays, in component
/// order.
pub fn load_shard_components(dir: &Path) -> Result<Vec<ArrayD<f32>>> {
    let mut entries: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| is_component_file(path))
        .collect();
    entries.sort_by_key(|path| component_index(path));

    let mut arrays = Vec::with_capacity(entries.len());
    for path in entries {
        let bytes = fs::read(&path)?;
        let array: ArrayD<f32> = ciborium::from_reader(bytes.as_slice())
            .map_err(|e| ForefrontError::Serialization(e.to_string()))?;
        arrays.push(array);
    }

    Ok(arrays)
}

/// Whether `dir` holds any materialized component files.
pub fn has_components(dir: &Path) -> bool {
    fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|entry| entry.ok())
                .any(|entry| is_component_file(&entry.path()))
        })
        .unwrap_or(false)
}

/// Bundle `paths` into one gzip-compressed tar at `output`, flat (member
/// names carry no directory prefix).
pub fn group_archive(paths: &[PathBuf], output: &Path) -> Result<PathBuf> {
    let file = File::create(output)?;
    let encoder = GzEncoder::new(file, Compression::default());
    let mut builder = Builder::new(encoder);

    for path in paths {
        let name = path.file_name().ok_or_else(|| {
            ForefrontError::Config(format!("Archive member has no file name: {}", path.display()))
        })?;
        builder.append_path_with_name(path, name)?;
    }

    builder.into_inner()?.finish()?;
    Ok(output.to_path_buf())
}

/// Extract a downloaded shard archive into `dest`.
pub fn extract_archive(archive_path: &Path, dest: &Path) -> Result<()> {
    fs::create_dir_all(dest)?;

    let file = File::open(archive_path)?;
    let mut archive = Archive::new(GzDecoder::new(file));
    archive.unpack(dest)?;

    Ok(())
}

fn is_component_file(path: &Path) -> bool {
    path.extension()
        .map(|e| e == COMPONENT_EXTENSION)
        .unwrap_or(false)
}

/// Component position encoded in the file name (`x{c}_{i}.arr`).
fn component_index(path: &Path) -> usize {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .and_then(|stem| stem.strip_prefix('x'))
        .and_then(|rest| rest.split('_').next())
        .and_then(|c| c.parse().ok())
        .unwrap_or(usize::MAX)
}
