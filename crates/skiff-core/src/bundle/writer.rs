use std::{
    collections::BTreeMap,
    fs::File,
    io::{self, BufWriter},
    path::Path,
};

use zip::{CompressionMethod, ZipWriter, write::SimpleFileOptions};

use super::{BundleEntry, BundleError};

/// Write `entries` as a zip archive at `target`.
///
/// Entries are written in name order; when two entries share a name the first one wins.
/// Returns the number of entries written.
pub fn write_bundle(target: &Path, entries: Vec<BundleEntry>) -> Result<usize, BundleError> {
    let mut unique: BTreeMap<String, BundleEntry> = BTreeMap::new();
    for entry in entries {
        unique.entry(entry.name.clone()).or_insert(entry);
    }

    let file = File::create(target)?;
    let mut zip = ZipWriter::new(BufWriter::new(file));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for (name, entry) in &unique {
        zip.start_file(name.as_str(), options)?;
        let mut source = File::open(&entry.source).map_err(|e| BundleError::Read {
            path: entry.source.clone(),
            source: e,
        })?;
        io::copy(&mut source, &mut zip)?;
    }

    let mut out = zip.finish()?;
    io::Write::flush(&mut out)?;
    Ok(unique.len())
}

/// Pack every file under `dir` into a zip archive at `target`.
pub fn write_directory_bundle(target: &Path, dir: &Path) -> Result<usize, BundleError> {
    let mut entries = Vec::new();
    super::catalog::collect_dir(dir, "", &mut entries)?;
    write_bundle(target, entries)
}
