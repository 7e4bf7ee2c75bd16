//! The archive reader interface (§4.9/§9): extracting a single named
//! file out of an artifact archive, and unpacking a whole archive to a
//! directory at install time. Default implementations for the zip format
//! (`.gotya` archives per §6) and tar variants are carried here since
//! `gotya-core` already depends on the format stack; `gotya-cli` is free
//! to supply its own.

use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors extracting from an archive.
#[derive(Error, Debug)]
pub enum ArchiveError {
    /// Filesystem error opening the archive or writing extracted files.
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    /// The requested internal path was not present in the archive.
    #[error("file not found in archive: {0}")]
    MissingEntry(String),
    /// The archive container itself could not be parsed.
    #[error("archive error: {0}")]
    Invalid(String),
}

/// Extracts individual files, or an archive's full contents, to disk.
/// The orchestrator uses [`ArchiveReader::extract_single_file`] to read
/// `meta/artifact.json` out of a candidate artifact; the install path
/// uses [`ArchiveReader::extract_all`] to unpack the payload.
pub trait ArchiveReader: Send + Sync {
    /// Extract `internal_path` from `archive_path` to `out_path`.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::MissingEntry`] if the path isn't present,
    /// or an IO/parse error opening the archive or writing the output.
    fn extract_single_file(
        &self,
        archive_path: &Path,
        internal_path: &str,
        out_path: &Path,
    ) -> Result<(), ArchiveError>;

    /// Unpack every file in `archive_path` under `dest_dir`.
    ///
    /// # Errors
    ///
    /// Returns an IO/parse error opening the archive or writing the
    /// output.
    fn extract_all(&self, archive_path: &Path, dest_dir: &Path) -> Result<Vec<PathBuf>, ArchiveError>;
}

/// Reads `.gotya` artifact archives, which are zip files per §6.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipArchiveReader;

impl ArchiveReader for ZipArchiveReader {
    fn extract_single_file(
        &self,
        archive_path: &Path,
        internal_path: &str,
        out_path: &Path,
    ) -> Result<(), ArchiveError> {
        let file = File::open(archive_path)?;
        let mut archive =
            zip::ZipArchive::new(BufReader::new(file)).map_err(|e| ArchiveError::Invalid(e.to_string()))?;
        let mut entry = archive
            .by_name(internal_path)
            .map_err(|_| ArchiveError::MissingEntry(internal_path.to_string()))?;
        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = File::create(out_path)?;
        io::copy(&mut entry, &mut out)?;
        Ok(())
    }

    fn extract_all(&self, archive_path: &Path, dest_dir: &Path) -> Result<Vec<PathBuf>, ArchiveError> {
        let file = File::open(archive_path)?;
        let mut archive =
            zip::ZipArchive::new(BufReader::new(file)).map_err(|e| ArchiveError::Invalid(e.to_string()))?;
        fs::create_dir_all(dest_dir)?;
        let mut extracted = Vec::with_capacity(archive.len());
        for i in 0..archive.len() {
            let mut entry = archive
                .by_index(i)
                .map_err(|e| ArchiveError::Invalid(e.to_string()))?;
            let Some(relative) = entry.enclosed_name() else {
                return Err(ArchiveError::Invalid(format!(
                    "unsafe path in archive entry {i}"
                )));
            };
            let out_path = dest_dir.join(&relative);
            if entry.is_dir() {
                fs::create_dir_all(&out_path)?;
                continue;
            }
            if let Some(parent) = out_path.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut out = File::create(&out_path)?;
            io::copy(&mut entry, &mut out)?;
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                if let Some(mode) = entry.unix_mode() {
                    fs::set_permissions(&out_path, fs::Permissions::from_mode(mode)).ok();
                }
            }
            extracted.push(out_path);
        }
        Ok(extracted)
    }
}

/// Reads tar-family archives (`tar`, `tar.gz`, `tar.zst`). Carried for
/// format-stack completeness; the generator and orchestrator only ever
/// produce/consume zip `.gotya` files, so this reader has no caller in
/// the core paths.
#[derive(Debug, Clone, Copy, Default)]
pub struct TarArchiveReader;

impl TarArchiveReader {
    fn open_decoder(archive_path: &Path) -> Result<Box<dyn Read>, ArchiveError> {
        let file = File::open(archive_path)?;
        let reader = BufReader::new(file);
        match archive_path.extension().and_then(|e| e.to_str()) {
            Some("zst") => Ok(Box::new(
                zstd::stream::Decoder::new(reader).map_err(|e| ArchiveError::Invalid(e.to_string()))?,
            )),
            Some("gz") | Some("tgz") => Ok(Box::new(flate2::read::GzDecoder::new(reader))),
            _ => Ok(Box::new(reader)),
        }
    }
}

impl ArchiveReader for TarArchiveReader {
    fn extract_single_file(
        &self,
        archive_path: &Path,
        internal_path: &str,
        out_path: &Path,
    ) -> Result<(), ArchiveError> {
        let decoder = Self::open_decoder(archive_path)?;
        let mut archive = tar::Archive::new(decoder);
        for entry in archive.entries()? {
            let mut entry = entry?;
            if entry.path()?.to_string_lossy() == internal_path {
                if let Some(parent) = out_path.parent() {
                    fs::create_dir_all(parent)?;
                }
                entry.unpack(out_path)?;
                return Ok(());
            }
        }
        Err(ArchiveError::MissingEntry(internal_path.to_string()))
    }

    fn extract_all(&self, archive_path: &Path, dest_dir: &Path) -> Result<Vec<PathBuf>, ArchiveError> {
        fs::create_dir_all(dest_dir)?;
        let decoder = Self::open_decoder(archive_path)?;
        let mut archive = tar::Archive::new(decoder);
        let mut extracted = Vec::new();
        for entry in archive.entries()? {
            let mut entry = entry?;
            if entry.header().entry_type().is_dir() {
                continue;
            }
            let relative: PathBuf = entry.path()?.components().collect();
            let out_path = dest_dir.join(&relative);
            if !out_path.starts_with(dest_dir) {
                return Err(ArchiveError::Invalid(format!(
                    "unsafe path in archive entry: {}",
                    relative.display()
                )));
            }
            if let Some(parent) = out_path.parent() {
                fs::create_dir_all(parent)?;
            }
            entry.unpack(&out_path)?;
            extracted.push(out_path);
        }
        Ok(extracted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn sample_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut buf = Vec::new();
        {
            let mut writer = zip::ZipWriter::new(std::io::Cursor::new(&mut buf));
            let options: zip::write::FileOptions<'_, ()> = zip::write::FileOptions::default();
            for (name, content) in entries {
                writer.start_file(*name, options).unwrap();
                writer.write_all(content).unwrap();
            }
            writer.finish().unwrap();
        }
        buf
    }

    #[test]
    fn zip_reader_extracts_named_entry() {
        let dir = tempfile::tempdir().unwrap();
        let archive_path = dir.path().join("a.gotya");
        std::fs::write(&archive_path, sample_zip(&[("meta/artifact.json", b"{}")])).unwrap();

        let out_path = dir.path().join("out.json");
        ZipArchiveReader.extract_single_file(&archive_path, "meta/artifact.json", &out_path).unwrap();
        assert_eq!(std::fs::read(&out_path).unwrap(), b"{}");
    }

    #[test]
    fn zip_reader_missing_entry_fails() {
        let dir = tempfile::tempdir().unwrap();
        let archive_path = dir.path().join("a.gotya");
        std::fs::write(&archive_path, sample_zip(&[("meta/artifact.json", b"{}")])).unwrap();

        let out_path = dir.path().join("out.json");
        let err = ZipArchiveReader
            .extract_single_file(&archive_path, "missing.json", &out_path)
            .unwrap_err();
        assert!(matches!(err, ArchiveError::MissingEntry(_)));
    }

    #[test]
    fn zip_reader_extracts_all_entries() {
        let dir = tempfile::tempdir().unwrap();
        let archive_path = dir.path().join("a.gotya");
        std::fs::write(
            &archive_path,
            sample_zip(&[("bin/tool", b"binary"), ("meta/artifact.json", b"{}")]),
        )
        .unwrap();

        let dest = dir.path().join("extracted");
        let files = ZipArchiveReader.extract_all(&archive_path, &dest).unwrap();
        assert_eq!(files.len(), 2);
        assert!(dest.join("bin/tool").exists());
    }
}
