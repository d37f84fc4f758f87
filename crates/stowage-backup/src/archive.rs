//! Archive packing and unpacking.
//!
//! Snapshots are stored as gzip-compressed GNU tar streams. Every entry is a
//! regular file named by its root-relative path, with mode `0o644` and a zero
//! mtime, so the same file set always produces the same archive bytes.
//! Directories are recreated on unpack from the entry paths.

use crate::fingerprint::SnapshotDigest;
use crate::walker::SelectedFile;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, ErrorKind};
use std::path::{Component, Path, PathBuf};
use stowage_core::types::{ArchiveFormat, DEFAULT_COMPRESSION_LEVEL};
use stowage_core::{ArchiveError, Error, Result};
use tar::{Builder as TarBuilder, EntryType, Header};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// Permission bits recorded for every archived file
pub const ENTRY_MODE: u32 = 0o644;

/// Blob key (and cache file name) of a snapshot archive
pub fn archive_key(digest: &SnapshotDigest, format: ArchiveFormat) -> String {
    format!("{}.{}", digest.to_hex(), format.extension())
}

/// Packs and unpacks snapshot archives.
#[derive(Debug, Clone, Copy)]
pub struct Archiver {
    compression_level: u32,
}

impl Default for Archiver {
    fn default() -> Self {
        Self::new(DEFAULT_COMPRESSION_LEVEL)
    }
}

impl Archiver {
    /// Creates an archiver with a gzip level (clamped to 1-9).
    pub fn new(compression_level: u32) -> Self {
        Self {
            compression_level: compression_level.clamp(1, 9),
        }
    }

    pub fn compression_level(&self) -> u32 {
        self.compression_level
    }

    /// Writes `files` into a new archive at `output` and returns the number
    /// of entries written.
    ///
    /// The archive is assembled in a temporary file next to `output` and
    /// moved into place once complete. Files that vanished since the walk are
    /// skipped; any other read failure aborts.
    pub fn pack(&self, files: &[SelectedFile], output: &Path) -> Result<usize> {
        let parent = match output.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent)?;

        let staging = NamedTempFile::new_in(&parent)?;
        let encoder = GzEncoder::new(
            BufWriter::new(staging.as_file().try_clone()?),
            Compression::new(self.compression_level),
        );
        let mut tar = TarBuilder::new(encoder);

        let mut written = 0;
        for file in files {
            let data = match fs::read(&file.path) {
                Ok(data) => data,
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    warn!("Skipping {}: removed since selection", file.path.display());
                    continue;
                }
                Err(e) => return Err(Error::file_read(file.path.display(), e)),
            };

            let mut header = Header::new_gnu();
            header.set_entry_type(EntryType::Regular);
            header.set_size(data.len() as u64);
            header.set_mode(ENTRY_MODE);
            header.set_mtime(0);
            tar.append_data(&mut header, &file.relative, data.as_slice())?;
            written += 1;
        }

        let encoder = tar.into_inner()?;
        let writer = encoder.finish()?;
        writer.into_inner().map_err(|e| e.into_error())?.sync_all()?;

        staging
            .persist(output)
            .map_err(|e| Error::Io(e.error))?;

        debug!("Packed {} files into {}", written, output.display());
        Ok(written)
    }

    /// Extracts `archive` under `destination`, overwriting existing files, and
    /// returns the restored relative paths in archive order.
    pub fn unpack(&self, archive: &Path, destination: &Path) -> Result<Vec<PathBuf>> {
        let file = File::open(archive)?;
        let mut tar = tar::Archive::new(GzDecoder::new(BufReader::new(file)));

        fs::create_dir_all(destination)?;
        let mut restored = Vec::new();

        let entries = tar.entries().map_err(corrupt)?;
        for entry in entries {
            let mut entry = entry.map_err(corrupt)?;
            let raw_path = entry.path().map_err(corrupt)?.into_owned();
            let relative = safe_relative_path(&raw_path)?;

            match entry.header().entry_type() {
                EntryType::Regular | EntryType::Continuous => {
                    if relative.as_os_str().is_empty() {
                        return Err(ArchiveError::UnsafePath {
                            path: raw_path.display().to_string(),
                        }
                        .into());
                    }
                    let target = destination.join(&relative);
                    if let Some(parent) = target.parent() {
                        fs::create_dir_all(parent)?;
                    }
                    let mut out = File::create(&target)?;
                    io::copy(&mut entry, &mut out).map_err(corrupt)?;
                    restored.push(relative);
                }
                EntryType::Directory => {
                    fs::create_dir_all(destination.join(&relative))?;
                }
                other => {
                    return Err(ArchiveError::UnsupportedEntry {
                        path: raw_path.display().to_string(),
                        kind: format!("{:?}", other),
                    }
                    .into());
                }
            }
        }

        debug!(
            "Unpacked {} files from {} into {}",
            restored.len(),
            archive.display(),
            destination.display()
        );
        Ok(restored)
    }
}

fn corrupt(e: io::Error) -> Error {
    ArchiveError::Corrupt {
        reason: e.to_string(),
    }
    .into()
}

/// Keeps only normal components; absolute or `..` paths are refused.
fn safe_relative_path(path: &Path) -> Result<PathBuf> {
    let mut relative = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(ArchiveError::UnsafePath {
                    path: path.display().to_string(),
                }
                .into());
            }
        }
    }
    Ok(relative)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::SelectionRules;
    use crate::walker::walk;
    use tempfile::TempDir;

    fn create_source() -> TempDir {
        let temp = TempDir::new().unwrap();
        let base = temp.path();
        fs::create_dir_all(base.join("docs/deep")).unwrap();
        fs::write(base.join("a.txt"), "alpha").unwrap();
        fs::write(base.join("docs/deep/b.bin"), [0u8, 159, 146, 150]).unwrap();
        fs::write(base.join("empty"), "").unwrap();
        temp
    }

    #[test]
    fn test_pack_unpack_round_trip() {
        let source = create_source();
        let files = walk(source.path(), &SelectionRules::all()).unwrap();
        let out = TempDir::new().unwrap();
        let archive = out.path().join("cache/abc.tar.gz");

        let archiver = Archiver::default();
        assert_eq!(archiver.pack(&files, &archive).unwrap(), 3);

        let dest = TempDir::new().unwrap();
        let restored = archiver.unpack(&archive, dest.path()).unwrap();

        assert_eq!(
            restored,
            vec![
                PathBuf::from("a.txt"),
                PathBuf::from("docs/deep/b.bin"),
                PathBuf::from("empty")
            ]
        );
        for rel in &restored {
            assert_eq!(
                fs::read(dest.path().join(rel)).unwrap(),
                fs::read(source.path().join(rel)).unwrap()
            );
        }
    }

    #[test]
    fn test_same_files_give_same_bytes() {
        let source = create_source();
        let files = walk(source.path(), &SelectionRules::all()).unwrap();
        let out = TempDir::new().unwrap();

        Archiver::default().pack(&files, &out.path().join("one.tar.gz")).unwrap();
        Archiver::default().pack(&files, &out.path().join("two.tar.gz")).unwrap();

        assert_eq!(
            fs::read(out.path().join("one.tar.gz")).unwrap(),
            fs::read(out.path().join("two.tar.gz")).unwrap()
        );
    }

    #[test]
    fn test_vanished_file_is_skipped() {
        let source = create_source();
        let files = walk(source.path(), &SelectionRules::all()).unwrap();
        fs::remove_file(source.path().join("a.txt")).unwrap();
        let out = TempDir::new().unwrap();
        let archive = out.path().join("x.tar.gz");

        assert_eq!(Archiver::default().pack(&files, &archive).unwrap(), 2);

        let dest = TempDir::new().unwrap();
        let restored = Archiver::default().unpack(&archive, dest.path()).unwrap();
        assert!(!restored.contains(&PathBuf::from("a.txt")));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_non_utf8_name_round_trips() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let source = TempDir::new().unwrap();
        let name = OsStr::from_bytes(b"caf\xe9.txt");
        fs::create_dir_all(source.path().join("menu")).unwrap();
        fs::write(source.path().join("menu").join(name), "latte").unwrap();
        let files = walk(source.path(), &SelectionRules::all()).unwrap();
        let out = TempDir::new().unwrap();
        let archive = out.path().join("x.tar.gz");

        Archiver::default().pack(&files, &archive).unwrap();
        let dest = TempDir::new().unwrap();
        let restored = Archiver::default().unpack(&archive, dest.path()).unwrap();

        assert_eq!(restored, vec![Path::new("menu").join(name)]);
        assert_eq!(
            fs::read_to_string(dest.path().join("menu").join(name)).unwrap(),
            "latte"
        );
    }

    #[test]
    fn test_unpack_overwrites_existing_files() {
        let source = create_source();
        let files = walk(source.path(), &SelectionRules::all()).unwrap();
        let out = TempDir::new().unwrap();
        let archive = out.path().join("x.tar.gz");
        Archiver::default().pack(&files, &archive).unwrap();

        let dest = TempDir::new().unwrap();
        fs::write(dest.path().join("a.txt"), "a much longer local edit").unwrap();
        Archiver::default().unpack(&archive, dest.path()).unwrap();

        assert_eq!(fs::read_to_string(dest.path().join("a.txt")).unwrap(), "alpha");
    }

    fn raw_archive(path: &Path, build: impl FnOnce(&mut TarBuilder<GzEncoder<File>>)) {
        let file = File::create(path).unwrap();
        let mut tar = TarBuilder::new(GzEncoder::new(file, Compression::default()));
        build(&mut tar);
        tar.into_inner().unwrap().finish().unwrap();
    }

    #[test]
    fn test_symlink_entry_is_unsupported() {
        let out = TempDir::new().unwrap();
        let archive = out.path().join("link.tar.gz");
        raw_archive(&archive, |tar| {
            let mut header = Header::new_gnu();
            header.set_entry_type(EntryType::Symlink);
            header.set_size(0);
            header.set_link_name("a.txt").unwrap();
            tar.append_data(&mut header, "link", io::empty()).unwrap();
        });

        let dest = TempDir::new().unwrap();
        let err = Archiver::default().unpack(&archive, dest.path()).unwrap_err();
        assert!(matches!(
            err,
            Error::Archive(ArchiveError::UnsupportedEntry { ref path, .. }) if path == "link"
        ));
    }

    #[test]
    fn test_parent_escape_is_refused() {
        let out = TempDir::new().unwrap();
        let archive = out.path().join("evil.tar.gz");
        raw_archive(&archive, |tar| {
            let mut header = Header::new_old();
            let name = b"../evil.txt";
            header.as_mut_bytes()[..name.len()].copy_from_slice(name);
            header.set_entry_type(EntryType::Regular);
            header.set_size(4);
            header.set_mode(ENTRY_MODE);
            header.set_cksum();
            tar.append(&header, &b"evil"[..]).unwrap();
        });

        let dest = TempDir::new().unwrap();
        let err = Archiver::default()
            .unpack(&archive, &dest.path().join("root"))
            .unwrap_err();
        assert!(matches!(err, Error::Archive(ArchiveError::UnsafePath { .. })));
        assert!(!dest.path().join("evil.txt").exists());
    }

    #[test]
    fn test_garbage_is_corrupt() {
        let out = TempDir::new().unwrap();
        let archive = out.path().join("junk.tar.gz");
        fs::write(&archive, b"definitely not gzip").unwrap();

        let dest = TempDir::new().unwrap();
        let err = Archiver::default().unpack(&archive, dest.path()).unwrap_err();
        assert!(matches!(err, Error::Archive(ArchiveError::Corrupt { .. })));
    }

    #[test]
    fn test_archive_key() {
        let digest = SnapshotDigest::from_hex("beef").unwrap();
        assert_eq!(archive_key(&digest, ArchiveFormat::Tgz), "beef.tar.gz");
    }
}
