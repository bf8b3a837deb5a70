//! Access to the members of a `.mogrt` container.
//!
//! A template is a zip archive holding a manifest (`definition.xml` or `definition.json`) and
//! the authoring project. After Effects and Premiere wrap the project in yet another zip
//! (`project.aegraphic` / `project.prgraphic`); [`MogrtArchive::extract_project`] unpacks it.

use std::fs::{self, File};
use std::io::{self, Cursor, Read, Seek};
use std::path::Path;

use log::{debug, info, trace};
use zip::ZipArchive;

use crate::err::{ArchiveError, MogrtError, Result};
use crate::manifest::ManifestFormat;

/// Extensions of nested project archives.
pub const NESTED_PROJECT_EXTENSIONS: [&str; 2] = ["aegraphic", "prgraphic"];
/// Extensions of bare project files.
pub const PROJECT_FILE_EXTENSIONS: [&str; 2] = ["aep", "prproj"];

pub trait ReadSeek: Read + Seek + Send {}

impl<T: Read + Seek + Send> ReadSeek for T {}

pub struct MogrtArchive {
    zip: ZipArchive<Box<dyn ReadSeek>>,
}

impl std::fmt::Debug for MogrtArchive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MogrtArchive")
            .field("members", &self.zip.len())
            .finish()
    }
}

impl MogrtArchive {
    pub fn open(path: impl AsRef<Path>) -> std::result::Result<Self, ArchiveError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| ArchiveError::Open {
            path: path.to_path_buf(),
            source: zip::result::ZipError::Io(e),
        })?;

        let archive = Self::from_reader_named(Box::new(file), path)?;
        debug!(
            "opened template {} ({} members)",
            path.display(),
            archive.zip.len()
        );
        Ok(archive)
    }

    pub fn from_buffer(buffer: Vec<u8>) -> std::result::Result<Self, ArchiveError> {
        Self::from_reader_named(Box::new(Cursor::new(buffer)), Path::new("<buffer>"))
    }

    fn from_reader_named(
        reader: Box<dyn ReadSeek>,
        path: &Path,
    ) -> std::result::Result<Self, ArchiveError> {
        let zip = ZipArchive::new(reader).map_err(|source| ArchiveError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(MogrtArchive { zip })
    }

    /// Member names in central directory order.
    pub fn member_names(&self) -> impl Iterator<Item = &str> {
        self.zip.file_names()
    }

    /// Full name of the first member whose file name (ignoring directories) equals `file_name`.
    pub fn find_member(&self, file_name: &str) -> Option<String> {
        self.member_names()
            .find(|name| base_name(name) == Some(file_name))
            .map(str::to_owned)
    }

    /// Locates the manifest, preferring XML over JSON.
    pub fn manifest_member(&self) -> std::result::Result<(String, ManifestFormat), ArchiveError> {
        ManifestFormat::ALL
            .into_iter()
            .find_map(|format| {
                self.find_member(format.member_name())
                    .map(|name| (name, format))
            })
            .ok_or(ArchiveError::NoManifest)
    }

    /// Locates the embedded project (nested project archive or bare project file).
    pub fn project_member(&self) -> std::result::Result<String, ArchiveError> {
        self.member_names()
            .find(|name| {
                has_extension(name, &NESTED_PROJECT_EXTENSIONS)
                    || has_extension(name, &PROJECT_FILE_EXTENSIONS)
            })
            .map(str::to_owned)
            .ok_or(ArchiveError::NoProjectFile)
    }

    pub fn read_member(&mut self, name: &str) -> std::result::Result<Vec<u8>, ArchiveError> {
        read_entry(&mut self.zip, name)
    }

    /// Copies one member into `dest_dir`, returning the written file name.
    pub fn extract_member(&mut self, name: &str, dest_dir: impl AsRef<Path>) -> Result<String> {
        let file_name = base_name(name)
            .ok_or_else(|| ArchiveError::MissingMember {
                name: name.to_owned(),
            })?
            .to_owned();

        let mut entry = self
            .zip
            .by_name(name)
            .map_err(|e| ArchiveError::from_member_lookup(name, e))?;

        let target = dest_dir.as_ref().join(&file_name);
        write_to(&mut entry, &target)?;

        info!("extracted `{}` to {}", name, target.display());
        Ok(file_name)
    }

    /// Extracts the project file into `dest_dir`, unpacking nested project archives.
    ///
    /// Returns the written file name.
    pub fn extract_project(&mut self, dest_dir: impl AsRef<Path>) -> Result<String> {
        let member = self.project_member()?;
        if !has_extension(&member, &NESTED_PROJECT_EXTENSIONS) {
            return self.extract_member(&member, dest_dir);
        }

        trace!("`{}` is a nested project archive", member);
        let bytes = self.read_member(&member)?;
        let mut nested =
            ZipArchive::new(Cursor::new(bytes)).map_err(|source| ArchiveError::NestedProject {
                name: member.clone(),
                source,
            })?;

        let inner = nested
            .file_names()
            .find(|name| has_extension(name, &PROJECT_FILE_EXTENSIONS))
            .map(str::to_owned)
            .ok_or(ArchiveError::NoProjectFile)?;
        let file_name = base_name(&inner)
            .ok_or(ArchiveError::NoProjectFile)?
            .to_owned();

        let mut entry = nested
            .by_name(&inner)
            .map_err(|e| ArchiveError::from_member_lookup(&inner, e))?;
        let target = dest_dir.as_ref().join(&file_name);
        write_to(&mut entry, &target)?;

        info!(
            "extracted `{}` from `{}` to {}",
            inner,
            member,
            target.display()
        );
        Ok(file_name)
    }
}

fn read_entry<R: Read + Seek>(
    zip: &mut ZipArchive<R>,
    name: &str,
) -> std::result::Result<Vec<u8>, ArchiveError> {
    let mut entry = zip
        .by_name(name)
        .map_err(|e| ArchiveError::from_member_lookup(name, e))?;

    let mut bytes = Vec::with_capacity(usize::try_from(entry.size()).unwrap_or(0));
    entry
        .read_to_end(&mut bytes)
        .map_err(|source| ArchiveError::Read {
            name: name.to_owned(),
            source,
        })?;

    trace!("read {} bytes from `{}`", bytes.len(), name);
    Ok(bytes)
}

fn write_to(reader: &mut impl Read, target: &Path) -> Result<()> {
    let io_err = |source: io::Error| MogrtError::Io {
        path: target.to_path_buf(),
        source,
    };

    let mut file = fs::File::create(target).map_err(io_err)?;
    io::copy(reader, &mut file).map_err(io_err)?;
    Ok(())
}

/// File name part of a member name. Member names always use `/` as separator.
fn base_name(member: &str) -> Option<&str> {
    member
        .rsplit('/')
        .next()
        .filter(|name| !name.is_empty() && *name != "." && *name != "..")
}

fn has_extension(member: &str, extensions: &[&str]) -> bool {
    base_name(member)
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
}
