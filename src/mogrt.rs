use std::path::{Path, PathBuf};

use log::debug;
use serde_json::Value;

use crate::archive::MogrtArchive;
use crate::err::{MogrtError, Result};
use crate::locale::LocaleMode;
use crate::manifest::{ManifestDocument, ManifestFormat};

/// A Motion Graphics Template on disk.
///
/// A template starts out uninitialized. [`Mogrt::init`] opens the container and parses the
/// manifest; every other accessor fails with [`MogrtError::NotInitialized`] until it succeeded.
///
/// ```no_run
/// use mogrt::Mogrt;
///
/// let mut template = Mogrt::new("lower_third.mogrt");
/// template.init()?;
///
/// let manifest = template.get_manifest(true)?;
/// println!("{} ({})", manifest["capsuleNameLocalized"], manifest["authorApp"]);
///
/// for field in template.get_essential_fields(true)? {
///     println!("{} - animatable: {}", field["uiName"], field["canAnimate"]);
/// }
/// # Ok::<(), mogrt::MogrtError>(())
/// ```
#[derive(Debug)]
pub struct Mogrt {
    path: PathBuf,
    state: State,
}

#[derive(Debug)]
enum State {
    Uninitialized,
    Initialized(Loaded),
}

/// Everything produced by a successful `init`. Dropped together with the facade.
#[derive(Debug)]
struct Loaded {
    archive: MogrtArchive,
    manifest_member: String,
    format: ManifestFormat,
    document: ManifestDocument,
}

impl Loaded {
    fn load(mut archive: MogrtArchive) -> Result<Self> {
        let (manifest_member, format) = archive.manifest_member()?;
        debug!("using {:?} manifest `{}`", format, manifest_member);

        // Fail early on templates without a project, `extract_to` would not be able to finish.
        let project = archive.project_member()?;
        debug!("embedded project member `{}`", project);

        let bytes = archive.read_member(&manifest_member)?;
        let document = ManifestDocument::parse(&bytes, format)?;

        Ok(Loaded {
            archive,
            manifest_member,
            format,
            document,
        })
    }
}

impl Mogrt {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Mogrt {
            path: path.into(),
            state: State::Uninitialized,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_initialized(&self) -> bool {
        matches!(self.state, State::Initialized(_))
    }

    /// Opens the container and parses its manifest.
    ///
    /// On error the template stays uninitialized and `init` may be retried. Calling `init` on an
    /// initialized template does nothing.
    pub fn init(&mut self) -> Result<()> {
        if self.is_initialized() {
            debug!("{} is already initialized", self.path.display());
            return Ok(());
        }

        let archive = MogrtArchive::open(&self.path)?;
        let loaded = Loaded::load(archive)?;
        self.state = State::Initialized(loaded);

        Ok(())
    }

    fn loaded(&self, operation: &'static str) -> Result<&Loaded> {
        match &self.state {
            State::Initialized(loaded) => Ok(loaded),
            State::Uninitialized => Err(MogrtError::NotInitialized { operation }),
        }
    }

    fn loaded_mut(&mut self, operation: &'static str) -> Result<&mut Loaded> {
        match &mut self.state {
            State::Initialized(loaded) => Ok(loaded),
            State::Uninitialized => Err(MogrtError::NotInitialized { operation }),
        }
    }

    /// The parsed manifest.
    pub fn document(&self) -> Result<&ManifestDocument> {
        self.loaded("document").map(|l| &l.document)
    }

    pub fn author_app(&self) -> Result<&str> {
        self.loaded("author_app").map(|l| l.document.author_app())
    }

    /// Whether the template was authored in After Effects (`aefx`).
    pub fn is_after_effects(&self) -> Result<bool> {
        self.loaded("is_after_effects")
            .map(|l| l.document.is_after_effects())
    }

    /// Whether the template was authored in Premiere Pro (`ppro`).
    pub fn is_premiere(&self) -> Result<bool> {
        self.loaded("is_premiere").map(|l| l.document.is_premiere())
    }

    /// A snapshot of the top level manifest nodes.
    ///
    /// With `flatten` every locale table is replaced by a single string, otherwise tables are
    /// returned as declared (`{"strDB": [...]}`), keeping every key of every entry.
    pub fn get_manifest(&self, flatten: bool) -> Result<Value> {
        let loaded = self.loaded("get_manifest")?;
        Ok(loaded.document.project(LocaleMode::from_flatten(flatten))?)
    }

    /// The Essential Graphics fields in authoring order, see [`Mogrt::get_manifest`] for `flatten`.
    ///
    /// Child elements of an XML control that repeat (such as `menuItems/item`) become an array,
    /// a child that occurs once stays a single value. A dropdown with one menu item therefore
    /// has `"menuItems": {"item": "One"}` and one with two has `{"item": ["One", "Two"]}`.
    pub fn get_essential_fields(&self, flatten: bool) -> Result<Vec<Value>> {
        let loaded = self.loaded("get_essential_fields")?;
        Ok(loaded
            .document
            .project_fields(LocaleMode::from_flatten(flatten))?)
    }

    /// Writes the project file and the manifest into `dest_dir`.
    ///
    /// Returns the written file names, project first. The cached manifest is not affected.
    pub fn extract_to(&mut self, dest_dir: impl AsRef<Path>) -> Result<Vec<String>> {
        let dest_dir = dest_dir.as_ref();
        let loaded = self.loaded_mut("extract_to")?;

        let project = loaded.archive.extract_project(dest_dir)?;
        let manifest = loaded
            .archive
            .extract_member(&loaded.manifest_member, dest_dir)?;

        Ok(vec![project, manifest])
    }

    /// Which manifest encoding the template uses.
    pub fn manifest_format(&self) -> Result<ManifestFormat> {
        self.loaded("manifest_format").map(|l| l.format)
    }
}
