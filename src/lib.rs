#![forbid(unsafe_code)]
#![deny(unused_must_use)]

pub use archive::MogrtArchive;
pub use err::{ArchiveError, ManifestError, MogrtError, ResolveError, Result};
pub use locale::LocaleMode;
pub use manifest::{Field, FieldKind, ManifestDocument, ManifestFormat};
pub use mogrt::Mogrt;
pub use node::{LocaleEntry, LocaleTable, Node};

pub mod archive;
pub mod err;
pub mod locale;
pub mod manifest;
mod mogrt;
pub mod node;
