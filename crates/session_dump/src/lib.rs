//! XML session serialization for Synergy.
//!
//! Two format versions share one root element:
//!
//! - **v1** (legacy, load-only): `<dump>` with `<file path="…"/>` stack
//!   entries and plain-text `<elem>` / `<prompt>` content. Carries no
//!   session identity.
//! - **v2** (current): `<dump session="UUID">` with `<model>`, base64-coded
//!   bodies on every text-bearing element, and `<capture>` stack entries.
//!
//! Detection is structural (the `session` attribute on the root); decoding
//! is per element via its `encoding` attribute, so mixed documents load
//! conservatively.

mod error;
mod paths;
mod read;
mod schema;
mod write;
mod xml;

pub use error::DumpError;
pub use paths::{dump_file_name, dumps_root, generate_dump_path};
pub use read::load_dump;
pub use schema::{DumpFormat, DumpItem, DumpTurn, SessionDump};
pub use write::{render_dump, write_dump};
