pub mod error;
pub mod header;
pub mod entry;
pub mod layout;
pub mod builder;
pub mod reader;
pub mod extractor;
pub mod collect;
pub mod firmware;
pub mod archive;

pub use error::{PfsError, Result};
pub use header::ArchiveHeader;
pub use entry::EntryRecord;
pub use layout::{NameWidthStrategy, InferFromPadding, FixedWidth, DEFAULT_NAME_WIDTH};
pub use builder::ArchiveBuilder;
pub use reader::{Archive, ArchiveReader};
pub use extractor::EntryExtractor;
