pub mod graph;
pub mod loaders;
pub mod parse_tree;

pub use graph::{BlockId, CategoryTable, ImportGraph};
pub use loaders::{decode_archive_text, list_directory, load_figure, read_archive_text, PendingFigure};
pub use parse_tree::{ArchiveContent, ArchiveDocument, MarkupBlock, PlainContent, RawParseTree};
