pub mod archive_loader;

pub use archive_loader::{decode_archive_text, list_directory, load_figure, read_archive_text, PendingFigure};
