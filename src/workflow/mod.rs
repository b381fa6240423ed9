pub mod diagnostics;
pub mod import_ctx;
pub mod markup_import;
pub mod plain_import;

pub use diagnostics::ContentDiagnostics;
pub use import_ctx::{ImportCtx, RunCaches};
pub use markup_import::import_markup;
pub use plain_import::import_plain;
