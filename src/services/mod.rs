pub mod category_cache;
pub mod figure_binder;
pub mod filename_order;
pub mod lineage;

pub use category_cache::{CategoryCache, NameCache, PersonCache};
pub use figure_binder::{bind_figures, classify, BindingReport, FigureKind, FigureTargets, ImportedGroup};
pub use filename_order::{filename_order_key, order_files};
pub use lineage::{make_group, make_revision};
