// Library exports for plotlab

pub mod classify;
pub mod config;
pub mod data;
pub mod datasets;
pub mod error;
pub mod export;
pub mod gallery;
pub mod graph;
pub mod listing;
pub mod palette;
pub mod parser;
pub mod request;
pub mod runtime;
pub mod session;
pub mod stats;
pub mod style;

// Render pipeline stages
pub mod ir;
pub mod resolve;
pub mod theme;
pub mod transform;

pub use classify::{classify, ColumnInfo, ColumnSummary};
pub use config::LabConfig;
pub use data::{Column, ColumnKind, Table};
pub use datasets::{BuiltinCatalog, Catalog, DatasetProvider, DirectoryCatalog};
pub use error::{LabError, LabResult};
pub use export::{export_archive, export_single, sanitize_name, ExportedFile};
pub use gallery::{GalleryEntry, GalleryStore};
pub use graph::RenderedArtifact;
pub use listing::CodeListing;
pub use request::{Aggregate, CategoryKind, DistributionKind, MultiView, PlotRequest, RelationshipKind};
pub use runtime::{execute_listing, read_listing, render, Rendered, DEFAULT_SEED};
pub use session::Session;
pub use style::{Context, GridStyle, Palette, StyleOptions};
