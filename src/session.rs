//! One interactive session
//!
//! Owns the configuration, the dataset provider, the selected table and the
//! gallery. Front ends drive everything through this type.

use crate::classify::{classify, ColumnSummary};
use crate::config::LabConfig;
use crate::data::Table;
use crate::datasets::{Catalog, DatasetProvider};
use crate::error::{LabError, LabResult};
use crate::export::{self, ExportedFile};
use crate::gallery::{GalleryEntry, GalleryStore};
use crate::request::PlotRequest;
use crate::runtime::{self, Rendered};
use crate::style::StyleOptions;
use chrono::{DateTime, Local};

pub struct Session {
    config: LabConfig,
    provider: Box<dyn DatasetProvider>,
    dataset: Option<(String, Table)>,
    gallery: GalleryStore,
}

impl Session {
    /// Session over the built-in catalog plus `config.data_dir`, if set
    pub fn new(config: LabConfig) -> Self {
        let provider = Box::new(Catalog::with_directory(config.data_dir.as_deref()));
        Self::with_provider(config, provider)
    }

    pub fn with_provider(config: LabConfig, provider: Box<dyn DatasetProvider>) -> Self {
        let gallery = GalleryStore::new(config.gallery_capacity);
        Session {
            config,
            provider,
            dataset: None,
            gallery,
        }
    }

    pub fn config(&self) -> &LabConfig {
        &self.config
    }

    pub fn datasets(&self) -> Vec<String> {
        self.provider.list()
    }

    /// Load `name` and make it the current table
    pub fn select_dataset(&mut self, name: &str) -> LabResult<&Table> {
        let table = self.provider.load(name)?;
        tracing::info!(
            dataset = name,
            rows = table.row_count(),
            columns = table.column_count(),
            "selected dataset"
        );
        let (_, table) = self.dataset.insert((name.to_string(), table));
        Ok(&*table)
    }

    /// Like [`Session::select_dataset`], but an unknown name falls back to the first catalog entry
    pub fn select_or_default(&mut self, name: &str) -> LabResult<&Table> {
        let name = if self.provider.contains(name) {
            name.to_string()
        } else {
            let fallback = self
                .provider
                .list()
                .into_iter()
                .next()
                .ok_or_else(|| self.provider.unknown(name))?;
            tracing::warn!(requested = name, fallback = %fallback, "unknown dataset, using the first one");
            fallback
        };
        self.select_dataset(&name)
    }

    pub fn dataset_name(&self) -> Option<&str> {
        self.dataset.as_ref().map(|(name, _)| name.as_str())
    }

    /// The current table; errors until a dataset has been selected
    pub fn table(&self) -> LabResult<&Table> {
        self.dataset
            .as_ref()
            .map(|(_, table)| table)
            .ok_or_else(|| LabError::empty("plot: no dataset selected"))
    }

    pub fn summary(&self) -> LabResult<ColumnSummary> {
        Ok(classify(self.table()?))
    }

    pub fn style(&self) -> StyleOptions {
        self.config.style()
    }

    pub fn set_style(&mut self, style: &StyleOptions) -> LabResult<()> {
        style.validate()?;
        self.config.set_style(style);
        Ok(())
    }

    /// Render against the current table with the session style and seed
    pub fn render(&self, request: &PlotRequest) -> LabResult<Rendered> {
        runtime::render(self.table()?, request, &self.style(), self.config.sample_seed)
    }

    /// Move a rendered chart into the gallery
    pub fn save(&mut self, rendered: Rendered, name: &str, description: Option<&str>) -> &GalleryEntry {
        let description = description.map(str::to_string).unwrap_or(rendered.description);
        tracing::info!(name, gallery = self.gallery.len() + 1, "saved chart to gallery");
        self.gallery.append(rendered.artifact, name, description)
    }

    pub fn gallery(&self) -> &[GalleryEntry] {
        self.gallery.list()
    }

    pub fn clear_gallery(&mut self) {
        tracing::info!(removed = self.gallery.len(), "cleared gallery");
        self.gallery.clear();
    }

    pub fn export_entry(&self, index: usize) -> LabResult<ExportedFile> {
        let entry = self
            .gallery
            .get(index)
            .ok_or_else(|| LabError::empty(format!("export: no gallery entry #{}", index + 1)))?;
        Ok(export::export_single(entry))
    }

    /// Whole gallery as a ZIP; an empty gallery is refused
    pub fn export_gallery(&self, now: DateTime<Local>) -> LabResult<ExportedFile> {
        if self.gallery.is_empty() {
            return Err(LabError::empty("export: the gallery is empty"));
        }
        let file = export::export_archive(self.gallery.list(), now)?;
        tracing::info!(filename = %file.filename, entries = self.gallery.len(), "exported gallery");
        Ok(file)
    }
}
