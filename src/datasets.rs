//! Dataset providers
//!
//! A provider exposes a small, ordered catalog of named tables. The first name
//! in the catalog is the primary dataset a front end falls back to.

use crate::data::Table;
use crate::error::{LabError, LabResult};
use std::fs;
use std::path::{Path, PathBuf};

const TIPS_CSV: &str = include_str!("../data/tips.csv");
const PENGUINS_CSV: &str = include_str!("../data/penguins.csv");
const FLIGHTS_CSV: &str = include_str!("../data/flights.csv");
const IRIS_CSV: &str = include_str!("../data/iris.csv");
const DIAMONDS_CSV: &str = include_str!("../data/diamonds.csv");
const TITANIC_CSV: &str = include_str!("../data/titanic.csv");
const CAR_CRASHES_CSV: &str = include_str!("../data/car_crashes.csv");

pub trait DatasetProvider {
    /// Catalog names, in display order
    fn list(&self) -> Vec<String>;

    /// Load a table by catalog name
    fn load(&self, name: &str) -> LabResult<Table>;

    fn contains(&self, name: &str) -> bool {
        self.list().iter().any(|n| n == name)
    }

    fn unknown(&self, name: &str) -> LabError {
        LabError::UnknownDataset {
            name: name.to_string(),
            available: self.list(),
        }
    }
}

/// Tables embedded in the binary.
///
/// Iris and Flights carry the classic values. Tips, Penguins, Diamonds,
/// Titanic and Car Crashes are generated samples with the classic column
/// layout and missing-value pattern. The published files (`tips.csv`, ...)
/// can be served next to them from `data_dir` under their lowercase names.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinCatalog;

impl BuiltinCatalog {
    const ENTRIES: [(&'static str, &'static str); 7] = [
        ("Tips", TIPS_CSV),
        ("Penguins", PENGUINS_CSV),
        ("Flights", FLIGHTS_CSV),
        ("Iris", IRIS_CSV),
        ("Diamonds (1K sample)", DIAMONDS_CSV),
        ("Titanic", TITANIC_CSV),
        ("Car Crashes", CAR_CRASHES_CSV),
    ];
}

impl DatasetProvider for BuiltinCatalog {
    fn list(&self) -> Vec<String> {
        Self::ENTRIES.iter().map(|(name, _)| name.to_string()).collect()
    }

    fn load(&self, name: &str) -> LabResult<Table> {
        let (_, csv) = Self::ENTRIES
            .iter()
            .find(|(n, _)| *n == name)
            .ok_or_else(|| self.unknown(name))?;
        Table::from_csv_str(csv)
    }
}

/// Every `*.csv` file in a directory, named by file stem
#[derive(Debug, Clone)]
pub struct DirectoryCatalog {
    dir: PathBuf,
}

impl DirectoryCatalog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entries(&self) -> Vec<(String, PathBuf)> {
        let read_dir = match fs::read_dir(&self.dir) {
            Ok(rd) => rd,
            Err(e) => {
                tracing::warn!("Cannot read dataset directory {:?}: {}", self.dir, e);
                return Vec::new();
            }
        };

        let mut entries: Vec<(String, PathBuf)> = read_dir
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.extension()
                    .map(|ext| ext.eq_ignore_ascii_case("csv"))
                    .unwrap_or(false)
            })
            .filter_map(|path| {
                let stem = path.file_stem()?.to_str()?.to_string();
                Some((stem, path))
            })
            .collect();

        // directory order is platform dependent
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }
}

impl DatasetProvider for DirectoryCatalog {
    fn list(&self) -> Vec<String> {
        self.entries().into_iter().map(|(name, _)| name).collect()
    }

    fn load(&self, name: &str) -> LabResult<Table> {
        let (_, path) = self
            .entries()
            .into_iter()
            .find(|(n, _)| n == name)
            .ok_or_else(|| self.unknown(name))?;
        let file = fs::File::open(&path)?;
        Table::from_csv_reader(file)
    }
}

/// Several providers queried in order; earlier providers win on name clashes
pub struct Catalog {
    providers: Vec<Box<dyn DatasetProvider>>,
}

impl Catalog {
    pub fn new(providers: Vec<Box<dyn DatasetProvider>>) -> Self {
        Self { providers }
    }

    /// Built-in tables, plus a CSV directory when one is given
    pub fn with_directory(dir: Option<&Path>) -> Self {
        let mut providers: Vec<Box<dyn DatasetProvider>> = vec![Box::new(BuiltinCatalog)];
        if let Some(dir) = dir {
            providers.push(Box::new(DirectoryCatalog::new(dir)));
        }
        Self::new(providers)
    }
}

impl DatasetProvider for Catalog {
    fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for provider in &self.providers {
            for name in provider.list() {
                if !names.contains(&name) {
                    names.push(name);
                }
            }
        }
        names
    }

    fn load(&self, name: &str) -> LabResult<Table> {
        for provider in &self.providers {
            if provider.contains(name) {
                return provider.load(name);
            }
        }
        Err(self.unknown(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::ColumnKind;

    #[test]
    fn test_builtin_list_order() {
        assert_eq!(
            BuiltinCatalog.list(),
            vec![
                "Tips",
                "Penguins",
                "Flights",
                "Iris",
                "Diamonds (1K sample)",
                "Titanic",
                "Car Crashes"
            ]
        );
    }

    #[test]
    fn test_builtin_tables_load() {
        let expected = [
            ("Tips", 244, 7),
            ("Penguins", 344, 7),
            ("Flights", 144, 3),
            ("Iris", 150, 5),
            ("Diamonds (1K sample)", 1000, 10),
            ("Titanic", 891, 15),
            ("Car Crashes", 51, 8),
        ];
        for (name, rows, columns) in expected {
            let table = BuiltinCatalog.load(name).unwrap();
            assert_eq!((table.row_count(), table.column_count()), (rows, columns), "{}", name);
        }
    }

    #[test]
    fn test_builtin_iris() {
        let table = BuiltinCatalog.load("Iris").unwrap();
        assert_eq!(table.column("species").unwrap().kind(), ColumnKind::Categorical);
        assert_eq!(table.column("petal_width").unwrap().kind(), ColumnKind::Numeric);
    }

    #[test]
    fn test_builtin_flights() {
        let table = BuiltinCatalog.load("Flights").unwrap();
        assert_eq!(table.column("month").unwrap().kind(), ColumnKind::Categorical);
        assert_eq!(table.column("year").unwrap().kind(), ColumnKind::Numeric);
    }

    #[test]
    fn test_builtin_missing_values() {
        let titanic = BuiltinCatalog.load("Titanic").unwrap();
        assert_eq!(titanic.column("age").unwrap().kind(), ColumnKind::Numeric);
        assert_eq!(titanic.column("age").unwrap().missing_count(), 177);
        assert_eq!(titanic.column("embark_town").unwrap().missing_count(), 2);
        assert_eq!(titanic.column("alive").unwrap().kind(), ColumnKind::Categorical);

        let penguins = BuiltinCatalog.load("Penguins").unwrap();
        assert_eq!(penguins.column("body_mass_g").unwrap().missing_count(), 2);
        assert_eq!(penguins.column("sex").unwrap().missing_count(), 11);
        assert_eq!(penguins.drop_missing(&["body_mass_g", "sex"]).row_count(), 333);

        let tips = BuiltinCatalog.load("Tips").unwrap();
        assert!(tips.columns().iter().all(|c| c.missing_count() == 0));
    }

    #[test]
    fn test_unknown_dataset() {
        let err = BuiltinCatalog.load("Planets").unwrap_err();
        assert!(matches!(err, LabError::UnknownDataset { ref name, .. } if name == "Planets"));
    }

    #[test]
    fn test_directory_catalog() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("scores.csv"), "name,score\na,1\nb,2\n").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let catalog = DirectoryCatalog::new(dir.path());
        assert_eq!(catalog.list(), vec!["scores"]);
        assert_eq!(catalog.load("scores").unwrap().row_count(), 2);
        assert!(catalog.load("notes").is_err());
    }

    #[test]
    fn test_layered_catalog() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("extra.csv"), "v\n1\n").unwrap();
        fs::write(dir.path().join("Tips.csv"), "total_bill,tip\n10,1\n20,3\n").unwrap();
        fs::write(dir.path().join("tips.csv"), "total_bill,tip\n10,1\n").unwrap();

        let catalog = Catalog::with_directory(Some(dir.path()));
        let names = catalog.list();
        assert_eq!(names.len(), 9);
        assert_eq!(names[0], "Tips");
        assert_eq!(names[7..], ["extra", "tips"]);
        assert_eq!(catalog.load("extra").unwrap().row_count(), 1);
        // built-ins win on a name clash
        assert_eq!(catalog.load("Tips").unwrap().row_count(), 244);
        assert_eq!(catalog.load("tips").unwrap().row_count(), 1);
        assert_eq!(catalog.load("Iris").unwrap().row_count(), 150);

        let empty = Catalog::new(Vec::new());
        assert!(empty.list().is_empty());
        assert!(matches!(empty.load("Tips"), Err(LabError::UnknownDataset { .. })));
    }
}
