use chrono::{Local, TimeZone};
use plotlab::stats::aggregate_by;
use plotlab::transform::build_figure;
use plotlab::{
    execute_listing, render, Aggregate, BuiltinCatalog, CategoryKind, Column, DatasetProvider, DistributionKind,
    LabConfig, LabError, PlotRequest, RelationshipKind, Session, StyleOptions, Table, DEFAULT_SEED,
};
use proptest::prelude::*;
use std::fs;
use std::io::{Cursor, Read};
use std::process::Command;

/// Check if bytes are a valid PNG
fn is_valid_png(bytes: &[u8]) -> bool {
    bytes.len() > 8 && bytes[0..8] == [137, 80, 78, 71, 13, 10, 26, 10]
}

fn small_style() -> StyleOptions {
    StyleOptions::default().with_dpi(72)
}

fn iris() -> Table {
    BuiltinCatalog.load("Iris").unwrap()
}

fn plotlab() -> Command {
    Command::new(env!("CARGO_BIN_EXE_plotlab"))
}

// =============================================================================
// Render engine
// =============================================================================

#[test]
fn test_repeated_renders_are_byte_identical() {
    let requests = vec![
        PlotRequest::distribution("sepal_length", DistributionKind::HistogramKde).with_hue("species"),
        PlotRequest::relationship("sepal_length", "petal_length", RelationshipKind::Regression),
        PlotRequest::category("species", CategoryKind::Count),
        PlotRequest::matrix(["sepal_length", "sepal_width", "petal_length"]),
        PlotRequest::pairplot(["sepal_length", "petal_width"]).with_hue("species"),
    ];
    let table = iris();
    for request in requests {
        let a = render(&table, &request, &small_style(), DEFAULT_SEED).unwrap();
        let b = render(&table, &request, &small_style(), DEFAULT_SEED).unwrap();
        assert!(is_valid_png(a.artifact.png()));
        assert_eq!(a.artifact.png(), b.artifact.png(), "{}", a.title);
    }
}

#[test]
fn test_scatter_scenario_and_listing_reexecution() {
    let table = Table::new(vec![
        Column::numeric("x", vec![Some(1.0), Some(2.0), Some(3.0)]),
        Column::numeric("y", vec![Some(2.0), Some(4.0), Some(6.0)]),
        Column::categorical("g", vec![Some("A"), Some("B"), Some("A")]),
    ])
    .unwrap();
    let request = PlotRequest::relationship("x", "y", RelationshipKind::Scatter).with_hue("g");

    let figure = build_figure(&table, &request, DEFAULT_SEED).unwrap();
    assert_eq!(figure.panels[0].points_for_series(0).len(), 2);
    assert_eq!(figure.panels[0].points_for_series(1).len(), 1);

    let rendered = render(&table, &request, &small_style(), DEFAULT_SEED).unwrap();
    assert!(rendered.listing.as_str().contains(r#"scatter(x: "x", y: "y", hue: "g", alpha: 0.7, size: 70)"#));

    let again = execute_listing(&table, rendered.listing.as_str(), DEFAULT_SEED).unwrap();
    assert_eq!(again.artifact.png(), rendered.artifact.png());
    assert_eq!(again.listing, rendered.listing);
}

#[test]
fn test_missing_values_are_dropped_not_imputed() {
    let values: Vec<Option<f64>> = (0..100).map(|i| if i < 3 { None } else { Some(i as f64) }).collect();
    let table = Table::new(vec![Column::numeric("v", values)]).unwrap();
    let rendered = render(
        &table,
        &PlotRequest::distribution("v", DistributionKind::Histogram),
        &small_style(),
        DEFAULT_SEED,
    )
    .unwrap();
    assert_eq!(rendered.rows_used, 97);
    assert_eq!(table.row_count(), 100);
}

#[test]
fn test_style_does_not_change_rows() {
    let table = iris();
    let request = PlotRequest::pairplot(["sepal_length", "sepal_width"]);
    let light = render(&table, &request, &small_style(), DEFAULT_SEED).unwrap();
    let dark_style = StyleOptions {
        dark_mode: true,
        ..small_style()
    };
    let dark = render(&table, &request, &dark_style, DEFAULT_SEED).unwrap();
    assert_eq!(light.rows_used, dark.rows_used);
    assert_ne!(light.artifact.png(), dark.artifact.png());
}

#[test]
fn test_invalid_requests_are_configuration_errors() {
    let table = iris();
    let bad = [
        PlotRequest::distribution("species", DistributionKind::Histogram),
        PlotRequest::relationship("sepal_length", "sepal_length", RelationshipKind::Scatter),
        PlotRequest::matrix(["sepal_length"]),
        PlotRequest::category("sepal_length", CategoryKind::Count),
    ];
    for request in bad {
        let err = render(&table, &request, &small_style(), DEFAULT_SEED).unwrap_err();
        assert!(matches!(err, LabError::Configuration { .. }), "{:?}", err);
    }
}

// =============================================================================
// Session, gallery and export
// =============================================================================

#[test]
fn test_session_gallery_archive_names() {
    let config = LabConfig {
        export_dpi: 72,
        ..LabConfig::default()
    };
    let mut session = Session::new(config);
    session.select_dataset("Iris").unwrap();

    for (name, column) in [("A", "sepal_length"), ("A", "sepal_width"), ("B plot", "petal_length")] {
        let rendered = session
            .render(&PlotRequest::distribution(column, DistributionKind::Kde))
            .unwrap();
        session.save(rendered, name, None);
    }
    let names: Vec<&str> = session.gallery().iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["A", "A", "B plot"]);

    let now = Local.with_ymd_and_hms(2024, 2, 3, 4, 5, 6).unwrap();
    let archive = session.export_gallery(now).unwrap();
    assert_eq!(archive.filename, "gallery_20240203_040506.zip");

    let mut zip = zip::ZipArchive::new(Cursor::new(archive.bytes)).unwrap();
    let entry_names: Vec<String> = (0..zip.len())
        .map(|i| zip.by_index(i).unwrap().name().to_string())
        .collect();
    assert_eq!(entry_names, vec!["01_A.png", "02_A.png", "03_B_plot.png"]);

    let mut first = Vec::new();
    zip.by_index(0).unwrap().read_to_end(&mut first).unwrap();
    assert_eq!(first, session.gallery()[0].artifact.png());

    session.clear_gallery();
    assert!(session.gallery().is_empty());
    assert!(matches!(session.export_gallery(now), Err(LabError::EmptyInput { .. })));
}

// =============================================================================
// Properties
// =============================================================================

fn category_strategy() -> impl Strategy<Value = Vec<(u8, Option<f64>)>> {
    prop::collection::vec((0u8..6, prop::option::weighted(0.8, -100.0f64..100.0)), 1..60)
}

proptest! {
    #[test]
    fn prop_aggregates_match_direct_computation(rows in category_strategy()) {
        let present: Vec<(String, f64)> = rows
            .iter()
            .filter_map(|(c, v)| v.map(|v| (format!("c{}", c), v)))
            .collect();
        prop_assume!(!present.is_empty());
        let cats: Vec<&str> = present.iter().map(|(c, _)| c.as_str()).collect();
        let values: Vec<f64> = present.iter().map(|(_, v)| *v).collect();

        for agg in Aggregate::ALL {
            let result = aggregate_by(&cats, &values, agg);
            for window in result.windows(2) {
                prop_assert!(window[0].1 <= window[1].1);
            }
            for (key, got) in &result {
                let group: Vec<f64> = present.iter().filter(|(c, _)| c == key).map(|(_, v)| *v).collect();
                let expected = match agg {
                    Aggregate::Mean => group.iter().sum::<f64>() / group.len() as f64,
                    Aggregate::Sum => group.iter().sum::<f64>(),
                    Aggregate::Count => group.len() as f64,
                };
                prop_assert!((got - expected).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn prop_top_n_keeps_most_frequent(codes in prop::collection::vec(0u8..8, 1..80), n in 1usize..6) {
        let labels: Vec<Option<String>> = codes.iter().map(|c| Some(format!("k{}", c))).collect();
        let table = Table::new(vec![Column::categorical("k", labels.clone())]).unwrap();
        let top = table.top_categories("k", n).unwrap();

        let distinct = table.value_counts("k").unwrap();
        prop_assert_eq!(top.len(), n.min(distinct.len()));

        let count = |name: &str| labels.iter().filter(|l| l.as_deref() == Some(name)).count();
        let first_seen = |name: &str| labels.iter().position(|l| l.as_deref() == Some(name)).unwrap_or(usize::MAX);
        for kept in &top {
            for (other, _) in &distinct {
                if top.contains(other) {
                    continue;
                }
                let (a, b) = (count(kept), count(other));
                prop_assert!(a > b || (a == b && first_seen(kept) < first_seen(other)));
            }
        }

        let filtered = table.filter_top_n("k", n).unwrap();
        let expected_rows: usize = top.iter().map(|t| count(t)).sum();
        prop_assert_eq!(filtered.row_count(), expected_rows);
    }
}

// =============================================================================
// Command line
// =============================================================================

#[test]
fn test_cli_lists_datasets() {
    let output = plotlab().arg("datasets").output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(
        stdout.lines().collect::<Vec<_>>(),
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
fn test_cli_describe_json() {
    let output = plotlab().args(["describe", "Iris", "--json"]).output().unwrap();
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["dataset"], "Iris");
    assert_eq!(json["summary"]["rows"], 150);
    assert_eq!(json["summary"]["categorical"][0], "species");
}

#[test]
fn test_cli_render_to_file_and_listing_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let png = dir.path().join("chart.png");
    let listing = dir.path().join("chart.plot");

    let output = plotlab()
        .args(["render", "--dataset", "Iris", "--dpi", "72", "--listing"])
        .arg(r#"df | scatter(x: "sepal_length", y: "petal_length", hue: "species")"#)
        .arg("--output")
        .arg(&png)
        .arg("--listing-out")
        .arg(&listing)
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let first = fs::read(&png).unwrap();
    assert!(is_valid_png(&first));

    let text = fs::read_to_string(&listing).unwrap();
    assert!(text.contains("dpi: 72"));
    let output = plotlab()
        .args(["render", "--dataset", "Iris", "--listing-file"])
        .arg(&listing)
        .output()
        .unwrap();
    assert!(output.status.success());
    assert_eq!(output.stdout, first);
}

#[test]
fn test_cli_reports_bad_listing() {
    let output = plotlab()
        .args(["render", "--dataset", "Iris", "--listing", r#"df | swarm(x: "sepal_length")"#])
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("swarm"));

    let output = plotlab()
        .args(["render", "--dataset", "Tips", "--listing", r#"df | kde(x: "a")"#])
        .output()
        .unwrap();
    assert!(!output.status.success());

    let output = plotlab()
        .args(["render", "--dataset", "Planets", "--listing", r#"df | kde(x: "a")"#])
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Planets"));
}

fn png_width(bytes: &[u8]) -> u32 {
    u32::from_be_bytes([bytes[16], bytes[17], bytes[18], bytes[19]])
}

fn render_stdout(args: &[&str], listing: &str) -> Vec<u8> {
    let output = plotlab()
        .args(["render", "--dataset", "Iris", "--listing", listing])
        .args(args)
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    output.stdout
}

#[test]
fn test_cli_dpi_override() {
    let listing = r#"df | histogram(x: "petal_length")"#;
    let low = render_stdout(&["--dpi", "72"], listing);
    let high = render_stdout(&["--dpi", "144"], listing);
    assert!(is_valid_png(&low) && is_valid_png(&high));
    assert_eq!(png_width(&high), 2 * png_width(&low));

    let output = plotlab()
        .args(["render", "--dataset", "Iris", "--dpi", "5000", "--listing", listing])
        .output()
        .unwrap();
    assert!(!output.status.success());
}

#[test]
fn test_cli_seed_override_is_recorded() {
    let dir = tempfile::tempdir().unwrap();
    let listing_path = dir.path().join("pairs.plot");
    let listing = r#"df | pairplot(columns: ["sepal_length", "petal_width"], sample: 20)"#;

    let seven = render_stdout(&["--dpi", "72", "--seed", "7"], listing);
    let eight = render_stdout(&["--dpi", "72", "--seed", "8"], listing);
    assert_ne!(seven, eight);
    assert_eq!(render_stdout(&["--dpi", "72", "--seed", "7"], listing), seven);

    let output = plotlab()
        .args(["render", "--dataset", "Iris", "--dpi", "72", "--seed", "7", "--listing", listing])
        .arg("--listing-out")
        .arg(&listing_path)
        .output()
        .unwrap();
    assert!(output.status.success());
    let recorded = fs::read_to_string(&listing_path).unwrap();
    assert!(recorded.contains("seed: 7"), "{}", recorded);

    // the recorded seed beats the command line one
    let output = plotlab()
        .args(["render", "--dataset", "Iris", "--seed", "8", "--listing-file"])
        .arg(&listing_path)
        .output()
        .unwrap();
    assert!(output.status.success());
    assert_eq!(output.stdout, seven);
}

#[test]
fn test_cli_gallery_archive() {
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("flow.plot");
    let second = dir.path().join("by month.plot");
    fs::write(&first, r#"df | lineplot(x: "year", y: "passengers")"#).unwrap();
    fs::write(&second, r#"df | barplot(x: "month", y: "passengers", agg: "sum")"#).unwrap();
    let archive = dir.path().join("out.zip");

    let output = plotlab()
        .args(["gallery", "--dataset", "Flights", "--dpi", "72", "--output"])
        .arg(&archive)
        .arg(&first)
        .arg(&second)
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let zip = zip::ZipArchive::new(Cursor::new(fs::read(&archive).unwrap())).unwrap();
    let names: Vec<&str> = zip.file_names().collect();
    let mut sorted = names.clone();
    sorted.sort();
    assert_eq!(sorted, vec!["01_flow.png", "02_by_month.png"]);
}
