// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2024 Jonathan Lee
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License version 3
// as published by the Free Software Foundation.
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.
// See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see https://www.gnu.org/licenses/.

use std::path::PathBuf;
use std::sync::Arc;
use vista::dashboard::{bluecard, schengen};
use vista::data_handler::Value;
use vista::{BluecardLayout, ControlDomain, ControlValue, Dashboard, Figure, OutputState, SchengenLayout, Variant};

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)
}

fn schengen_dashboard() -> Arc<Dashboard> {
    let dashboard = Variant::Schengen
        .load(
            &fixture("schengen_sample.csv"),
            &SchengenLayout::default(),
            &BluecardLayout::default(),
        )
        .unwrap();
    Arc::new(dashboard)
}

fn bluecard_dashboard() -> Arc<Dashboard> {
    let dashboard = Variant::Bluecard
        .load(
            &fixture("talent_bluecard.csv"),
            &SchengenLayout::default(),
            &BluecardLayout::default(),
        )
        .unwrap();
    Arc::new(dashboard)
}

fn bar_categories(figure: &Figure) -> Vec<String> {
    match figure {
        Figure::Bar { categories, .. } => categories.clone(),
        other => panic!("expected bar figure, got {other:?}"),
    }
}

#[test]
fn test_rows_without_schengen_country_are_dropped() {
    let dashboard = schengen_dashboard();
    assert_eq!(dashboard.table().row_count(), 16);
    assert!(!dashboard
        .table()
        .distinct_values("Country code")
        .unwrap()
        .contains(&"USA".to_string()));
}

#[test]
fn test_schengen_controls_derive_from_data() {
    let dashboard = schengen_dashboard();
    let controls = dashboard.controls();
    assert_eq!(
        controls.control(schengen::SCHENGEN_COUNTRY).unwrap().domain,
        ControlDomain::Options {
            options: vec!["All countries".to_string(), "France".to_string(), "Germany".to_string()]
        }
    );
    assert_eq!(
        controls.control(schengen::FEATURE_1).unwrap().domain,
        ControlDomain::Options {
            options: vec![
                "Number of visa applications".to_string(),
                "Visas denied".to_string(),
                "Visas issued".to_string(),
            ]
        }
    );
    assert_eq!(controls.get(schengen::YEAR_RANGE).unwrap(), &ControlValue::range(2017, 2018));
    assert_eq!(controls.get(schengen::ORDER_TOGGLE).unwrap(), &ControlValue::Toggle(true));
    assert_eq!(controls.get(schengen::MAP_HOVER).unwrap(), &ControlValue::choice("CHN"));
}

#[test]
fn test_toggle_inverts_bar_order() {
    let dashboard = schengen_dashboard();
    let mut session = dashboard.session();
    session.set(schengen::FEATURE_1, ControlValue::choice("Visas issued")).unwrap();
    let ascending = bar_categories(&session.read(schengen::BARPLOT).unwrap());
    assert_eq!(ascending, ["Turkey", "India", "China", "Russia"]);

    session.set(schengen::ORDER_TOGGLE, ControlValue::Toggle(false)).unwrap();
    let descending = bar_categories(&session.read(schengen::BARPLOT).unwrap());
    let mut reversed = ascending.clone();
    reversed.reverse();
    assert_eq!(descending, reversed);
}

#[test]
fn test_barplot_uses_median_per_country() {
    let dashboard = schengen_dashboard();
    let mut session = dashboard.session();
    session.set(schengen::FEATURE_1, ControlValue::choice("Visas issued")).unwrap();
    match session.read(schengen::BARPLOT).unwrap().as_ref() {
        Figure::Bar { values, y_label, .. } => {
            assert_eq!(y_label, "Visas issued");
            assert_eq!(values, &[Some(42.5), Some(62.5), Some(160.0), Some(220.0)]);
        }
        other => panic!("unexpected figure {other:?}"),
    }
}

#[test]
fn test_schengen_and_year_filters_apply_to_bars() {
    let dashboard = schengen_dashboard();
    let mut session = dashboard.session();
    session.set(schengen::FEATURE_1, ControlValue::choice("Visas issued")).unwrap();
    session.set(schengen::SCHENGEN_COUNTRY, ControlValue::choice("Germany")).unwrap();
    session.set(schengen::YEAR_RANGE, ControlValue::range(2018, 2018)).unwrap();
    session.set(schengen::ORDER_TOGGLE, ControlValue::Toggle(false)).unwrap();
    match session.read(schengen::BARPLOT).unwrap().as_ref() {
        Figure::Bar { categories, values, .. } => {
            assert_eq!(categories, &["Russia", "China", "India", "Turkey"]);
            assert_eq!(values, &[Some(280.0), Some(120.0), Some(90.0), Some(60.0)]);
        }
        other => panic!("unexpected figure {other:?}"),
    }
}

#[test]
fn test_toggle_label_reports_state() {
    let dashboard = schengen_dashboard();
    let mut session = dashboard.session();
    assert_eq!(*session.read(schengen::TOGGLE_LABEL).unwrap(), Figure::text("Change order: True."));
    session.set(schengen::ORDER_TOGGLE, ControlValue::Toggle(false)).unwrap();
    assert_eq!(*session.read(schengen::TOGGLE_LABEL).unwrap(), Figure::text("Change order: False."));
}

#[test]
fn test_worldmap_rounds_values_and_builds_hover_text() {
    let dashboard = schengen_dashboard();
    let mut session = dashboard.session();
    session.set(schengen::SCHENGEN_COUNTRY, ControlValue::choice("France")).unwrap();
    session.set(schengen::YEAR_RANGE, ControlValue::range(2017, 2017)).unwrap();
    match session.read(schengen::WORLDMAP).unwrap().as_ref() {
        Figure::Choropleth {
            title,
            locations,
            hover_text,
            ..
        } => {
            assert_eq!(title, "Number of visa applications");
            assert_eq!(locations, &["CHN", "IND", "RUS", "TUR"]);
            assert_eq!(hover_text[0], "Feature: Number of visa applications<br>Country: China");
        }
        other => panic!("unexpected figure {other:?}"),
    }
}

#[test]
fn test_hover_moves_bubble_highlight_and_line_series() {
    let dashboard = schengen_dashboard();
    let mut session = dashboard.session();
    session.refresh();
    let stale = session.set(schengen::MAP_HOVER, ControlValue::choice("RUS")).unwrap();
    assert_eq!(stale, vec![schengen::BUBBLE_PLOT.to_string(), schengen::LINE_PLOT.to_string()]);
    assert_eq!(session.state(schengen::WORLDMAP).unwrap(), OutputState::Fresh);
    assert_eq!(session.state(schengen::BARPLOT).unwrap(), OutputState::Fresh);

    match session.read(schengen::BUBBLE_PLOT).unwrap().as_ref() {
        Figure::Scatter { points, size_label, .. } => {
            assert_eq!(points.len(), 16);
            assert_eq!(size_label.as_deref(), Some("Number of visa applications"));
            assert!(points.iter().filter(|p| p.highlighted).all(|p| p.label == "Russia"));
            assert_eq!(points.iter().filter(|p| p.highlighted).count(), 4);
        }
        other => panic!("unexpected figure {other:?}"),
    }
    match session.read(schengen::LINE_PLOT).unwrap().as_ref() {
        Figure::Line { x, x_range, .. } => {
            assert_eq!(x, &[Some(2017.0), Some(2017.0), Some(2018.0), Some(2018.0)]);
            assert_eq!(*x_range, Some((2017.0, 2018.0)));
        }
        other => panic!("unexpected figure {other:?}"),
    }
}

#[test]
fn test_line_plot_keeps_full_year_axis_when_filtered() {
    let dashboard = schengen_dashboard();
    let mut session = dashboard.session();
    session.set(schengen::YEAR_RANGE, ControlValue::range(2018, 2018)).unwrap();
    match session.read(schengen::LINE_PLOT).unwrap().as_ref() {
        Figure::Line { x, x_range, .. } => {
            assert_eq!(x.len(), 2);
            assert_eq!(*x_range, Some((2017.0, 2018.0)));
        }
        other => panic!("unexpected figure {other:?}"),
    }
}

#[test]
fn test_bluecard_table_is_aggregated_per_nationality() {
    let dashboard = bluecard_dashboard();
    let table = dashboard.table();
    assert_eq!(table.row_count(), 3);
    assert_eq!(table.value(0, "nationality_country").unwrap().to_string(), "Brazil");
    assert_eq!(table.value(0, "age").unwrap(), Value::Float(30.0));
    assert_eq!(table.value(0, "duration_days").unwrap(), Value::Float(45.0));
    assert_eq!(table.value(1, "salary").unwrap(), Value::Float(60000.0));
    assert_eq!(table.value(1, "total_clients").unwrap(), Value::Int(3));
    assert_eq!(table.value(2, "total_clients").unwrap(), Value::Int(1));
}

#[test]
fn test_bluecard_controls_and_bubbleplot() {
    let dashboard = bluecard_dashboard();
    assert_eq!(dashboard.controls().get(bluecard::FEATURE).unwrap(), &ControlValue::choice("age"));
    assert_eq!(
        dashboard.controls().get(bluecard::COUNTRY).unwrap(),
        &ControlValue::choice("All countries")
    );
    let mut session = dashboard.session();
    match session.read(bluecard::BUBBLEPLOT).unwrap().as_ref() {
        Figure::Scatter { points, x_label, y_label, .. } => {
            assert_eq!(x_label, "age");
            assert_eq!(y_label, "duration_days");
            let sizes: Vec<Option<f64>> = points.iter().map(|p| p.size).collect();
            assert_eq!(sizes, vec![Some(2.0), Some(3.0), Some(1.0)]);
        }
        other => panic!("unexpected figure {other:?}"),
    }
    session.set(bluecard::COUNTRY, ControlValue::choice("India")).unwrap();
    session.set(bluecard::FEATURE, ControlValue::choice("salary")).unwrap();
    match session.read(bluecard::BUBBLEPLOT).unwrap().as_ref() {
        Figure::Scatter { points, .. } => {
            assert_eq!(points.len(), 1);
            assert_eq!(points[0].label, "India");
            assert_eq!(points[0].x, Some(60000.0));
            assert_eq!(points[0].y, Some(25.0));
        }
        other => panic!("unexpected figure {other:?}"),
    }
}

#[test]
fn test_variant_parsing() {
    assert_eq!("schengen".parse::<Variant>().unwrap(), Variant::Schengen);
    assert_eq!("Bluecard".parse::<Variant>().unwrap(), Variant::Bluecard);
    assert!("eurostat".parse::<Variant>().is_err());
}
