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

use proptest::prelude::*;
use std::collections::HashSet;
use vista::data_handler::{
    aggregate, filter, group_by, join, load_csv_str, top_n, AggregateFunction, AggregateOperation,
    CategoryMatch, DataType, Filter, GroupByOperation, Table, TableSchema, Value,
};
use vista::SchemaError;

fn visa_schema() -> TableSchema {
    TableSchema::new()
        .key("country", DataType::String)
        .key("year", DataType::Int64)
        .feature("visas_issued", DataType::Float64)
}

fn visa_table(csv: &str) -> Table {
    load_csv_str(csv, "visas".to_string(), visa_schema())
        .unwrap()
        .table
}

fn scenario_table() -> Table {
    visa_table("country,year,visas_issued\nDE,2015,100\nDE,2016,150\n")
}

#[test]
fn test_year_range_selects_second_row() {
    let table = scenario_table();
    let filtered = filter(&table, &Filter::new().range("year", 2016.0, 2016.0)).unwrap();
    assert_eq!(filtered.row_count(), 1);
    assert_eq!(filtered.value(0, "year").unwrap(), Value::Int(2016));
    assert_eq!(filtered.value(0, "visas_issued").unwrap(), Value::Float(150.0));
    let medians = aggregate(&filtered, "country", "visas_issued", AggregateFunction::Median).unwrap();
    assert_eq!(medians.row_count(), 1);
    assert_eq!(medians.column_names(), ["country".to_string(), "visas_issued".to_string()]);
    assert_eq!(medians.value(0, "country").unwrap().to_string(), "DE");
    assert_eq!(medians.value(0, "visas_issued").unwrap(), Value::Float(150.0));
}

#[test]
fn test_median_over_even_group_averages_middle_values() {
    let table = visa_table("country,year,visas_issued\nDE,2015,100\nDE,2016,150\nFR,2015,80\nFR,2016,90\nFR,2017,10\n");
    let medians = aggregate(&table, "country", "visas_issued", AggregateFunction::Median).unwrap();
    assert_eq!(medians.value(0, "visas_issued").unwrap(), Value::Float(125.0));
    assert_eq!(medians.value(1, "country").unwrap().to_string(), "FR");
    assert_eq!(medians.value(1, "visas_issued").unwrap(), Value::Float(80.0));
}

#[test]
fn test_count_mean_and_sum_aggregations() {
    let table = visa_table("country,year,visas_issued\nDE,2015,100\nDE,2016,\nFR,2015,80\n");
    let grouped = group_by(
        &table,
        &GroupByOperation {
            group_columns: vec!["country".to_string()],
            aggregations: vec![
                AggregateOperation::new("visas_issued", AggregateFunction::Count).alias("n"),
                AggregateOperation::new("visas_issued", AggregateFunction::Mean).alias("mean"),
                AggregateOperation::new("visas_issued", AggregateFunction::Sum).alias("sum"),
            ],
        },
    )
    .unwrap();
    assert_eq!(grouped.row_count(), 2);
    assert_eq!(grouped.value(0, "n").unwrap(), Value::Int(1));
    assert_eq!(grouped.value(0, "mean").unwrap(), Value::Float(100.0));
    assert_eq!(grouped.value(1, "sum").unwrap(), Value::Float(80.0));
}

#[test]
fn test_all_wildcard_keeps_every_row() {
    let table = scenario_table();
    let all = Filter::new().equals("country", CategoryMatch::All);
    assert_eq!(filter(&table, &all).unwrap(), table);
    let label = Filter::new().equals_or_all("country", "All countries", "All countries");
    assert_eq!(filter(&table, &label).unwrap().row_count(), 2);
}

#[test]
fn test_empty_filter_result_is_valid_table() {
    let table = scenario_table();
    let filtered = filter(
        &table,
        &Filter::new().equals("country", CategoryMatch::Value("FR".to_string())),
    )
    .unwrap();
    assert!(filtered.is_empty());
    assert_eq!(filtered.column_names(), table.column_names());
    let medians = aggregate(&filtered, "country", "visas_issued", AggregateFunction::Median).unwrap();
    assert!(medians.is_empty());
}

#[test]
fn test_unknown_column_is_schema_error() {
    let table = scenario_table();
    let err = filter(&table, &Filter::new().range("population", 0.0, 1.0)).unwrap_err();
    assert_eq!(
        err,
        SchemaError::UnknownColumn {
            column: "population".to_string()
        }
    );
    assert!(matches!(
        aggregate(&table, "region", "visas_issued", AggregateFunction::Median),
        Err(SchemaError::UnknownColumn { .. })
    ));
    assert!(matches!(top_n(&table, "rank", 3, true), Err(SchemaError::UnknownColumn { .. })));
}

#[test]
fn test_range_on_text_column_is_type_mismatch() {
    let table = scenario_table();
    assert!(matches!(
        filter(&table, &Filter::new().range("country", 0.0, 1.0)),
        Err(SchemaError::TypeMismatch { .. })
    ));
}

#[test]
fn test_equality_on_numeric_column() {
    let table = scenario_table();
    let filtered = filter(
        &table,
        &Filter::new().equals("year", CategoryMatch::Value("2015".to_string())),
    )
    .unwrap();
    assert_eq!(filtered.row_count(), 1);
    assert_eq!(filtered.value(0, "visas_issued").unwrap(), Value::Float(100.0));
}

#[test]
fn test_left_join_keeps_left_rows() {
    let left = scenario_table();
    let right = load_csv_str(
        "country,region\nDE,Central\n",
        "regions".to_string(),
        TableSchema::new().key("country", DataType::String),
    )
    .unwrap()
    .table;
    let joined = join(&left, &right, "country").unwrap();
    assert_eq!(joined.row_count(), 2);
    assert_eq!(joined.value(1, "region").unwrap().to_string(), "Central");

    let other = visa_table("country,year,visas_issued\nFR,2015,1\n");
    let unmatched = join(&other, &right, "country").unwrap();
    assert_eq!(unmatched.value(0, "region").unwrap(), Value::Null);
}

#[test]
fn test_top_n_keeps_nulls_last() {
    let table = visa_table("country,year,visas_issued\nAT,2015,\nBE,2015,5\nCZ,2015,3\n");
    let ascending = top_n(&table, "visas_issued", 3, true).unwrap();
    let descending = top_n(&table, "visas_issued", 3, false).unwrap();
    assert_eq!(ascending.value(2, "country").unwrap().to_string(), "AT");
    assert_eq!(descending.value(0, "country").unwrap().to_string(), "BE");
    assert_eq!(descending.value(2, "visas_issued").unwrap(), Value::Null);
}

const COUNTRIES: [&str; 3] = ["AT", "BE", "CZ"];

fn csv_from(rows: &[(usize, i64, u32)]) -> String {
    let mut csv = String::from("country,year,visas_issued\n");
    for (country, year, issued) in rows {
        csv.push_str(&format!("{},{year},{issued}\n", COUNTRIES[*country]));
    }
    csv
}

proptest! {
    #[test]
    fn test_filter_returns_exactly_matching_rows(
        rows in prop::collection::vec((0usize..3, 2010i64..2020, 0u32..1000), 0..40),
        country in prop::option::of(0usize..3),
        lo in 2010i64..2020,
        span in 0i64..6,
    ) {
        let hi = lo + span;
        let table = visa_table(&csv_from(&rows));
        let matcher = country.map_or(CategoryMatch::All, |c| CategoryMatch::Value(COUNTRIES[c].to_string()));
        let predicates = Filter::new().equals("country", matcher).range("year", lo as f64, hi as f64);
        let filtered = filter(&table, &predicates).unwrap();
        let expected: Vec<&(usize, i64, u32)> = rows
            .iter()
            .filter(|(c, y, _)| country.map_or(true, |want| want == *c) && *y >= lo && *y <= hi)
            .collect();
        prop_assert_eq!(filtered.row_count(), expected.len());
        for (row, (c, y, issued)) in expected.into_iter().enumerate() {
            prop_assert_eq!(filtered.value(row, "country").unwrap().to_string(), COUNTRIES[*c]);
            prop_assert_eq!(filtered.value(row, "year").unwrap(), Value::Int(*y));
            prop_assert_eq!(filtered.value(row, "visas_issued").unwrap(), Value::Float(f64::from(*issued)));
        }
    }

    #[test]
    fn test_top_n_orders_by_flag_and_halves_are_disjoint(
        values in Just((0u32..25).collect::<Vec<_>>()).prop_shuffle(),
    ) {
        let mut csv = String::from("country,year,visas_issued\n");
        for (i, v) in values.iter().enumerate() {
            csv.push_str(&format!("C{i:02},2015,{v}\n"));
        }
        let table = visa_table(&csv);
        let ascending = top_n(&table, "visas_issued", 10, true).unwrap();
        let descending = top_n(&table, "visas_issued", 10, false).unwrap();
        let up: Vec<f64> = ascending.numeric_values("visas_issued").unwrap().into_iter().flatten().collect();
        let down: Vec<f64> = descending.numeric_values("visas_issued").unwrap().into_iter().flatten().collect();
        prop_assert_eq!(up.len(), 10);
        prop_assert_eq!(down.len(), 10);
        prop_assert!(up.windows(2).all(|w| w[0] <= w[1]));
        prop_assert!(down.windows(2).all(|w| w[0] >= w[1]));
        let low: HashSet<String> = ascending.distinct_values("country").unwrap().into_iter().collect();
        let high: HashSet<String> = descending.distinct_values("country").unwrap().into_iter().collect();
        prop_assert!(low.is_disjoint(&high));
    }
}
