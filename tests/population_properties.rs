//! Property-based tests for population derivations
//!
//! This test suite validates:
//! - Filter idempotence for every split half
//! - Complementary splits partition the defined rows
//! - Significance thresholds are inclusive
//! - Slice semantics (identity, reversal, clipped bounds)
//! - Rejected masks leave the population untouched

use std::collections::BTreeSet;

use proptest::prelude::*;

use exopop::data::filter::{FACILITY_COLUMN, TRANSIT_FLAG_COLUMN};
use exopop::data::model::{Column, Table};
use exopop::{Population, PopulationError, Predicate, SpaceMission, Split};

// ============================================================================
// Helper Functions
// ============================================================================

/// (value, upper uncertainty, lower uncertainty)
type Measured = (Option<f64>, Option<f64>, Option<f64>);

#[derive(Debug, Clone)]
struct Row {
    mass: Measured,
    radius: Measured,
    facility: Option<&'static str>,
    transiting: Option<bool>,
}

const FACILITIES: &[&str] = &[
    "Kepler",
    "K2",
    "Transiting Exoplanet Survey Satellite (TESS)",
    "W. M. Keck Observatory",
    "OGLE",
];

fn measured_columns(name: &str, unit: &str, values: &[Measured]) -> Vec<Column> {
    vec![
        Column::numeric(name, unit, values.iter().map(|m| m.0).collect()),
        Column::numeric(
            format!("{name}_uncertainty_upper"),
            unit,
            values.iter().map(|m| m.1).collect(),
        ),
        Column::numeric(
            format!("{name}_uncertainty_lower"),
            unit,
            values.iter().map(|m| m.2).collect(),
        ),
    ]
}

fn key(i: usize) -> String {
    format!("planet-{i:03}")
}

fn population(rows: &[Row]) -> Population {
    let keys: Vec<String> = (0..rows.len()).map(key).collect();
    let masses: Vec<Measured> = rows.iter().map(|r| r.mass).collect();
    let radii: Vec<Measured> = rows.iter().map(|r| r.radius).collect();

    let mut columns = measured_columns("mass", "earthMass", &masses);
    columns.extend(measured_columns("radius", "earthRad", &radii));
    columns.push(Column::text(
        FACILITY_COLUMN,
        rows.iter().map(|r| r.facility.map(str::to_string)).collect(),
    ));
    columns.push(Column::flag(
        TRANSIT_FLAG_COLUMN,
        rows.iter().map(|r| r.transiting).collect(),
    ));
    Population::new("generated", Table::new(keys, columns).unwrap())
}

fn measured() -> impl Strategy<Value = Measured> {
    (
        prop::option::of(0.01f64..5000.0),
        prop::option::of(0.0f64..500.0),
        prop::option::of(0.0f64..500.0),
    )
}

fn rows() -> impl Strategy<Value = Vec<Row>> {
    prop::collection::vec(
        (
            measured(),
            measured(),
            prop::option::of(prop::sample::select(FACILITIES)),
            prop::option::of(any::<bool>()),
        )
            .prop_map(|(mass, radius, facility, transiting)| Row {
                mass,
                radius,
                facility,
                transiting,
            }),
        0..40,
    )
}

fn splits() -> impl Strategy<Value = Split> {
    prop_oneof![
        (0.0f64..10.0).prop_map(|sigma| Split::Mass { sigma }),
        (0.0f64..10.0).prop_map(|sigma| Split::Radius { sigma }),
        prop::sample::select(vec![SpaceMission::Kepler, SpaceMission::K2, SpaceMission::Tess])
            .prop_map(Split::Mission),
        Just(Split::Space),
        Just(Split::Transiting),
    ]
}

/// Value over mean absolute uncertainty, recomputed from the raw row.
fn significance((value, upper, lower): Measured) -> Option<f64> {
    let value = value?;
    let uncertainty = match (upper, lower) {
        (Some(u), Some(l)) => (u.abs() + l.abs()) / 2.0,
        (Some(u), None) => u.abs(),
        (None, Some(l)) => l.abs(),
        (None, None) => return None,
    };
    Some(if uncertainty == 0.0 { f64::INFINITY } else { value / uncertainty })
}

/// Whether `split` can place the row on either side.
fn is_defined(split: Split, row: &Row) -> bool {
    match split {
        Split::Mass { .. } => significance(row.mass).is_some(),
        Split::Radius { .. } => significance(row.radius).is_some(),
        Split::Mission(_) | Split::Space => row.facility.is_some(),
        Split::Transiting => row.transiting.is_some(),
    }
}

fn keys(population: &Population) -> Vec<String> {
    population.keys().map(str::to_string).collect()
}

fn key_set(population: &Population) -> BTreeSet<String> {
    population.keys().map(str::to_string).collect()
}

// ============================================================================
// Split Properties
// ============================================================================

proptest! {
    #[test]
    fn filter_is_idempotent(rows in rows(), split in splits()) {
        let p = population(&rows);
        for half in [split.positive(), split.negative()] {
            let once = p.filter(&half).unwrap();
            let twice = once.filter(&half).unwrap();
            prop_assert_eq!(once, twice);
        }
    }

    #[test]
    fn complementary_split_partitions_defined_rows(rows in rows(), split in splits()) {
        let p = population(&rows);
        let (positive, negative) = p.split(split).unwrap();

        let positive_keys = key_set(&positive);
        let negative_keys = key_set(&negative);
        prop_assert!(positive_keys.is_disjoint(&negative_keys));

        let defined: BTreeSet<String> = rows
            .iter()
            .enumerate()
            .filter(|(_, row)| is_defined(split, row))
            .map(|(i, _)| key(i))
            .collect();
        let union: BTreeSet<String> = positive_keys.union(&negative_keys).cloned().collect();
        prop_assert_eq!(union, defined);
    }

    #[test]
    fn complement_predicate_matches_negative_half(rows in rows(), split in splits()) {
        let p = population(&rows);
        let negative = p.filter(&split.negative()).unwrap();
        let complement = p.filter(&split.positive().complement()).unwrap();
        prop_assert_eq!(negative, complement);
    }

    #[test]
    fn radius_threshold_is_inclusive(rows in rows(), sigma in 0.0f64..10.0) {
        let p = population(&rows);
        let good = p.filter(&Predicate::good_radius(sigma)).unwrap();
        let bad = p.filter(&Predicate::bad_radius(sigma)).unwrap();

        let (positive, negative) = p.split(Split::Radius { sigma }).unwrap();
        prop_assert_eq!(&good, &positive);
        prop_assert_eq!(&bad, &negative);

        for (i, row) in rows.iter().enumerate() {
            let expected = significance(row.radius).map(|s| s >= sigma);
            let k = key(i);
            let actual = if good.key_set().contains(k.as_str()) {
                Some(true)
            } else if bad.key_set().contains(k.as_str()) {
                Some(false)
            } else {
                None
            };
            prop_assert_eq!(actual, expected, "row {}", k);
        }
    }

    #[test]
    fn transiting_and_facility_predicates_follow_the_row(rows in rows()) {
        let p = population(&rows);
        let transiting = key_set(&p.filter(&Predicate::transiting()).unwrap());
        let kepler = key_set(&p.filter(&Predicate::kepler()).unwrap());
        let ground = key_set(&p.filter(&Predicate::ground()).unwrap());

        for (i, row) in rows.iter().enumerate() {
            let k = key(i);
            prop_assert_eq!(transiting.contains(&k), row.transiting == Some(true));
            prop_assert_eq!(kepler.contains(&k), row.facility == Some("Kepler"));
            let on_ground = row
                .facility
                .is_some_and(|f| SpaceMission::from_facility(f).is_none());
            prop_assert_eq!(ground.contains(&k), on_ground);
        }
    }
}

// ============================================================================
// Slice Properties
// ============================================================================

proptest! {
    #[test]
    fn full_slice_is_identity(rows in rows()) {
        let p = population(&rows);
        let len = p.len() as isize;
        prop_assert_eq!(p.by_slice(Some(0), Some(len), Some(1)).unwrap(), p.clone());
        prop_assert_eq!(p.by_slice(None, None, None).unwrap(), p);
    }

    #[test]
    fn reversed_slice_reverses_keys(rows in rows()) {
        let p = population(&rows);
        let mut expected = keys(&p);
        expected.reverse();
        prop_assert_eq!(keys(&p.by_slice(None, None, Some(-1)).unwrap()), expected);
    }

    #[test]
    fn slice_bounds_are_clipped(rows in rows(), start in -60isize..60, stop in -60isize..60) {
        let p = population(&rows);
        let len = p.len() as isize;
        let resolve = |b: isize| {
            let clipped = if b < 0 { (b + len).max(0) } else { b.min(len) };
            clipped as usize
        };
        let (from, to) = (resolve(start), resolve(stop));
        let all = keys(&p);
        let expected: Vec<String> = if from < to { all[from..to].to_vec() } else { Vec::new() };
        prop_assert_eq!(keys(&p.by_slice(Some(start), Some(stop), None).unwrap()), expected);
    }

    #[test]
    fn wrong_mask_length_is_rejected(rows in rows(), extra in 1usize..5) {
        let p = population(&rows);
        let before = p.clone();
        let mask = vec![true; p.len() + extra];
        let err = p.filter_mask(&mask).unwrap_err();
        let is_shape_mismatch = matches!(
            err,
            PopulationError::ShapeMismatch { expected, actual }
                if expected == p.len() && actual == p.len() + extra
        );
        prop_assert!(is_shape_mismatch);
        prop_assert_eq!(p, before);
    }
}
