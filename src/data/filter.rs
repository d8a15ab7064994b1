use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{PopulationError, Result};

use super::derived::significance;
use super::model::Value;
use super::population::Population;

// ---------------------------------------------------------------------------
// Three-valued selection
// ---------------------------------------------------------------------------

/// Per-row outcome of a predicate: `Some(true)` selected, `Some(false)`
/// rejected, `None` undefined (the attribute is missing for that row).
pub type Truth = Vec<Option<bool>>;

/// Comparison operator for numeric predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparison {
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
    Equal,
    NotEqual,
}

const COMPARISON_SYMBOLS: &[(Comparison, &str)] = &[
    (Comparison::LessOrEqual, "<="),
    (Comparison::GreaterOrEqual, ">="),
    (Comparison::NotEqual, "!="),
    (Comparison::Equal, "=="),
    (Comparison::Less, "<"),
    (Comparison::Greater, ">"),
];

impl Comparison {
    pub fn apply(self, value: f64, threshold: f64) -> bool {
        match self {
            Comparison::Less => value < threshold,
            Comparison::LessOrEqual => value <= threshold,
            Comparison::Greater => value > threshold,
            Comparison::GreaterOrEqual => value >= threshold,
            Comparison::Equal => value == threshold,
            Comparison::NotEqual => value != threshold,
        }
    }

    pub fn symbol(self) -> &'static str {
        COMPARISON_SYMBOLS
            .iter()
            .find(|(op, _)| *op == self)
            .map(|(_, s)| *s)
            .unwrap_or("?")
    }
}

impl FromStr for Comparison {
    type Err = PopulationError;

    fn from_str(s: &str) -> Result<Self> {
        COMPARISON_SYMBOLS
            .iter()
            .find(|(_, symbol)| *symbol == s.trim())
            .map(|(op, _)| *op)
            .ok_or_else(|| PopulationError::Config(format!("unknown comparison '{s}'")))
    }
}

// ---------------------------------------------------------------------------
// Space missions: closed lookup table for discovery facilities
// ---------------------------------------------------------------------------

/// Space-based discovery facilities recognised by the facility splits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpaceMission {
    Kepler,
    K2,
    Tess,
    CoRoT,
    Hubble,
    Spitzer,
    Gaia,
    Jwst,
    Cheops,
}

/// Mission → facility name as it appears in the archive's `disc_facility`.
const SPACE_MISSIONS: &[(SpaceMission, &str)] = &[
    (SpaceMission::Kepler, "Kepler"),
    (SpaceMission::K2, "K2"),
    (SpaceMission::Tess, "Transiting Exoplanet Survey Satellite (TESS)"),
    (SpaceMission::CoRoT, "CoRoT"),
    (SpaceMission::Hubble, "Hubble Space Telescope"),
    (SpaceMission::Spitzer, "Spitzer Space Telescope"),
    (SpaceMission::Gaia, "European Space Agency (ESA) Gaia Satellite"),
    (SpaceMission::Jwst, "James Webb Space Telescope (JWST)"),
    (SpaceMission::Cheops, "CHaracterising ExOPlanets Satellite (CHEOPS)"),
];

impl SpaceMission {
    pub fn facility(self) -> &'static str {
        SPACE_MISSIONS
            .iter()
            .find(|(m, _)| *m == self)
            .map(|(_, f)| *f)
            .unwrap_or("")
    }

    /// Resolve a `disc_facility` string to a mission, if it is one.
    pub fn from_facility(facility: &str) -> Option<SpaceMission> {
        let facility = facility.trim();
        SPACE_MISSIONS
            .iter()
            .find(|(_, f)| f.eq_ignore_ascii_case(facility))
            .map(|(m, _)| *m)
    }
}

pub const FACILITY_COLUMN: &str = "discovery_facility";
pub const TRANSIT_FLAG_COLUMN: &str = "detected_in_transit";

// ---------------------------------------------------------------------------
// Splits: complementary predicate pairs
// ---------------------------------------------------------------------------

/// An attribute-based split into two disjoint halves.
///
/// For any population the positive and negative halves never share a row,
/// and together they cover every row where the attribute is defined.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Split {
    /// Mass significance (mass / uncertainty) at least `sigma`.
    Mass { sigma: f64 },
    /// Radius significance at least `sigma`.
    Radius { sigma: f64 },
    /// Discovered by one particular space mission.
    Mission(SpaceMission),
    /// Discovered by any space mission, versus from the ground.
    Space,
    /// Flagged as detected in transit.
    Transiting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Positive,
    Negative,
}

/// Split names accepted by [`Split::parse`]; sigma-based splits take the
/// threshold argument.
const SPLIT_NAMES: &[(&str, fn(f64) -> Split)] = &[
    ("mass", |sigma| Split::Mass { sigma }),
    ("radius", |sigma| Split::Radius { sigma }),
    ("kepler", |_| Split::Mission(SpaceMission::Kepler)),
    ("k2", |_| Split::Mission(SpaceMission::K2)),
    ("tess", |_| Split::Mission(SpaceMission::Tess)),
    ("space", |_| Split::Space),
    ("transit", |_| Split::Transiting),
];

impl Split {
    pub const DEFAULT_SIGMA: f64 = 2.5;

    pub fn parse(name: &str, sigma: f64) -> Result<Split> {
        let name = name.trim().to_ascii_lowercase();
        SPLIT_NAMES
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, make)| make(sigma))
            .ok_or_else(|| PopulationError::Config(format!("unknown split '{name}'")))
    }

    pub fn positive(self) -> Predicate {
        Predicate::Split {
            split: self,
            side: Side::Positive,
        }
    }

    pub fn negative(self) -> Predicate {
        Predicate::Split {
            split: self,
            side: Side::Negative,
        }
    }

    /// Labels for the (positive, negative) halves.
    pub fn labels(self) -> (String, String) {
        match self {
            Split::Mass { sigma } => (
                format!("GoodMass(σ≥{sigma})"),
                format!("BadMass(σ<{sigma})"),
            ),
            Split::Radius { sigma } => (
                format!("GoodRadius(σ≥{sigma})"),
                format!("BadRadius(σ<{sigma})"),
            ),
            Split::Mission(m) => (format!("{m:?}"), format!("Non{m:?}")),
            Split::Space => ("Space".into(), "Ground".into()),
            Split::Transiting => ("Transiting".into(), "NonTransiting".into()),
        }
    }

    /// Positive-side outcome per row; `None` where the attribute is undefined.
    fn evaluate(self, population: &Population) -> Result<Truth> {
        match self {
            Split::Mass { sigma } => Ok(threshold(significance(population, "mass")?, sigma)),
            Split::Radius { sigma } => Ok(threshold(significance(population, "radius")?, sigma)),
            Split::Mission(mission) => Ok(population
                .text_or_missing(FACILITY_COLUMN)?
                .into_iter()
                .map(|f| f.map(|f| SpaceMission::from_facility(f) == Some(mission)))
                .collect()),
            Split::Space => Ok(population
                .text_or_missing(FACILITY_COLUMN)?
                .into_iter()
                .map(|f| f.map(|f| SpaceMission::from_facility(f).is_some()))
                .collect()),
            Split::Transiting => population.flag_or_missing(TRANSIT_FLAG_COLUMN),
        }
    }
}

/// Significance at or above the threshold counts as good.
fn threshold(significance: Vec<Option<f64>>, sigma: f64) -> Truth {
    significance
        .into_iter()
        .map(|s| s.map(|s| s >= sigma))
        .collect()
}

// ---------------------------------------------------------------------------
// Predicate
// ---------------------------------------------------------------------------

/// A rule selecting rows of a population.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// `column <op> threshold` on a numeric column.
    Compare {
        column: String,
        op: Comparison,
        threshold: f64,
    },
    /// Exact (trimmed) match on a text column.
    TextEquals { column: String, value: String },
    /// Case-insensitive substring match on a text column.
    TextContains { column: String, needle: String },
    /// The cell's value is one of the given values.
    OneOf { column: String, values: BTreeSet<Value> },
    Flag { column: String, expected: bool },
    /// The column has a value; never undefined.
    Defined(String),
    Split { split: Split, side: Side },
    All(Vec<Predicate>),
    Any(Vec<Predicate>),
    /// Flips defined outcomes; undefined stays undefined.
    Not(Box<Predicate>),
}

impl Predicate {
    pub fn compare(column: impl Into<String>, op: Comparison, threshold: f64) -> Self {
        Predicate::Compare {
            column: column.into(),
            op,
            threshold,
        }
    }

    pub fn text_equals(column: impl Into<String>, value: impl Into<String>) -> Self {
        Predicate::TextEquals {
            column: column.into(),
            value: value.into(),
        }
    }

    pub fn good_mass(sigma: f64) -> Self {
        Split::Mass { sigma }.positive()
    }

    pub fn bad_mass(sigma: f64) -> Self {
        Split::Mass { sigma }.negative()
    }

    pub fn good_radius(sigma: f64) -> Self {
        Split::Radius { sigma }.positive()
    }

    pub fn bad_radius(sigma: f64) -> Self {
        Split::Radius { sigma }.negative()
    }

    pub fn kepler() -> Self {
        Split::Mission(SpaceMission::Kepler).positive()
    }

    pub fn non_kepler() -> Self {
        Split::Mission(SpaceMission::Kepler).negative()
    }

    pub fn tess() -> Self {
        Split::Mission(SpaceMission::Tess).positive()
    }

    pub fn non_tess() -> Self {
        Split::Mission(SpaceMission::Tess).negative()
    }

    pub fn space() -> Self {
        Split::Space.positive()
    }

    pub fn ground() -> Self {
        Split::Space.negative()
    }

    pub fn transiting() -> Self {
        Split::Transiting.positive()
    }

    pub fn non_transiting() -> Self {
        Split::Transiting.negative()
    }

    /// The complementary predicate: selects exactly the rows where this one
    /// is defined and false.
    pub fn complement(&self) -> Predicate {
        match self {
            Predicate::Split { split, side } => Predicate::Split {
                split: *split,
                side: match side {
                    Side::Positive => Side::Negative,
                    Side::Negative => Side::Positive,
                },
            },
            Predicate::Not(inner) => (**inner).clone(),
            other => Predicate::Not(Box::new(other.clone())),
        }
    }

    /// Evaluate row by row.
    pub fn evaluate(&self, population: &Population) -> Result<Truth> {
        match self {
            Predicate::Compare {
                column,
                op,
                threshold,
            } => Ok(population
                .numeric(column)?
                .into_iter()
                .map(|v| v.map(|v| op.apply(v, *threshold)))
                .collect()),
            Predicate::TextEquals { column, value } => Ok(population
                .text(column)?
                .into_iter()
                .map(|v| v.map(|v| v.trim() == value.trim()))
                .collect()),
            Predicate::TextContains { column, needle } => {
                let needle = needle.to_lowercase();
                Ok(population
                    .text(column)?
                    .into_iter()
                    .map(|v| v.map(|v| v.to_lowercase().contains(&needle)))
                    .collect())
            }
            Predicate::OneOf { column, values } => (0..population.len())
                .map(|i| {
                    let value = population.value(i, column)?;
                    Ok((!value.is_missing()).then(|| values.contains(&value)))
                })
                .collect(),
            Predicate::Flag { column, expected } => Ok(population
                .flag(column)?
                .into_iter()
                .map(|v| v.map(|v| v == *expected))
                .collect()),
            Predicate::Defined(column) => (0..population.len())
                .map(|i| Ok(Some(!population.value(i, column)?.is_missing())))
                .collect(),
            Predicate::Split { split, side } => {
                let truth = split.evaluate(population)?;
                Ok(match side {
                    Side::Positive => truth,
                    Side::Negative => negate(truth),
                })
            }
            Predicate::All(parts) => combine(population, parts, true),
            Predicate::Any(parts) => combine(population, parts, false),
            Predicate::Not(inner) => Ok(negate(inner.evaluate(population)?)),
        }
    }
}

fn negate(truth: Truth) -> Truth {
    truth.into_iter().map(|t| t.map(|t| !t)).collect()
}

/// Kleene conjunction (`all == true`) or disjunction (`all == false`).
fn combine(population: &Population, parts: &[Predicate], all: bool) -> Result<Truth> {
    let mut acc: Truth = vec![Some(all); population.len()];
    for part in parts {
        let truth = part.evaluate(population)?;
        for (a, t) in acc.iter_mut().zip(truth) {
            *a = match (*a, t) {
                // The absorbing value decides regardless of the other side.
                (Some(v), _) | (_, Some(v)) if v != all => Some(v),
                (Some(_), Some(_)) => Some(all),
                _ => None,
            };
        }
    }
    Ok(acc)
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Compare {
                column,
                op,
                threshold,
            } => write!(f, "{column} {} {threshold}", op.symbol()),
            Predicate::TextEquals { column, value } => write!(f, "{column} == '{value}'"),
            Predicate::TextContains { column, needle } => write!(f, "{column} contains '{needle}'"),
            Predicate::OneOf { column, values } => {
                let values: Vec<String> = values.iter().map(Value::to_string).collect();
                write!(f, "{column} in [{}]", values.join(", "))
            }
            Predicate::Flag { column, expected } => write!(f, "{column} is {expected}"),
            Predicate::Defined(column) => write!(f, "{column} is defined"),
            Predicate::Split { split, side } => {
                let (positive, negative) = split.labels();
                match side {
                    Side::Positive => write!(f, "{positive}"),
                    Side::Negative => write!(f, "{negative}"),
                }
            }
            Predicate::All(parts) => write_joined(f, parts, " and "),
            Predicate::Any(parts) => write_joined(f, parts, " or "),
            Predicate::Not(inner) => write!(f, "not ({inner})"),
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, parts: &[Predicate], sep: &str) -> fmt::Result {
    let parts: Vec<String> = parts.iter().map(|p| format!("({p})")).collect();
    write!(f, "{}", parts.join(sep))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{Column, Table};

    fn planets() -> Population {
        let keys = ["a", "b", "c", "d"].map(String::from).to_vec();
        let columns = vec![
            Column::numeric("mass", "earthMass", vec![Some(10.0), Some(1.0), None, Some(5.0)]),
            Column::numeric(
                "mass_uncertainty_upper",
                "earthMass",
                vec![Some(1.0), Some(1.0), Some(1.0), None],
            ),
            Column::numeric(
                "mass_uncertainty_lower",
                "earthMass",
                vec![Some(1.0), Some(1.0), Some(1.0), None],
            ),
            Column::text(
                FACILITY_COLUMN,
                vec![
                    Some("Kepler".into()),
                    Some("W. M. Keck Observatory".into()),
                    None,
                    Some("Transiting Exoplanet Survey Satellite (TESS)".into()),
                ],
            ),
            Column::flag(TRANSIT_FLAG_COLUMN, vec![Some(true), Some(false), Some(true), None]),
        ];
        Population::new("planets", Table::new(keys, columns).unwrap())
    }

    fn keys(p: &Population) -> Vec<&str> {
        p.keys().collect()
    }

    #[test]
    fn test_compare_skips_missing() {
        let p = planets();
        let heavy = p.filter(&Predicate::compare("mass", Comparison::Greater, 2.0)).unwrap();
        assert_eq!(keys(&heavy), ["a", "d"]);
        let light = p
            .filter(&Predicate::compare("mass", Comparison::Greater, 2.0).complement())
            .unwrap();
        assert_eq!(keys(&light), ["b"]);
    }

    #[test]
    fn test_mass_split_is_inclusive_and_skips_undefined() {
        let p = planets();
        let (good, bad) = p.split(Split::Mass { sigma: 1.0 }).unwrap();
        // b has significance exactly 1.0; c has no mass; d has no uncertainty.
        assert_eq!(keys(&good), ["a", "b"]);
        assert!(bad.is_empty());

        let (good, bad) = p.split(Split::Mass { sigma: 5.0 }).unwrap();
        assert_eq!(keys(&good), ["a"]);
        assert_eq!(keys(&bad), ["b"]);
    }

    #[test]
    fn test_facility_splits() {
        let p = planets();
        assert_eq!(keys(&p.filter(&Predicate::kepler()).unwrap()), ["a"]);
        assert_eq!(keys(&p.filter(&Predicate::non_kepler()).unwrap()), ["b", "d"]);
        assert_eq!(keys(&p.filter(&Predicate::tess()).unwrap()), ["d"]);
        assert_eq!(keys(&p.filter(&Predicate::space()).unwrap()), ["a", "d"]);
        assert_eq!(keys(&p.filter(&Predicate::ground()).unwrap()), ["b"]);
    }

    #[test]
    fn test_transit_flag_split() {
        let (yes, no) = planets().split(Split::Transiting).unwrap();
        assert_eq!(keys(&yes), ["a", "c"]);
        assert_eq!(keys(&no), ["b"]);
    }

    #[test]
    fn test_kleene_logic() {
        let p = planets();
        let heavy = Predicate::compare("mass", Comparison::Greater, 2.0);
        let both = Predicate::All(vec![heavy.clone(), Predicate::transiting()]);
        assert_eq!(both.evaluate(&p).unwrap(), vec![Some(true), Some(false), None, None]);

        let either = Predicate::Any(vec![heavy, Predicate::transiting()]);
        assert_eq!(
            either.evaluate(&p).unwrap(),
            vec![Some(true), Some(false), Some(true), Some(true)]
        );
    }

    #[test]
    fn test_one_of_and_defined() {
        let p = planets();
        let values = [Value::Text("Kepler".into()), Value::Text("K2".into())]
            .into_iter()
            .collect();
        let selected = p
            .filter(&Predicate::OneOf {
                column: FACILITY_COLUMN.into(),
                values,
            })
            .unwrap();
        assert_eq!(keys(&selected), ["a"]);

        let defined = Predicate::Defined("mass".into());
        assert_eq!(keys(&p.filter(&defined).unwrap()), ["a", "b", "d"]);
        assert_eq!(keys(&p.filter(&defined.complement()).unwrap()), ["c"]);
    }

    #[test]
    fn test_complement_round_trips() {
        let p = Predicate::good_mass(2.5);
        assert_eq!(p.complement(), Predicate::bad_mass(2.5));
        let c = Predicate::Defined("x".into());
        assert_eq!(c.complement().complement(), c);
    }

    #[test]
    fn test_type_errors_surface() {
        let p = planets();
        let err = p
            .filter(&Predicate::compare(FACILITY_COLUMN, Comparison::Less, 1.0))
            .unwrap_err();
        assert!(matches!(err, PopulationError::TypeMismatch { .. }));
    }

    #[test]
    fn test_parse_names() {
        assert_eq!(Split::parse("Kepler", 2.5).unwrap(), Split::Mission(SpaceMission::Kepler));
        assert_eq!(Split::parse("mass", 3.0).unwrap(), Split::Mass { sigma: 3.0 });
        assert!(Split::parse("ufo", 1.0).is_err());
        assert_eq!("<=".parse::<Comparison>().unwrap(), Comparison::LessOrEqual);
        assert_eq!(Comparison::Greater.symbol(), ">");
        assert_eq!(
            SpaceMission::from_facility(" transiting exoplanet survey satellite (tess) "),
            Some(SpaceMission::Tess)
        );
    }
}
