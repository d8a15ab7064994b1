//! Combination of populations for display.
//!
//! [`summarize`] turns an ordered list of populations into a [`Summary`]:
//! one [`Series`] per input with its resolved plot style, per-column
//! statistics and category counts. Inputs are never merged, so overlapping
//! populations each keep their own series.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::color::{ColorMap, PlotStyle};
use crate::data::derived::Quantity;
use crate::data::model::{ColumnValues, Value};
use crate::data::population::Population;
use crate::error::{PopulationError, Result};

const DISCOVERY_METHOD_COLUMN: &str = "discovery_method";

/// Statistics of one numeric column over a series' rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnStats {
    pub unit: String,
    pub defined: usize,
    pub missing: usize,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
    pub median: Option<f64>,
}

impl ColumnStats {
    fn from_values(unit: &str, values: impl Iterator<Item = Option<f64>>) -> Self {
        let mut missing = 0;
        let mut defined: Vec<f64> = Vec::new();
        for value in values {
            match value {
                Some(v) => defined.push(v),
                None => missing += 1,
            }
        }
        defined.sort_by(f64::total_cmp);

        let n = defined.len();
        let median = match n {
            0 => None,
            n if n % 2 == 1 => Some(defined[n / 2]),
            n => Some((defined[n / 2 - 1] + defined[n / 2]) / 2.0),
        };
        ColumnStats {
            unit: unit.to_string(),
            defined: n,
            missing,
            min: defined.first().copied(),
            max: defined.last().copied(),
            mean: (n > 0).then(|| defined.iter().sum::<f64>() / n as f64),
            median,
        }
    }
}

/// One input population as it will be drawn.
#[derive(Debug, Clone, Serialize)]
pub struct Series {
    pub label: String,
    pub rows: usize,
    pub keys: Vec<String>,
    /// Style with the colour always filled in.
    pub style: PlotStyle,
    pub columns: BTreeMap<String, ColumnStats>,
    pub discovery_methods: BTreeMap<String, usize>,
    #[serde(skip)]
    population: Population,
}

impl Series {
    pub fn population(&self) -> &Population {
        &self.population
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub series: Vec<Series>,
}

/// Build the display summary of one or more populations.
pub fn summarize(populations: &[Population]) -> Result<Summary> {
    if populations.is_empty() {
        return Err(PopulationError::EmptyInput);
    }

    let colors = ColorMap::new(populations.len());
    let series = populations
        .iter()
        .enumerate()
        .map(|(index, population)| {
            let mut style = population.style().clone();
            if style.color.is_none() {
                style.color = Some(colors.color_at(index).to_string());
            }
            Series {
                label: population.label().to_string(),
                rows: population.len(),
                keys: population.keys().map(str::to_string).collect(),
                style,
                columns: column_stats(population),
                discovery_methods: discovery_methods(population),
                population: population.clone(),
            }
        })
        .collect();

    log::debug!("summarized {} populations", populations.len());
    Ok(Summary { series })
}

fn column_stats(population: &Population) -> BTreeMap<String, ColumnStats> {
    let rows = population.rows();
    population
        .table()
        .columns()
        .iter()
        .filter_map(|column| match &column.values {
            ColumnValues::Numeric(values) => Some((
                column.name.clone(),
                ColumnStats::from_values(&column.unit, rows.iter().map(|&r| values[r])),
            )),
            _ => None,
        })
        .collect()
}

fn discovery_methods(population: &Population) -> BTreeMap<String, usize> {
    population
        .table()
        .value_counts(DISCOVERY_METHOD_COLUMN, population.rows())
        .unwrap_or_default()
        .into_iter()
        .filter(|(value, _)| !value.is_missing())
        .map(|(value, count)| match value {
            Value::Text(s) => (s, count),
            other => (other.to_string(), count),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Scatter extraction
// ---------------------------------------------------------------------------

/// A plot axis: a calculated quantity or a stored numeric column.
#[derive(Debug, Clone, PartialEq)]
pub enum Axis {
    Quantity(Quantity),
    Column(String),
}

impl Axis {
    /// Calculated quantities take precedence over stored columns of the same name.
    pub fn from_name(name: &str) -> Axis {
        Quantity::from_name(name)
            .map(Axis::Quantity)
            .unwrap_or_else(|| Axis::Column(name.to_string()))
    }

    pub fn name(&self) -> &str {
        match self {
            Axis::Quantity(q) => q.name(),
            Axis::Column(c) => c,
        }
    }

    fn values(&self, population: &Population) -> Result<Vec<Option<f64>>> {
        match self {
            Axis::Quantity(q) => population.quantity(*q),
            Axis::Column(c) => population.numeric(c),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Scale {
    #[default]
    Linear,
    /// log10; non-positive values are dropped.
    Log,
}

impl Scale {
    fn apply(self, v: f64) -> Option<f64> {
        match self {
            Scale::Linear => Some(v),
            Scale::Log => (v > 0.0).then(|| v.log10()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterSeries {
    pub label: String,
    pub color: Option<String>,
    pub keys: Vec<String>,
    pub points: Vec<(f64, f64)>,
}

impl Summary {
    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Per-series (x, y) points. Rows missing either coordinate are dropped.
    pub fn scatter(
        &self,
        x: &Axis,
        y: &Axis,
        scales: (Scale, Scale),
    ) -> Result<Vec<ScatterSeries>> {
        self.series
            .iter()
            .map(|series| {
                let population = &series.population;
                let xs = x.values(population)?;
                let ys = y.values(population)?;

                let mut keys = Vec::new();
                let mut points = Vec::new();
                for (i, (px, py)) in xs.into_iter().zip(ys).enumerate() {
                    let point = px
                        .and_then(|v| scales.0.apply(v))
                        .zip(py.and_then(|v| scales.1.apply(v)));
                    if let (Some(point), Some(key)) = (point, population.key(i)) {
                        keys.push(key.to_string());
                        points.push(point);
                    }
                }
                log::debug!(
                    "{}: {} of {} rows plotted as {} vs {}",
                    series.label,
                    points.len(),
                    series.rows,
                    y.name(),
                    x.name()
                );
                Ok(ScatterSeries {
                    label: series.label.clone(),
                    color: series.style.color.clone(),
                    keys,
                    points,
                })
            })
            .collect()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
