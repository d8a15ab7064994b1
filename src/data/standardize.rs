//! Standardization of raw exoplanet-archive tables.
//!
//! Raw tables use the archive's column names (`pl_bmasse`, `pl_bmasseerr1`,
//! `pl_bmasselim`, ...). The standardized table uses one uniform schema for
//! every source: a value column per quantity plus `_uncertainty_upper`,
//! `_uncertainty_lower`, `_upper_limit`, `_lower_limit` and `_reference`
//! companions where the archive provides them.

use std::collections::{BTreeSet, HashMap};
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result, bail};

use super::model::{Column, ColumnValues, Table};

/// How a raw column is ingested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ingest {
    Text,
    Number,
    Flag,
    /// Value with `err1` / `err2` companions.
    WithErrors,
    /// Value with `err1` / `err2` and a `lim` flag.
    WithErrorsAndLimits,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Transform {
    Identity,
    Scale(f64),
    /// Archive stores log10 of the quantity.
    Exp10,
}

impl Transform {
    fn apply(self, x: f64) -> f64 {
        match self {
            Transform::Identity => x,
            Transform::Scale(s) => x * s,
            Transform::Exp10 => 10f64.powf(x),
        }
    }
}

struct Mapping {
    standard: &'static str,
    raw: &'static str,
    ingest: Ingest,
    unit: &'static str,
    transform: Transform,
}

const fn map(
    standard: &'static str,
    raw: &'static str,
    ingest: Ingest,
    unit: &'static str,
) -> Mapping {
    Mapping {
        standard,
        raw,
        ingest,
        unit,
        transform: Transform::Identity,
    }
}

pub const NAME_COLUMN: &str = "name";

/// Standard column ← raw archive column.
const MAPPINGS: &[Mapping] = &[
    // identity
    map(NAME_COLUMN, "pl_name", Ingest::Text, ""),
    map("hostname", "hostname", Ingest::Text, ""),
    map("letter", "pl_letter", Ingest::Text, ""),
    map("gaia_id", "gaia_id", Ingest::Text, ""),
    map("number_of_stars", "sy_snum", Ingest::Number, ""),
    map("number_of_planets", "sy_pnum", Ingest::Number, ""),
    // discovery
    map("discovery_method", "discoverymethod", Ingest::Text, ""),
    map("discovery_year", "disc_year", Ingest::Number, "yr"),
    map("discovery_reference", "disc_refname", Ingest::Text, ""),
    map("discovery_facility", "disc_facility", Ingest::Text, ""),
    // position and kinematics
    map("ra", "ra", Ingest::Number, "deg"),
    map("dec", "dec", Ingest::Number, "deg"),
    map("pmra", "sy_pmra", Ingest::WithErrors, "mas/yr"),
    map("pmdec", "sy_pmdec", Ingest::WithErrors, "mas/yr"),
    map("systemic_rv", "st_radv", Ingest::WithErrors, "km/s"),
    map("distance", "sy_dist", Ingest::WithErrors, "pc"),
    // detection flags
    map("detected_in_rv", "rv_flag", Ingest::Flag, ""),
    map("detected_in_pulsar", "pul_flag", Ingest::Flag, ""),
    map("detected_in_pulsation_timing", "ptv_flag", Ingest::Flag, ""),
    map("detected_in_transit", "tran_flag", Ingest::Flag, ""),
    map("detected_in_astrometry", "ast_flag", Ingest::Flag, ""),
    map("detected_in_orbital_brightness_modulations", "obm_flag", Ingest::Flag, ""),
    map("detected_in_microlensing", "micro_flag", Ingest::Flag, ""),
    map("detected_in_eclipse_timing_variations", "etv_flag", Ingest::Flag, ""),
    map("detected_in_imaging", "ima_flag", Ingest::Flag, ""),
    map("detected_in_disk_kinematics", "dkin_flag", Ingest::Flag, ""),
    map("is_controversial", "pl_controv_flag", Ingest::Flag, ""),
    map("shows_ttv", "ttv_flag", Ingest::Flag, ""),
    // host star
    map("stellar_spectral_type", "st_spectype", Ingest::Text, ""),
    map("stellar_teff", "st_teff", Ingest::WithErrorsAndLimits, "K"),
    map("stellar_radius", "st_rad", Ingest::WithErrorsAndLimits, "solRad"),
    map("stellar_mass", "st_mass", Ingest::WithErrorsAndLimits, "solMass"),
    map("stellar_age", "st_age", Ingest::WithErrorsAndLimits, "Gyr"),
    map("stellar_metallicity", "st_met", Ingest::WithErrorsAndLimits, "dex"),
    Mapping {
        standard: "stellar_luminosity",
        raw: "st_lum",
        ingest: Ingest::WithErrorsAndLimits,
        unit: "solLum",
        transform: Transform::Exp10,
    },
    map("stellar_logg", "st_logg", Ingest::WithErrorsAndLimits, "dex"),
    map("stellar_density", "st_dens", Ingest::WithErrorsAndLimits, "g/cm3"),
    map("stellar_vsini", "st_vsin", Ingest::WithErrorsAndLimits, "km/s"),
    map("stellar_rotation_period", "st_rotp", Ingest::WithErrorsAndLimits, "day"),
    // system magnitudes
    map("umag", "sy_umag", Ingest::WithErrors, "mag"),
    map("gmag", "sy_gmag", Ingest::WithErrors, "mag"),
    map("rmag", "sy_rmag", Ingest::WithErrors, "mag"),
    map("imag", "sy_imag", Ingest::WithErrors, "mag"),
    map("zmag", "sy_zmag", Ingest::WithErrors, "mag"),
    map("Vmag", "sy_vmag", Ingest::WithErrors, "mag"),
    map("Bmag", "sy_bmag", Ingest::WithErrors, "mag"),
    map("ICmag", "sy_icmag", Ingest::WithErrors, "mag"),
    map("Jmag", "sy_jmag", Ingest::WithErrors, "mag"),
    map("Hmag", "sy_hmag", Ingest::WithErrors, "mag"),
    map("Kmag", "sy_kmag", Ingest::WithErrors, "mag"),
    map("W1mag", "sy_w1mag", Ingest::WithErrors, "mag"),
    map("W2mag", "sy_w2mag", Ingest::WithErrors, "mag"),
    map("W3mag", "sy_w3mag", Ingest::WithErrors, "mag"),
    map("W4mag", "sy_w4mag", Ingest::WithErrors, "mag"),
    map("gaiamag", "sy_gaiamag", Ingest::WithErrors, "mag"),
    map("Tmag", "sy_tmag", Ingest::WithErrors, "mag"),
    map("kepmag", "sy_kepmag", Ingest::WithErrors, "mag"),
    // orbit
    map("period", "pl_orbper", Ingest::WithErrorsAndLimits, "day"),
    map("semimajoraxis", "pl_orbsmax", Ingest::WithErrorsAndLimits, "AU"),
    map("eccentricity", "pl_orbeccen", Ingest::WithErrorsAndLimits, ""),
    map("inclination", "pl_orbincl", Ingest::WithErrorsAndLimits, "deg"),
    map("omega", "pl_orblper", Ingest::WithErrorsAndLimits, "deg"),
    // planet
    map("radius", "pl_rade", Ingest::WithErrorsAndLimits, "earthRad"),
    map("mass", "pl_bmasse", Ingest::WithErrorsAndLimits, "earthMass"),
    map("msini", "pl_msinie", Ingest::WithErrorsAndLimits, "earthMass"),
    map("density", "pl_dens", Ingest::WithErrorsAndLimits, "g/cm3"),
    map("insolation", "pl_insol", Ingest::WithErrorsAndLimits, "earthFlux"),
    map("teq", "pl_eqt", Ingest::WithErrorsAndLimits, "K"),
    // transit
    map("transit_midpoint", "pl_tranmid", Ingest::WithErrorsAndLimits, "day"),
    Mapping {
        standard: "transit_depth",
        raw: "pl_trandep",
        ingest: Ingest::WithErrorsAndLimits,
        unit: "",
        transform: Transform::Scale(0.01),
    },
    map("transit_duration", "pl_trandur", Ingest::WithErrorsAndLimits, "hour"),
    map("transit_ar", "pl_ratdor", Ingest::WithErrorsAndLimits, ""),
    map("transit_b", "pl_imppar", Ingest::WithErrorsAndLimits, ""),
    map("rv_semiamplitude", "pl_rvamp", Ingest::WithErrorsAndLimits, "m/s"),
    map("projected_obliquity", "pl_projobliq", Ingest::WithErrorsAndLimits, "deg"),
    map("obliquity", "pl_trueobliq", Ingest::WithErrorsAndLimits, "deg"),
    // spectroscopy
    map("number_of_transmission_measurements", "pl_ntranspec", Ingest::Number, ""),
    map("number_of_emission_measurements", "pl_nespec", Ingest::Number, ""),
    // bookkeeping
    map("default_parameter_set", "default_flag", Ingest::Flag, ""),
];

// ---------------------------------------------------------------------------
// Raw table access
// ---------------------------------------------------------------------------

/// A raw archive table: string cells addressed by column name.
struct RawTable {
    columns: HashMap<String, Vec<String>>,
    rows: usize,
}

impl RawTable {
    fn read(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("opening raw table {}", path.display()))?;
        Self::from_reader(file)
    }

    /// Archive CSV: `#` comment lines, then a header row.
    fn from_reader<R: Read>(source: R) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .comment(Some(b'#'))
            .from_reader(source);
        let headers: Vec<String> = reader
            .headers()
            .context("reading raw table headers")?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let mut cells: Vec<Vec<String>> = vec![Vec::new(); headers.len()];
        let mut rows = 0;
        for (row_no, record) in reader.records().enumerate() {
            let record = record.with_context(|| format!("raw table row {row_no}"))?;
            for (column, value) in cells.iter_mut().zip(record.iter()) {
                column.push(value.trim().to_string());
            }
            rows += 1;
        }

        Ok(RawTable {
            columns: headers.into_iter().zip(cells).collect(),
            rows,
        })
    }

    fn has(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    fn text(&self, name: &str) -> Option<Vec<Option<String>>> {
        let column = self.columns.get(name)?;
        Some(
            column
                .iter()
                .map(|s| (!s.is_empty()).then(|| s.clone()))
                .collect(),
        )
    }

    fn numbers(&self, name: &str) -> Result<Option<Vec<Option<f64>>>> {
        let Some(column) = self.columns.get(name) else {
            return Ok(None);
        };
        column
            .iter()
            .enumerate()
            .map(|(row, s)| {
                if s.is_empty() {
                    return Ok(None);
                }
                let value: f64 = s
                    .parse()
                    .with_context(|| format!("row {row}, {name}: '{s}' is not a number"))?;
                Ok(value.is_finite().then_some(value))
            })
            .collect::<Result<Vec<_>>>()
            .map(Some)
    }

    fn flags(&self, name: &str) -> Result<Option<Vec<Option<bool>>>> {
        let Some(column) = self.columns.get(name) else {
            return Ok(None);
        };
        column
            .iter()
            .enumerate()
            .map(|(row, s)| match s.to_ascii_lowercase().as_str() {
                "" => Ok(None),
                "1" | "true" => Ok(Some(true)),
                "0" | "false" => Ok(Some(false)),
                other => bail!("row {row}, {name}: '{other}' is not a flag"),
            })
            .collect::<Result<Vec<_>>>()
            .map(Some)
    }
}

// ---------------------------------------------------------------------------
// Reference links
// ---------------------------------------------------------------------------

/// Split an archive reference anchor into (label, url).
///
/// `<a refstr=X href=https://ui.adsabs.harvard.edu/abs/... target=ref> Torres et al. 2008 </a>`
/// becomes `("Torres et al. 2008", "https://ui.adsabs.harvard.edu/abs/...")`.
pub fn parse_reflink(link: &str) -> Option<(String, String)> {
    let url = link.split("href=").nth(1)?.split(' ').next()?;
    let label = link.split('>').nth(1)?.split('<').next()?;
    Some((label.trim().to_string(), url.to_string()))
}

/// Reference labels, or plain text when a cell is not an anchor.
fn reference_labels(values: Vec<Option<String>>) -> Vec<Option<String>> {
    values
        .into_iter()
        .map(|v| {
            v.map(|v| match parse_reflink(&v) {
                Some((label, _)) => label,
                None => v,
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Standardization
// ---------------------------------------------------------------------------

/// Read a raw archive CSV and standardize it.
pub fn standardize_file(path: &Path) -> Result<Table> {
    let raw = RawTable::read(path)?;
    log::info!("read {} raw rows from {}", raw.rows, path.display());
    standardize(&raw)
}

/// Standardize raw archive CSV held in memory.
pub fn standardize_str(text: &str) -> Result<Table> {
    standardize(&RawTable::from_reader(text.as_bytes())?)
}

fn standardize(raw: &RawTable) -> Result<Table> {
    if !raw.has("pl_name") {
        bail!("raw table has no 'pl_name' column");
    }

    let mut columns: Vec<Column> = Vec::new();
    for mapping in MAPPINGS {
        if !raw.has(mapping.raw) {
            log::warn!("no {} found for {}", mapping.raw, mapping.standard);
            continue;
        }
        ingest(raw, mapping, &mut columns)?;

        let reflink = format!("{}_reflink", mapping.raw);
        if let Some(links) = raw.text(&reflink) {
            columns.push(Column::text(
                format!("{}_reference", mapping.standard),
                reference_labels(links),
            ));
        }
    }

    order_by_name(columns)
}

fn ingest(raw: &RawTable, mapping: &Mapping, columns: &mut Vec<Column>) -> Result<()> {
    let name = mapping.standard;
    match mapping.ingest {
        Ingest::Text => {
            let mut values = raw.text(mapping.raw).unwrap_or_default();
            if mapping.raw.ends_with("refname") {
                values = reference_labels(values);
            }
            columns.push(Column::text(name, values));
        }
        Ingest::Flag => {
            let values = raw.flags(mapping.raw)?.unwrap_or_default();
            columns.push(Column::flag(name, values));
        }
        Ingest::Number => {
            let values = transformed(raw.numbers(mapping.raw)?, mapping.transform);
            columns.push(Column::numeric(name, mapping.unit, values));
        }
        Ingest::WithErrors | Ingest::WithErrorsAndLimits => {
            let values = raw.numbers(mapping.raw)?.unwrap_or_default();
            let err1 = numbers_or_missing(raw, &format!("{}err1", mapping.raw), raw.rows)?;
            let err2 = numbers_or_missing(raw, &format!("{}err2", mapping.raw), raw.rows)?;
            let limits = if mapping.ingest == Ingest::WithErrorsAndLimits {
                numbers_or_missing(raw, &format!("{}lim", mapping.raw), raw.rows)?
            } else {
                vec![None; raw.rows]
            };

            let t = mapping.transform;
            let mut bounded = Vec::with_capacity(raw.rows);
            let mut upper_unc = Vec::with_capacity(raw.rows);
            let mut lower_unc = Vec::with_capacity(raw.rows);
            let mut upper_limit = Vec::with_capacity(raw.rows);
            let mut lower_limit = Vec::with_capacity(raw.rows);

            for row in 0..raw.rows {
                let value = values[row];
                // +1 marks an upper limit, -1 a lower limit, 0 or blank a measurement.
                let flag = limits[row].map(|f| f.round() as i64).unwrap_or(0);
                let measured = flag == 0;
                bounded.push(value.filter(|_| measured).map(|v| t.apply(v)));
                upper_unc.push(match (value, err1[row]) {
                    (Some(v), Some(e)) if measured => Some((t.apply(v + e) - t.apply(v)).abs()),
                    _ => None,
                });
                lower_unc.push(match (value, err2[row]) {
                    (Some(v), Some(e)) if measured => Some((t.apply(v) - t.apply(v + e)).abs()),
                    _ => None,
                });
                upper_limit.push(value.filter(|_| flag == 1).map(|v| t.apply(v)));
                lower_limit.push(value.filter(|_| flag == -1).map(|v| t.apply(v)));
            }

            let unit = mapping.unit;
            columns.push(Column::numeric(name, unit, bounded));
            columns.push(Column::numeric(format!("{name}_uncertainty_upper"), unit, upper_unc));
            columns.push(Column::numeric(format!("{name}_uncertainty_lower"), unit, lower_unc));
            if mapping.ingest == Ingest::WithErrorsAndLimits {
                columns.push(Column::numeric(format!("{name}_upper_limit"), unit, upper_limit));
                columns.push(Column::numeric(format!("{name}_lower_limit"), unit, lower_limit));
            }
        }
    }
    Ok(())
}

fn transformed(values: Option<Vec<Option<f64>>>, t: Transform) -> Vec<Option<f64>> {
    values
        .unwrap_or_default()
        .into_iter()
        .map(|v| v.map(|v| t.apply(v)))
        .collect()
}

fn numbers_or_missing(raw: &RawTable, name: &str, rows: usize) -> Result<Vec<Option<f64>>> {
    Ok(raw.numbers(name)?.unwrap_or_else(|| vec![None; rows]))
}

/// Sort rows by name and key the table on it. Rows without a name are
/// dropped; repeated names keep their first row.
fn order_by_name(columns: Vec<Column>) -> Result<Table> {
    let names = match columns.iter().find(|c| c.name == NAME_COLUMN).map(|c| &c.values) {
        Some(ColumnValues::Text(names)) => names.clone(),
        _ => bail!("standardized table has no text '{NAME_COLUMN}' column"),
    };

    let mut order: Vec<usize> = (0..names.len()).filter(|&r| names[r].is_some()).collect();
    let unnamed = names.len() - order.len();
    if unnamed > 0 {
        log::warn!("dropping {unnamed} rows without a planet name");
    }
    order.sort_by(|&a, &b| names[a].cmp(&names[b]));

    let mut seen = BTreeSet::new();
    order.retain(|&r| {
        let fresh = seen.insert(names[r].clone());
        if !fresh {
            log::warn!("duplicate planet name {:?}, keeping the first row", names[r]);
        }
        fresh
    });

    let keys = order
        .iter()
        .filter_map(|&r| names[r].clone())
        .collect();
    let columns = columns
        .into_iter()
        .map(|c| Column {
            values: c.values.take(&order),
            ..c
        })
        .collect();
    Ok(Table::new(keys, columns)?)
}
