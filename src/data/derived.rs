//! Quantities calculated from the standardized columns, filling gaps in the
//! tables where the inputs allow it.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::error::Result;

use super::population::Population;

/// Gravitational constant (m³ kg⁻¹ s⁻²).
pub const G: f64 = 6.674_30e-11;
/// Stefan-Boltzmann constant (W m⁻² K⁻⁴).
pub const SIGMA_SB: f64 = 5.670_374_419e-8;
pub const SOLAR_MASS_KG: f64 = 1.988_47e30;
pub const SOLAR_RADIUS_M: f64 = 6.957e8;
pub const EARTH_MASS_KG: f64 = 5.972_17e24;
pub const EARTH_RADIUS_M: f64 = 6.378_1e6;
pub const AU_M: f64 = 1.495_978_707e11;
pub const DAY_S: f64 = 86_400.0;
/// Bolometric flux at 1 AU from the Sun (W/m²).
pub const EARTH_INSOLATION: f64 = 1361.0;
/// Boltzmann constant (J/K).
pub const K_B: f64 = 1.380_649e-23;
pub const PROTON_MASS_KG: f64 = 1.672_621_924e-27;
/// Mean molecular weight of a hydrogen-dominated atmosphere, in proton masses.
pub const MEAN_MOLECULAR_WEIGHT: f64 = 2.32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quantity {
    /// AU: table value, else Kepler's third law, else a/R* × R*.
    SemimajorAxis,
    /// Bolometric flux relative to Earth's.
    RelativeInsolation,
    /// K, zero albedo with full heat redistribution.
    EquilibriumTemperature,
    /// W, thermal emission of the whole planet at its equilibrium temperature.
    PlanetLuminosity,
    /// Earth masses: table value, else M sin i.
    KludgeMass,
    /// Fraction of starlight blocked: table value, else (Rp/R*)².
    TransitDepth,
    /// Hours: table value, else from P, a/R*, b, e and ω.
    TransitDuration,
    /// g/cm³.
    Density,
    /// m/s².
    SurfaceGravity,
    /// km/s.
    EscapeVelocity,
    /// km/s, circular-orbit speed 2πa/P.
    OrbitalVelocity,
    /// km/s, combined orbital and escape velocity.
    ImpactVelocity,
    /// Jeans parameter for atomic hydrogen at the equilibrium temperature.
    EscapeParameter,
    /// km.
    ScaleHeight,
    /// Mass divided by its mean uncertainty.
    MassSignificance,
}

impl Quantity {
    pub const ALL: [Quantity; 15] = [
        Quantity::SemimajorAxis,
        Quantity::RelativeInsolation,
        Quantity::EquilibriumTemperature,
        Quantity::PlanetLuminosity,
        Quantity::KludgeMass,
        Quantity::TransitDepth,
        Quantity::TransitDuration,
        Quantity::Density,
        Quantity::SurfaceGravity,
        Quantity::EscapeVelocity,
        Quantity::OrbitalVelocity,
        Quantity::ImpactVelocity,
        Quantity::EscapeParameter,
        Quantity::ScaleHeight,
        Quantity::MassSignificance,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Quantity::SemimajorAxis => "semimajoraxis",
            Quantity::RelativeInsolation => "relative_insolation",
            Quantity::EquilibriumTemperature => "teq",
            Quantity::PlanetLuminosity => "planet_luminosity",
            Quantity::KludgeMass => "kludge_mass",
            Quantity::TransitDepth => "transit_depth",
            Quantity::TransitDuration => "transit_duration",
            Quantity::Density => "density",
            Quantity::SurfaceGravity => "surface_gravity",
            Quantity::EscapeVelocity => "escape_velocity",
            Quantity::OrbitalVelocity => "orbital_velocity",
            Quantity::ImpactVelocity => "impact_velocity",
            Quantity::EscapeParameter => "escape_parameter",
            Quantity::ScaleHeight => "scale_height",
            Quantity::MassSignificance => "mass_significance",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            Quantity::SemimajorAxis => "AU",
            Quantity::RelativeInsolation => "earthFlux",
            Quantity::EquilibriumTemperature => "K",
            Quantity::PlanetLuminosity => "W",
            Quantity::KludgeMass => "earthMass",
            Quantity::TransitDepth => "",
            Quantity::TransitDuration => "hour",
            Quantity::Density => "g/cm3",
            Quantity::SurfaceGravity => "m/s2",
            Quantity::EscapeVelocity => "km/s",
            Quantity::OrbitalVelocity => "km/s",
            Quantity::ImpactVelocity => "km/s",
            Quantity::EscapeParameter => "",
            Quantity::ScaleHeight => "km",
            Quantity::MassSignificance => "",
        }
    }

    pub fn from_name(name: &str) -> Option<Quantity> {
        Quantity::ALL.into_iter().find(|q| q.name() == name)
    }

    pub fn compute(self, population: &Population) -> Result<Vec<Option<f64>>> {
        let values = match self {
            Quantity::SemimajorAxis => semimajor_axis(population)?,
            Quantity::RelativeInsolation => relative_insolation(population)?,
            Quantity::EquilibriumTemperature => equilibrium_temperatures(population)?,
            Quantity::PlanetLuminosity => zip2(
                equilibrium_temperatures(population)?,
                population.numeric("radius")?,
                |t, r| 4.0 * PI * (r * EARTH_RADIUS_M).powi(2) * SIGMA_SB * t.powi(4),
            ),
            Quantity::KludgeMass => {
                let mut mass = population.numeric("mass")?;
                fill(&mut mass, population.numeric_or_missing("msini")?);
                mass
            }
            Quantity::TransitDepth => {
                let mut depth = population.numeric_or_missing("transit_depth")?;
                let from_radii = zip2(
                    population.numeric_or_missing("radius")?,
                    population.numeric_or_missing("stellar_radius")?,
                    |rp, rs| (rp * EARTH_RADIUS_M / (rs * SOLAR_RADIUS_M)).powi(2),
                );
                fill(&mut depth, from_radii);
                depth
            }
            Quantity::TransitDuration => transit_duration(population)?,
            Quantity::Density => zip2(
                population.numeric("mass")?,
                population.numeric("radius")?,
                |m, r| {
                    let volume = 4.0 / 3.0 * PI * (r * EARTH_RADIUS_M).powi(3);
                    // kg/m³ → g/cm³
                    m * EARTH_MASS_KG / volume / 1000.0
                },
            ),
            Quantity::SurfaceGravity => surface_gravity(population)?,
            Quantity::EscapeVelocity => escape_velocity(population)?,
            Quantity::OrbitalVelocity => orbital_velocity(population)?,
            Quantity::ImpactVelocity => zip2(
                orbital_velocity(population)?,
                escape_velocity(population)?,
                f64::hypot,
            ),
            Quantity::EscapeParameter => {
                let binding = zip2(
                    population.numeric("mass")?,
                    population.numeric("radius")?,
                    |m, r| G * m * EARTH_MASS_KG * PROTON_MASS_KG / (r * EARTH_RADIUS_M),
                );
                zip2(binding, equilibrium_temperatures(population)?, |e, t| e / (K_B * t))
            }
            Quantity::ScaleHeight => zip2(
                equilibrium_temperatures(population)?,
                surface_gravity(population)?,
                |t, g| K_B * t / (MEAN_MOLECULAR_WEIGHT * PROTON_MASS_KG * g) / 1000.0,
            ),
            Quantity::MassSignificance => significance(population, "mass")?,
        };
        let missing = values.iter().filter(|v| v.is_none()).count();
        log::debug!(
            "{}: {missing}/{} values of {} are missing",
            population.label(),
            values.len(),
            self.name()
        );
        Ok(values)
    }
}

/// Combine two optional series element-wise; non-finite results count as missing.
fn zip2(
    a: Vec<Option<f64>>,
    b: Vec<Option<f64>>,
    f: impl Fn(f64, f64) -> f64,
) -> Vec<Option<f64>> {
    a.into_iter()
        .zip(b)
        .map(|(a, b)| Some(f(a?, b?)).filter(|v| v.is_finite()))
        .collect()
}

fn fill(values: &mut [Option<f64>], fallback: impl IntoIterator<Item = Option<f64>>) {
    for (value, candidate) in values.iter_mut().zip(fallback) {
        if value.is_none() {
            *value = candidate;
        }
    }
}

fn semimajor_axis(population: &Population) -> Result<Vec<Option<f64>>> {
    let mut a = population.numeric_or_missing("semimajoraxis")?;

    let from_kepler = zip2(
        population.numeric_or_missing("period")?,
        population.numeric_or_missing("stellar_mass")?,
        |period, mass| {
            let p = period * DAY_S;
            (G * mass * SOLAR_MASS_KG * p * p / (4.0 * PI * PI)).cbrt() / AU_M
        },
    );
    fill(&mut a, from_kepler);

    let from_transit = zip2(
        population.numeric_or_missing("transit_ar")?,
        population.numeric_or_missing("stellar_radius")?,
        |ar, radius| ar * radius * SOLAR_RADIUS_M / AU_M,
    );
    fill(&mut a, from_transit);
    Ok(a)
}

/// a/R*: table value, else the semimajor axis over the stellar radius.
fn scaled_semimajor_axis(population: &Population) -> Result<Vec<Option<f64>>> {
    let mut ar = population.numeric_or_missing("transit_ar")?;
    let from_axis = zip2(
        semimajor_axis(population)?,
        population.numeric_or_missing("stellar_radius")?,
        |a, radius| a * AU_M / (radius * SOLAR_RADIUS_M),
    );
    fill(&mut ar, from_axis);
    Ok(ar)
}

/// Eccentricities with missing values taken as circular, paired with the
/// longitude of periastron (zero for circular orbits).
fn orbit_shape(population: &Population) -> Result<Vec<(f64, Option<f64>)>> {
    let e = population.numeric_or_missing("eccentricity")?;
    let omega = population.numeric_or_missing("omega")?;
    Ok(e.into_iter()
        .zip(omega)
        .map(|(e, omega)| {
            let e = e.unwrap_or(0.0);
            let omega = if e == 0.0 { Some(0.0) } else { omega.map(f64::to_radians) };
            (e, omega)
        })
        .collect())
}

fn transit_duration(population: &Population) -> Result<Vec<Option<f64>>> {
    let mut duration = population.numeric_or_missing("transit_duration")?;
    let period = population.numeric_or_missing("period")?;
    let ar = scaled_semimajor_axis(population)?;
    let shape = orbit_shape(population)?;
    let inclination = population.numeric_or_missing("inclination")?;
    let mut b = population.numeric_or_missing("transit_b")?;

    let from_inclination = ar
        .iter()
        .zip(&inclination)
        .zip(&shape)
        .map(|((&ar, &i), &(e, omega))| {
            let (ar, i, omega) = (ar?, i?, omega?);
            Some(ar * i.to_radians().cos() * (1.0 - e * e) / (1.0 + e * omega.sin()))
        });
    fill(&mut b, from_inclination);

    let estimated = period
        .iter()
        .zip(&ar)
        .zip(b.iter().zip(&shape))
        .map(|((&p, &ar), (&b, &(e, omega)))| {
            let (p, ar, b, omega) = (p?, ar?, b?, omega?);
            let circular = p / PI / ar * (1.0 - b * b).sqrt();
            let factor = (1.0 - e * e).sqrt() / (1.0 + e * omega.sin());
            Some(circular * factor * 24.0).filter(|d| d.is_finite())
        });
    fill(&mut duration, estimated);
    Ok(duration)
}

fn relative_insolation(population: &Population) -> Result<Vec<Option<f64>>> {
    let luminosity = population.numeric_or_missing("stellar_luminosity")?;
    Ok(zip2(luminosity, semimajor_axis(population)?, |l, a| l / (a * a)))
}

fn equilibrium_temperature(relative_insolation: f64) -> f64 {
    (relative_insolation * EARTH_INSOLATION / (4.0 * SIGMA_SB)).powf(0.25)
}

fn equilibrium_temperatures(population: &Population) -> Result<Vec<Option<f64>>> {
    Ok(relative_insolation(population)?
        .into_iter()
        .map(|s| s.map(equilibrium_temperature))
        .collect())
}

fn surface_gravity(population: &Population) -> Result<Vec<Option<f64>>> {
    Ok(zip2(
        population.numeric("mass")?,
        population.numeric("radius")?,
        |m, r| G * m * EARTH_MASS_KG / (r * EARTH_RADIUS_M).powi(2),
    ))
}

fn escape_velocity(population: &Population) -> Result<Vec<Option<f64>>> {
    Ok(zip2(
        population.numeric("mass")?,
        population.numeric("radius")?,
        |m, r| (2.0 * G * m * EARTH_MASS_KG / (r * EARTH_RADIUS_M)).sqrt() / 1000.0,
    ))
}

fn orbital_velocity(population: &Population) -> Result<Vec<Option<f64>>> {
    Ok(zip2(
        semimajor_axis(population)?,
        population.numeric_or_missing("period")?,
        |a, p| 2.0 * PI * a * AU_M / (p * DAY_S) / 1000.0,
    ))
}

/// `value / uncertainty` per row, using the mean of the upper and lower
/// uncertainties (or whichever one exists). A zero uncertainty gives an
/// infinite significance. Undefined when the value or both uncertainties
/// are missing.
pub(crate) fn significance(population: &Population, column: &str) -> Result<Vec<Option<f64>>> {
    let values = population.numeric(column)?;
    let upper = population.numeric_or_missing(&format!("{column}_uncertainty_upper"))?;
    let lower = population.numeric_or_missing(&format!("{column}_uncertainty_lower"))?;

    Ok(values
        .into_iter()
        .zip(upper.into_iter().zip(lower))
        .map(|(value, (upper, lower))| {
            let value = value?;
            let uncertainty = match (upper, lower) {
                (Some(u), Some(l)) => (u.abs() + l.abs()) / 2.0,
                (Some(u), None) => u.abs(),
                (None, Some(l)) => l.abs(),
                (None, None) => return None,
            };
            if uncertainty == 0.0 {
                Some(f64::INFINITY)
            } else {
                Some(value / uncertainty)
            }
        })
        .collect())
}
