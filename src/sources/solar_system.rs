use crate::cache::CacheDirectory;
use crate::data::model::{Column, Table};
use crate::data::population::Population;
use crate::data::standardize::NAME_COLUMN;

use super::{LoadOptions, SourceId, SourceLoader};

/// The eight Solar System planets, in Earth units around a one-solar-mass star.
#[derive(Debug, Clone, Copy, Default)]
pub struct SolarSystem;

struct Planet {
    name: &'static str,
    mass: f64,
    radius: f64,
    semimajoraxis: f64,
    period: f64,
    eccentricity: f64,
    inclination: f64,
}

const PLANETS: [Planet; 8] = [
    planet("Mercury", 0.0553, 0.383, 0.387, 87.97, 0.2056, 7.0),
    planet("Venus", 0.815, 0.949, 0.723, 224.70, 0.0068, 3.39),
    planet("Earth", 1.0, 1.0, 1.0, 365.256, 0.0167, 0.0),
    planet("Mars", 0.107, 0.532, 1.524, 686.98, 0.0934, 1.85),
    planet("Jupiter", 317.8, 11.21, 5.203, 4332.59, 0.0484, 1.31),
    planet("Saturn", 95.2, 9.45, 9.537, 10759.22, 0.0542, 2.49),
    planet("Uranus", 14.5, 4.01, 19.19, 30685.4, 0.0472, 0.77),
    planet("Neptune", 17.1, 3.88, 30.07, 60189.0, 0.0086, 1.77),
];

const fn planet(
    name: &'static str,
    mass: f64,
    radius: f64,
    semimajoraxis: f64,
    period: f64,
    eccentricity: f64,
    inclination: f64,
) -> Planet {
    Planet {
        name,
        mass,
        radius,
        semimajoraxis,
        period,
        eccentricity,
        inclination,
    }
}

/// Relative uncertainty attached to the planets' masses and radii.
const RELATIVE_UNCERTAINTY: f64 = 1e-4;

impl SolarSystem {
    pub fn table() -> anyhow::Result<Table> {
        let each = |f: fn(&Planet) -> f64| PLANETS.iter().map(|p| Some(f(p))).collect::<Vec<_>>();
        let constant = |x: f64| vec![Some(x); PLANETS.len()];
        let keys: Vec<String> = PLANETS.iter().map(|p| p.name.to_string()).collect();

        let mass_error = each(|p| p.mass * RELATIVE_UNCERTAINTY);
        let radius_error = each(|p| p.radius * RELATIVE_UNCERTAINTY);
        let columns = vec![
            Column::text(NAME_COLUMN, keys.iter().cloned().map(Some).collect()),
            Column::text("hostname", vec![Some("Sun".to_string()); PLANETS.len()]),
            Column::numeric("mass", "earthMass", each(|p| p.mass)),
            Column::numeric("mass_uncertainty_upper", "earthMass", mass_error.clone()),
            Column::numeric("mass_uncertainty_lower", "earthMass", mass_error),
            Column::numeric("radius", "earthRad", each(|p| p.radius)),
            Column::numeric("radius_uncertainty_upper", "earthRad", radius_error.clone()),
            Column::numeric("radius_uncertainty_lower", "earthRad", radius_error),
            Column::numeric("semimajoraxis", "AU", each(|p| p.semimajoraxis)),
            Column::numeric("period", "day", each(|p| p.period)),
            Column::numeric("eccentricity", "", each(|p| p.eccentricity)),
            Column::numeric("inclination", "deg", each(|p| p.inclination)),
            Column::numeric("stellar_mass", "solMass", constant(1.0)),
            Column::numeric("stellar_radius", "solRad", constant(1.0)),
            Column::numeric("stellar_luminosity", "solLum", constant(1.0)),
            Column::numeric("stellar_teff", "K", constant(5772.0)),
        ];
        Ok(Table::new(keys, columns)?)
    }
}

impl SourceLoader for SolarSystem {
    fn load(&self, _cache: &CacheDirectory, _options: &LoadOptions) -> anyhow::Result<Population> {
        Ok(Population::new(SourceId::SolarSystem.label(), Self::table()?))
    }
}
