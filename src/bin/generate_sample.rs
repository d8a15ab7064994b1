//! Writes a deterministic synthetic archive table to `<cache>/raw/pscomppars.csv`
//! so the exoplanet sources can be loaded offline.
//!
//! ```bash
//! generate_sample [CACHE_DIR]
//! ```

use anyhow::{Context, Result};

use exopop::sources::RAW_ARCHIVE_TABLE;
use exopop::{AtlasConfig, CacheDirectory};

const PLANETS: usize = 400;

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Uniform in log space between `low` and `high`.
    fn log_uniform(&mut self, low: f64, high: f64) -> f64 {
        let (a, b) = (low.log10(), high.log10());
        10f64.powf(a + (b - a) * self.next_f64())
    }

    fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }

    fn pick<'a>(&mut self, items: &[&'a str]) -> &'a str {
        items[(self.next_u64() % items.len() as u64) as usize]
    }
}

/// (discovery method, facility, transit flag)
const DISCOVERIES: &[(&str, &str, bool)] = &[
    ("Transit", "Kepler", true),
    ("Transit", "K2", true),
    ("Transit", "Transiting Exoplanet Survey Satellite (TESS)", true),
    ("Transit", "SuperWASP", true),
    ("Transit", "HATNet", true),
    ("Radial Velocity", "W. M. Keck Observatory", false),
    ("Radial Velocity", "La Silla Observatory", false),
    ("Imaging", "Paranal Observatory", false),
    ("Microlensing", "OGLE", false),
];

const HEADER: &[&str] = &[
    "pl_name", "hostname", "pl_letter", "sy_snum", "sy_pnum",
    "discoverymethod", "disc_year", "disc_facility", "tran_flag", "rv_flag",
    "pl_orbper", "pl_orbpererr1", "pl_orbpererr2", "pl_orbperlim",
    "pl_rade", "pl_radeerr1", "pl_radeerr2", "pl_radelim",
    "pl_bmasse", "pl_bmasseerr1", "pl_bmasseerr2", "pl_bmasselim",
    "pl_bmasse_reflink",
    "st_teff", "st_rad", "st_mass", "st_lum", "sy_dist",
];

fn number(x: f64) -> String {
    format!("{x:.4}")
}

fn main() -> Result<()> {
    env_logger::init();

    let cache = match std::env::args().nth(1) {
        Some(dir) => CacheDirectory::new(dir),
        None => CacheDirectory::resolve(&AtlasConfig::default())?,
    };
    cache.ensure()?;
    let output = cache.raw_path(RAW_ARCHIVE_TABLE);

    let mut rng = SimpleRng::new(42);
    let mut writer = csv::Writer::from_path(&output)
        .with_context(|| format!("creating {}", output.display()))?;
    writer.write_record(HEADER)?;

    let letters = ["b", "c"];
    for i in 0..PLANETS {
        let (method, facility, transiting) = DISCOVERIES[i % DISCOVERIES.len()];
        let host = format!("SYN-{:04}", i / 2);
        let letter = letters[i % 2];

        let st_mass = rng.log_uniform(0.3, 1.8);
        let st_rad = st_mass.powf(0.8);
        let st_lum = st_mass.powf(4.0);
        let st_teff = 5772.0 * (st_lum / (st_rad * st_rad)).powf(0.25);

        let period = rng.log_uniform(0.5, 3000.0);
        let radius = rng.log_uniform(0.5, 20.0);
        let mass = if radius < 1.5 {
            radius.powf(3.7)
        } else {
            2.7 * radius.powf(1.3)
        };
        // Relative mass errors from 5% to 100%, so both sides of a
        // significance split are populated.
        let mass_error = mass * rng.log_uniform(0.05, 1.0);
        let radius_error = radius * rng.log_uniform(0.01, 0.2);
        let mass_is_limit = rng.chance(0.05);

        let radius_cells = if transiting {
            [number(radius), number(radius_error), number(-radius_error), "0".into()]
        } else {
            Default::default()
        };
        let mass_cells = if rng.chance(0.1) {
            Default::default()
        } else {
            [
                number(mass),
                number(mass_error),
                number(-mass_error),
                (if mass_is_limit { "1" } else { "0" }).to_string(),
            ]
        };
        let reflink = format!(
            "<a refstr=SYN_{i} href=https://example.org/ref/{i} target=ref>{} et al. {}</a>",
            rng.pick(&["Smith", "Garcia", "Chen", "Okafor"]),
            1995 + i % 30
        );

        let mut record: Vec<String> = vec![
            format!("{host} {letter}"),
            host,
            letter.to_string(),
            "1".into(),
            "2".into(),
            method.into(),
            (1995 + i % 30).to_string(),
            facility.into(),
            (transiting as u8).to_string(),
            ((!transiting) as u8).to_string(),
            number(period),
            number(period * 1e-4),
            number(-period * 1e-4),
            "0".into(),
        ];
        record.extend(radius_cells);
        record.extend(mass_cells);
        record.push(reflink);
        record.extend([
            number(st_teff),
            number(st_rad),
            number(st_mass),
            number(st_lum.log10()),
            number(rng.log_uniform(10.0, 1000.0)),
        ]);
        writer.write_record(&record)?;
    }
    writer.flush()?;

    println!("Wrote {PLANETS} planets to {}", output.display());
    Ok(())
}
