//! End-to-end tests: sources, cache lifecycle and summaries.

use exopop::sources::RAW_ARCHIVE_TABLE;
use exopop::{
    Atlas, CacheDirectory, LoadOptions, PopulationError, Predicate, SourceId, Split, summarize,
};

const RAW: &str = "\
# This file was produced by the NASA Exoplanet Archive
# COLUMN pl_name: Planet Name
pl_name,hostname,discoverymethod,disc_facility,tran_flag,pl_bmasse,pl_bmasseerr1,pl_bmasseerr2,pl_bmasselim,pl_rade,pl_radeerr1,pl_radeerr2,pl_radelim,st_mass,st_lum,pl_orbper
TOI-700 d,TOI-700,Transit,Transiting Exoplanet Survey Satellite (TESS),1,,,,,1.19,0.11,-0.08,0,0.42,-1.6,37.42
Kepler-22 b,Kepler-22,Transit,Kepler,1,9.1,29.6,-9.1,1,2.38,0.13,-0.13,0,0.97,-0.1,289.86
51 Peg b,51 Peg,Radial Velocity,Haute-Provence Observatory,0,150.0,8.0,-8.0,0,,,,,1.09,0.13,4.23
HD 209458 b,HD 209458,Transit,Multiple Observatories,1,232.0,5.0,-5.0,0,15.6,0.2,-0.2,0,1.12,0.2,3.52
";

fn atlas() -> (tempfile::TempDir, Atlas) {
    let dir = tempfile::tempdir().unwrap();
    let cache = CacheDirectory::new(dir.path());
    cache.ensure().unwrap();
    (dir, Atlas::with_cache(cache))
}

fn write_raw(atlas: &Atlas) {
    std::fs::write(atlas.cache().raw_path(RAW_ARCHIVE_TABLE), RAW).unwrap();
}

#[test]
fn solar_system_mass_split_partitions_all_planets() {
    let (_dir, atlas) = atlas();
    let planets = atlas.load(SourceId::SolarSystem, &LoadOptions::default()).unwrap();
    assert_eq!(planets.len(), 8);

    let good = planets.filter(&Predicate::good_mass(2.5)).unwrap();
    let bad = planets.filter(&Predicate::bad_mass(2.5)).unwrap();
    assert_eq!(good.len() + bad.len(), 8);
    assert!(good.key_set().is_disjoint(&bad.key_set()));
}

#[test]
fn by_index_zero_is_first_row() {
    let (_dir, atlas) = atlas();
    let planets = atlas.from_source("solar-system", &LoadOptions::default()).unwrap();
    let first = planets.by_index(0).unwrap();
    assert_eq!(first.len(), 1);
    assert_eq!(first.key(0), planets.key(0));
    assert_eq!(first.key(0), Some("Mercury"));
    assert_eq!(planets.by_index(-1).unwrap().key(0), Some("Neptune"));
}

#[test]
fn summarize_requires_input() {
    assert!(matches!(summarize(&[]), Err(PopulationError::EmptyInput)));
}

#[test]
fn missing_raw_table_is_source_unavailable() {
    let (_dir, atlas) = atlas();
    let err = atlas
        .from_source("confirmed-exoplanets", &LoadOptions::default())
        .unwrap_err();
    match err {
        PopulationError::SourceUnavailable { source_id, reason } => {
            assert_eq!(source_id, "confirmed-exoplanets");
            assert!(reason.contains("pscomppars.csv"), "{reason}");
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn exoplanets_load_split_and_summarize() {
    let (_dir, atlas) = atlas();
    write_raw(&atlas);

    let confirmed = atlas
        .load(SourceId::ConfirmedExoplanets, &LoadOptions::default())
        .unwrap();
    assert_eq!(
        confirmed.keys().collect::<Vec<_>>(),
        vec!["51 Peg b", "HD 209458 b", "Kepler-22 b", "TOI-700 d"]
    );

    // Kepler-22 b only has an upper limit and TOI-700 d no mass at all.
    let (good, bad) = confirmed.split(Split::Mass { sigma: 2.5 }).unwrap();
    assert_eq!(good.keys().collect::<Vec<_>>(), vec!["51 Peg b", "HD 209458 b"]);
    assert!(bad.is_empty());

    let kepler = confirmed.filter(&Predicate::kepler()).unwrap();
    assert_eq!(kepler.keys().collect::<Vec<_>>(), vec!["Kepler-22 b"]);
    let space = confirmed.filter(&Predicate::space()).unwrap();
    assert_eq!(space.len(), 2);

    let transiting = atlas
        .load(SourceId::TransitingExoplanets, &LoadOptions::default())
        .unwrap();
    let summary = summarize(&[confirmed.clone(), transiting, good]).unwrap();
    assert_eq!(summary.len(), 3);
    assert_eq!(summary.series[1].rows, 3);
    assert_eq!(summary.series[0].discovery_methods["Transit"], 3);
    assert_eq!(confirmed.len(), 4);
}

#[test]
fn resets_keep_loaded_populations_valid() {
    let (_dir, atlas) = atlas();
    write_raw(&atlas);
    let standardized = atlas.cache().standardized_path("confirmed-exoplanets");

    let before = atlas
        .load(SourceId::ConfirmedExoplanets, &LoadOptions::default())
        .unwrap();
    assert!(standardized.exists());

    atlas.reset_standardized_only().unwrap();
    assert!(!standardized.exists());
    assert_eq!(before.len(), 4);

    // Re-standardized from the raw table that survived the reset.
    let again = atlas
        .load(SourceId::ConfirmedExoplanets, &LoadOptions::default())
        .unwrap();
    assert_eq!(again.keys().collect::<Vec<_>>(), before.keys().collect::<Vec<_>>());
    assert!(standardized.exists());

    atlas.reset_all().unwrap();
    assert!(matches!(
        atlas.load(SourceId::ConfirmedExoplanets, &LoadOptions::default()),
        Err(PopulationError::SourceUnavailable { .. })
    ));
    assert_eq!(before.numeric("mass").unwrap().len(), 4);
}
