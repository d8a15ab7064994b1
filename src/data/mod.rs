/// Data layer: core types, loading, standardization and filtering.
///
/// Architecture:
/// ```text
///  raw archive .csv          .parquet / .json / .csv
///        │                           │
///        ▼                           ▼
///   ┌─────────────┐            ┌──────────┐
///   │ standardize │            │  loader  │  parse file → Table
///   └─────────────┘            └──────────┘
///        │                           │
///        └────────────┬──────────────┘
///                     ▼
///              ┌──────────────┐
///              │  Population  │  Arc<Table> + selected rows
///              └──────────────┘
///                     │
///          ┌──────────┴──────────┐
///          ▼                     ▼
///   ┌──────────┐          ┌───────────┐
///   │  filter  │          │  derived  │  calculated quantities
///   └──────────┘          └───────────┘
///   predicates → new Population
/// ```

pub mod derived;
pub mod filter;
pub mod loader;
pub mod model;
pub mod population;
pub mod standardize;
