/// Data layer: schema, records, loading and writing.
///
/// Architecture:
/// ```text
///  .arff / .csv / .json / .parquet
///        │
///        ▼
///   ┌──────────┐      ┌──────────┐
///   │  loader   │ ◀──  │  schema   │  TITANIC: attributes, levels, label
///   └──────────┘      └──────────┘
///        │                  ▲
///        ▼                  │
///   ┌──────────┐            │
///   │ Dataset   │  Vec<Passenger>, typed nominal values
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  writer   │  Dataset → .arff / .csv / .parquet
///   └──────────┘
/// ```

pub mod loader;
pub mod model;
pub mod schema;
pub mod writer;

pub use loader::load_dataset;
pub use model::{Dataset, Nominal, Passenger, Pclass, Sex, Survival};
pub use schema::TITANIC;
