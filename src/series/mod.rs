//! Pure transformations over series: gap detection, merging, cleaning,
//! interpolation and the CSV exchange format.

pub mod clean;
pub mod export;
pub mod gaps;
pub mod interpolate;
pub mod reconcile;

pub use clean::clean;
pub use export::series_to_csv;
pub use gaps::find_missing;
pub use interpolate::InterpolationStrategy;
pub use reconcile::merge;
