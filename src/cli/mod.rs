pub mod export;
pub mod fetch;
pub mod setup;
pub mod sources;
pub mod ui;
