#[cfg(test)]
mod test;

pub mod analysis;
pub mod catalog;
pub mod composite;
pub mod error;
pub mod experiment;
pub mod field;
pub mod season;
pub mod significance;
pub mod stats;

pub mod constants;
pub mod parameters;
pub mod utils;
