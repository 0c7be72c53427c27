pub mod almanac;
pub mod analysis;
pub mod audit;
pub mod config;
pub mod dataset;
pub mod day;
pub mod lock;
pub mod paths;
pub mod sources;
pub mod store;
pub mod util;
pub mod warn;
