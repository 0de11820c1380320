pub mod aggregate;
pub mod aqi;
pub mod config;
pub mod error;
pub mod fetch;
pub mod forecast;
pub mod geo;
pub mod heatmap;
pub mod output;
pub mod reading;
pub mod sources;
pub mod stats;
