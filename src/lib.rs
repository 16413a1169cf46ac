pub mod config;
pub mod dashboard;
pub mod export;
pub mod live;
pub mod logger;
pub mod metrics;
pub mod normalize;
pub mod rankings;
pub mod records;
pub mod state;
pub mod summary;
pub mod tables;
