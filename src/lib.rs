pub mod app;
pub mod capture;
pub mod config;
pub mod derive;
pub mod error;
pub mod explain;
pub mod lookup;
pub mod products;
pub mod scan;
pub mod state;
