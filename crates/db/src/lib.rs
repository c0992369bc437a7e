pub mod connection;
pub mod migrations;
pub mod repositories;
pub mod seed;

pub use connection::{connect, connect_with_config, connect_with_settings, ping, DbPool};
pub use seed::{seed_catalog, SeedResult};
