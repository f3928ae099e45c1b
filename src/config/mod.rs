pub mod loader;
pub mod schema;
pub mod settings;

pub use loader::ConfigLoader;
pub use schema::{OutputConfig, RunConfig, TargetConfig};
pub use settings::Settings;
