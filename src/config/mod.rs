mod config;
mod opts;
mod settings;

pub use config::{Config, LimitsSection, LoggingSection, ServerSection, TimeoutsSection};
pub use opts::Opts;
pub use settings::Settings;
