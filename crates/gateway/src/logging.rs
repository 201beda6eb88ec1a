use crate::config::Config;

pub const SERVICE_NAME: &str = "gateway";

pub fn setup_logging(config: &Config) {
    common::setup_logging(SERVICE_NAME, config.log_level.as_str(), config.environment);
}
