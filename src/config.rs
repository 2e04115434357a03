use std::{env, fmt::Display, str::FromStr};

/// Runtime settings, read once at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub mongodb_uri: String,
    pub host: String,
    pub port: u16,
    pub auth_secret: String,
    pub seed_vendors: bool,
}

impl Config {
    pub fn from_env() -> Self {
        Config {
            mongodb_uri: require("MONGODB_URI"),
            host: try_load("HOST", "0.0.0.0"),
            port: try_load("PORT", "8080"),
            auth_secret: require("AUTH_SECRET"),
            seed_vendors: try_load("SEED_VENDORS", "false"),
        }
    }

    pub fn bind_addr(&self) -> (String, u16) {
        (self.host.clone(), self.port)
    }
}

fn require(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("You need to add {key} to the env"))
}

fn try_load<T: FromStr>(key: &str, default: &str) -> T
where
    T::Err: Display,
{
    env::var(key)
        .unwrap_or_else(|_| {
            log::info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .unwrap_or_else(|e| panic!("Invalid {key} value: {e}"))
}
