use once_cell::sync::Lazy;
use std::env;
use std::str::FromStr;

pub struct Config {
    database_url: String,
    mqtt_client_id: String,
    mqtt_host: String,
    mqtt_port: u16,
    server_port: u16,
    telemetry_workers: usize,
    telemetry_queue_size: usize,
}

impl Config {
    pub fn database_url(&self) -> String {
        self.database_url.clone()
    }

    pub fn mqtt_client_id(&self) -> String {
        self.mqtt_client_id.clone()
    }

    pub fn mqtt_host(&self) -> String {
        self.mqtt_host.clone()
    }

    pub fn mqtt_port(&self) -> u16 {
        self.mqtt_port
    }

    pub fn server_port(&self) -> u16 {
        self.server_port
    }

    pub fn telemetry_workers(&self) -> usize {
        self.telemetry_workers.max(1)
    }

    pub fn telemetry_queue_size(&self) -> usize {
        self.telemetry_queue_size.max(1)
    }
}

pub static CONFIG: Lazy<Config> = Lazy::new(|| {
    dotenv::dotenv().ok();

    Config {
        database_url: env_or("DATABASE_URL", "sqlite://sprout.db"),
        mqtt_client_id: env_or("MQTT_CLIENT_ID", "sprout-backend"),
        mqtt_host: env_or("MQTT_HOST", "localhost"),
        mqtt_port: env_or_parsed("MQTT_PORT", 1883),
        server_port: env_or_parsed("SERVER_PORT", 8000),
        telemetry_workers: env_or_parsed("TELEMETRY_WORKERS", 4),
        telemetry_queue_size: env_or_parsed("TELEMETRY_QUEUE_SIZE", 64),
    }
});

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_owned())
}

fn env_or_parsed<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(default)
}
