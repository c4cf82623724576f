use std::env;

pub const DEFAULT_MERGE_RADIUS_METERS: f64 = 150.0;
pub const DEFAULT_CLASSIFICATION_BATCH_SIZE: i64 = 200;
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
pub const DEFAULT_MAX_DB_CONNECTIONS: u32 = 10;

pub struct StorageSettings {
    pub base_url: String,
    pub api_key: String,
    pub bucket: String,
}

pub struct ClassificationSettings {
    pub merge_radius_meters: f64,
    pub batch_size: i64,
}

pub struct Config {
    pub database_url: String,
    pub max_db_connections: u32,
    pub frontend_origin: String,
    pub listen_port: u16,
    pub max_upload_bytes: usize,
    pub storage: StorageSettings,
    pub classification: ClassificationSettings,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv::dotenv().ok(); // Load .env file

        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let frontend_origin = env::var("FRONTEND_ORIGIN").expect("FRONTEND_ORIGIN must be set");

        let storage = StorageSettings {
            base_url: env::var("STORAGE_URL")
                .expect("STORAGE_URL must be set")
                .trim_end_matches('/')
                .to_string(),
            api_key: env::var("STORAGE_API_KEY").expect("STORAGE_API_KEY must be set"),
            bucket: env::var("STORAGE_BUCKET").expect("STORAGE_BUCKET must be set"),
        };

        let classification = ClassificationSettings {
            merge_radius_meters: env_parse("MERGE_RADIUS_METERS", DEFAULT_MERGE_RADIUS_METERS),
            batch_size: env_parse("CLASSIFICATION_BATCH_SIZE", DEFAULT_CLASSIFICATION_BATCH_SIZE),
        };

        Config {
            database_url,
            max_db_connections: env_parse("DATABASE_MAX_CONNECTIONS", DEFAULT_MAX_DB_CONNECTIONS),
            frontend_origin,
            listen_port: env_parse("PORT", 3000),
            max_upload_bytes: env_parse("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES),
            storage,
            classification,
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}
