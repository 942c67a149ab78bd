/// Source tag written into every record.
pub const SOURCE_TAG: &str = "cartelera";

/// Placeholder for any detail the listing page omits.
pub const UNKNOWN: &str = "unknown";

/// Default root for local output and default prefix inside object stores.
pub const DEFAULT_OUTPUT_DIR: &str = "data/scraped_movies_data";
pub const IMAGES_DIR: &str = "images";
pub const MOVIES_DIR: &str = "movies";

pub const RECORD_EXTENSION: &str = ".jsonl";

pub const DEFAULT_MAX_ENTRIES: usize = 60;
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";

/// Poster extensions the catalog is known to serve. Others are still stored.
pub const VALID_IMAGE_EXTENSIONS: [&str; 4] = [".jpg", ".jpeg", ".png", ".webp"];

// Catalog page structure
pub const ENTRY_SELECTOR: &str = "article.evento";
pub const TITLE_SELECTOR: &str = "h2.name";
pub const METADATA_SELECTOR: &str = "ul.event-data li.text strong";
pub const POSTER_SELECTOR: &str = "div.poster-container a img";
pub const POSTER_ATTR: &str = "src";

// Environment overrides
pub const ENV_BASE_URL: &str = "CARTELERA_BASE_URL";
pub const ENV_OBJECT_STORE_ENDPOINT: &str = "CARTELERA_OBJECT_STORE_ENDPOINT";
