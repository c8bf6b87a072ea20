mod settings;

pub use settings::{
    DEFAULT_API_BASE, DiscordConfig, HttpConfig, RetrievalConfig, Settings, load_settings,
    settings_from,
};
