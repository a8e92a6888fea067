// Settings module
// Application settings persisted as JSON in the app directory

pub mod settings;

pub use settings::{AppSettings, SettingsError};
