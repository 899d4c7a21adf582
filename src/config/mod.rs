mod settings;

pub use settings::{BigQuerySettings, GithubSettings, JiraSettings, Settings, SettingsError};
