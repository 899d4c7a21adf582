use std::{
    borrow::Cow,
    path::{Path, PathBuf},
};

use hashlink::LinkedHashMap;
use saphyr::{LoadableYamlNode, Scalar, Yaml};
use snafu::prelude::*;
use tracing::debug;

use crate::ext::BestEffortPathExt;

pub const SETTINGS_FILE_NAME: &str = "multitool.yaml";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GithubSettings {
    pub repo: Option<String>,
    pub key: Option<String>,
    pub api_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JiraSettings {
    pub instance_url: Option<String>,
    pub project: Option<String>,
    pub user: Option<String>,
    pub board: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BigQuerySettings {
    pub project: Option<String>,
    pub dataset: Option<String>,
    pub table: Option<String>,
    pub api_url: Option<String>,
}

/// Defaults read from `multitool.yaml`. Flags and environment variables win over them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    pub github: GithubSettings,
    pub jira: JiraSettings,
    pub bigquery: BigQuerySettings,
}

type Mapping<'a> = LinkedHashMap<Yaml<'a>, Yaml<'a>>;

impl Settings {
    /// Reads the explicit settings file, or `multitool.yaml` in `root` when it exists.
    pub fn read(explicit: Option<&Path>, root: &Path) -> Result<Self, SettingsError> {
        match explicit {
            Some(path) => Self::from_path(path),
            None => {
                let path = root.join(SETTINGS_FILE_NAME);
                if path.is_file() {
                    Self::from_path(&path)
                } else {
                    debug!("No settings file at {}", path.best_effort_path_display());
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_path(path: &Path) -> Result<Self, SettingsError> {
        debug!("Reading settings file: {}", path.best_effort_path_display());
        let contents = std::fs::read_to_string(path).context(ReadSnafu {
            file_path: path.to_path_buf(),
        })?;
        contents.as_str().try_into()
    }

    fn section<'a, 'b>(
        top_level: &'b Mapping<'a>,
        name: &'static str,
    ) -> Result<Option<&'b Mapping<'a>>, SettingsError> {
        match top_level.get(&Yaml::Value(Scalar::String(Cow::Borrowed(name)))) {
            None => Ok(None),
            Some(Yaml::Value(Scalar::Null)) => Ok(None),
            Some(value) => value
                .as_mapping()
                .map(Some)
                .context(SectionNotMapSnafu { section: name }),
        }
    }

    fn field(section: Option<&Mapping<'_>>, name: &'static str) -> Option<String> {
        let value = section?.get(&Yaml::Value(Scalar::String(Cow::Borrowed(name))))?;
        match value {
            Yaml::Value(Scalar::String(s)) => Some(s.to_string()),
            Yaml::Value(Scalar::Integer(i)) => Some(i.to_string()),
            other => {
                debug!("Skipping non-scalar settings value for '{}': {:?}", name, other);
                None
            }
        }
    }
}

impl TryFrom<&str> for Settings {
    type Error = SettingsError;

    fn try_from(contents: &str) -> Result<Self, Self::Error> {
        let documents = Yaml::load_from_str(contents).context(ParseSnafu)?;
        let Some(document) = documents.first() else {
            return Ok(Self::default());
        };
        let top_level = document.as_mapping().context(TopLevelNotMapSnafu)?;

        let github = Self::section(top_level, "github")?;
        let jira = Self::section(top_level, "jira")?;
        let bigquery = Self::section(top_level, "bigquery")?;

        Ok(Settings {
            github: GithubSettings {
                repo: Self::field(github, "repo"),
                key: Self::field(github, "key"),
                api_url: Self::field(github, "api_url"),
            },
            jira: JiraSettings {
                instance_url: Self::field(jira, "instance_url"),
                project: Self::field(jira, "project"),
                user: Self::field(jira, "user"),
                board: Self::field(jira, "board"),
            },
            bigquery: BigQuerySettings {
                project: Self::field(bigquery, "project"),
                dataset: Self::field(bigquery, "dataset"),
                table: Self::field(bigquery, "table"),
                api_url: Self::field(bigquery, "api_url"),
            },
        })
    }
}

#[derive(Debug, Snafu)]
pub enum SettingsError {
    #[snafu(display("Failed to read the settings file: {}", file_path.best_effort_path_display()))]
    ReadError {
        file_path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Failed to parse the settings file"))]
    ParseError { source: saphyr::ScanError },
    #[snafu(display("Top level of the settings file should be a map"))]
    TopLevelNotMap,
    #[snafu(display("Settings section '{}' should be a map", section))]
    SectionNotMap { section: String },
}
