use std::path::{Path, PathBuf};

use crate::config::{Dataset, DatasetParams, DatasetSource};
use crate::errors::{ImportError, Result};
use crate::mapping::RawRecord;
use crate::template::QueryTemplate;

pub const PARAMS_FILE: &str = "params.json";
pub const STATIC_DATA_FILE: &str = "data.json";
pub const QUERY_EXTENSION: &str = "sparql";

/// A directory of datasets, one sub-directory each.
///
/// ```text
/// datasets/
///   historical-events/
///     params.json
///     query.sparql
///   countries/
///     params.json
///     data.json
/// ```
pub struct DatasetCatalog {
    root: PathBuf,
}

impl DatasetCatalog {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Names of every dataset directory, sorted.
    pub async fn names(&self) -> Result<Vec<String>> {
        let mut entries = tokio::fs::read_dir(&self.root).await.map_err(|err| {
            ImportError::Config(format!(
                "cannot read datasets directory {}: {err}",
                self.root.display()
            ))
        })?;

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.starts_with('.') {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    /// Loads every dataset, or only those named in `only`.
    pub async fn discover(&self, only: Option<&[String]>) -> Result<Vec<Dataset>> {
        let available = self.names().await?;

        let selected = match only {
            Some(requested) => {
                if let Some(missing) = requested.iter().find(|name| !available.contains(name)) {
                    return Err(ImportError::NotFound(format!(
                        "no dataset directory '{missing}' under {}",
                        self.root.display()
                    )));
                }
                available
                    .into_iter()
                    .filter(|name| requested.contains(name))
                    .collect()
            }
            None => available,
        };

        let mut datasets = Vec::with_capacity(selected.len());
        for name in selected {
            datasets.push(self.load(&name).await?);
        }
        log::info!(
            "Discovered {} dataset(s) under {}",
            datasets.len(),
            self.root.display()
        );
        Ok(datasets)
    }

    pub async fn load(&self, name: &str) -> Result<Dataset> {
        let dir = self.root.join(name);
        let params_text = tokio::fs::read_to_string(dir.join(PARAMS_FILE))
            .await
            .map_err(|err| config_err(name, PARAMS_FILE, err))?;
        let params =
            DatasetParams::from_json(&params_text).map_err(|err| config_err(name, PARAMS_FILE, err))?;

        let static_path = dir.join(STATIC_DATA_FILE);
        let static_records = if tokio::fs::try_exists(&static_path).await? {
            let text = tokio::fs::read_to_string(&static_path).await?;
            let records: Vec<RawRecord> =
                serde_json::from_str(&text).map_err(|err| config_err(name, STATIC_DATA_FILE, err))?;
            Some(records)
        } else {
            None
        };

        let query = match find_query_file(&dir).await? {
            Some(path) => Some(QueryTemplate::new(tokio::fs::read_to_string(&path).await?)),
            None => None,
        };

        let source = match (query, static_records) {
            (Some(template), None) => DatasetSource::Query(template),
            (None, Some(records)) => DatasetSource::Static(records),
            (Some(_), Some(_)) => {
                return Err(ImportError::Config(format!(
                    "{name}: has both {STATIC_DATA_FILE} and a .{QUERY_EXTENSION} query, expected one"
                )));
            }
            (None, None) => {
                return Err(ImportError::Config(format!(
                    "{name}: needs either {STATIC_DATA_FILE} or a .{QUERY_EXTENSION} query"
                )));
            }
        };

        Ok(Dataset::new(name, source, params))
    }
}

fn config_err(name: &str, file: &str, err: impl std::fmt::Display) -> ImportError {
    ImportError::Config(format!("{name}/{file}: {err}"))
}

async fn find_query_file(dir: &Path) -> Result<Option<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut candidates = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if entry.file_type().await?.is_file()
            && path.extension().is_some_and(|ext| ext == QUERY_EXTENSION)
        {
            candidates.push(path);
        }
    }
    candidates.sort();
    Ok(candidates.into_iter().next())
}
