use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::Deserialize;

use crate::errors::Result;

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct ImportConfig {
    /// `.osm` file to import, optionally `.xz` compressed.
    pub data_path: String,
    pub dest_path: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl ImportConfig {
    pub fn load(path: &Path) -> Result<ImportConfig> {
        let file = File::open(path)
            .map_err(|err| format!("Could not open config file {}: {}", path.display(), err))?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }
}
