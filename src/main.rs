use std::env;
use std::fs::create_dir_all;
use std::io;
use std::path::{Path, PathBuf};

use log::info;

use structured_logger::json::new_writer;
use structured_logger::Builder;

use osm_records::config::ImportConfig;
use osm_records::errors::Result;
use osm_records::import::OsmImport;

const DEFAULT_CONFIG_PATH: &str = "config/import.json";

fn create_output_dir(config: &ImportConfig) -> Result<PathBuf> {
    let input_fname = Path::new(&config.data_path)
        .file_name()
        .ok_or("Could not get input file name")?;
    let output_dir = Path::new(&config.dest_path).join(input_fname);
    create_dir_all(&output_dir)?;
    Ok(output_dir)
}

fn setup_logging(level: &str) {
    Builder::with_level(level)
        .with_target_writer("*", new_writer(io::stdout()))
        .init();
}

fn main() -> Result<()> {
    let config_path = env::args().nth(1).unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = ImportConfig::load(Path::new(&config_path))?;
    setup_logging(&config.log_level);

    let output_dir = create_output_dir(&config)?;
    if let Some(summary) = OsmImport::new(&config).run(&output_dir)? {
        info!(
            node_records = summary.node_records,
            way_records = summary.way_records,
            skipped_ways = summary.skipped_ways;
            "Import finished"
        );
    }

    Ok(())
}
