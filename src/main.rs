use compute::{create_account_statement, mapping_for};
use data::{Platform, BINANCE_FILE, DATA_DIR, OKX_FILE, OUTPUT_FILE};
use read::{filter_completed, load_data};
use std::path::PathBuf;
use write::{combine, export_account_statement};

mod compute;
mod data;
mod logging;
mod read;
mod write;

/// Where the pipeline reads its exports and writes the combined statement.
#[derive(Debug, Clone)]
struct Paths {
    data_dir: PathBuf,
    inputs: Vec<(Platform, String)>,
    output_dir: PathBuf,
    output_file: String,
}

impl Paths {
    /// `data/` and the output file, relative to the current directory.
    fn in_dir(root: PathBuf) -> Self {
        Self {
            data_dir: root.join(DATA_DIR),
            inputs: vec![
                (Platform::Okx, OKX_FILE.to_string()),
                (Platform::Binance, BINANCE_FILE.to_string()),
            ],
            output_dir: root,
            output_file: OUTPUT_FILE.to_string(),
        }
    }
}

/// Load, filter and map every platform export, then combine, sort and write
/// them. Returns the path of the written statement.
fn run(paths: &Paths) -> Result<PathBuf, anyhow::Error> {
    let mut tables = Vec::with_capacity(paths.inputs.len());
    for (platform, file_name) in &paths.inputs {
        let table = filter_completed(load_data(&paths.data_dir, file_name)?, *platform)?;
        tables.push(create_account_statement(&table, mapping_for(*platform))?);
    }
    let statement = combine(tables)?;
    let path = export_account_statement(&statement, &paths.output_dir, Some(&paths.output_file))?;
    Ok(path)
}

fn main() -> Result<(), anyhow::Error> {
    logging::init_logging();
    let paths = Paths::in_dir(std::env::current_dir()?);
    let path = run(&paths)?;
    println!("Account statement saved to {}", path.display());
    Ok(())
}
