//! `infer` command

use super::{ConnectArgs, print_json};
use crate::cli::error::CliError;
use crate::metadata::MetadataHandler;
use tracing::info;

/// Infer the schema of a logical table and print it as JSON.
pub fn handle_infer(
    args: &ConnectArgs,
    schema: &str,
    table: &str,
    sample_size: Option<usize>,
) -> Result<(), CliError> {
    let mut config = args.load_config()?;
    if let Some(sample_size) = sample_size {
        config.sample_size = sample_size;
    }
    info!("Sampling up to {} documents per table", config.sample_size);

    let handler = MetadataHandler::new(args.connect(&config)?, config);
    let table = handler.get_table(schema, table)?;
    print_json(&table)
}
