//! `schemas` and `tables` commands

use super::ConnectArgs;
use crate::cli::error::CliError;
use crate::metadata::MetadataHandler;

/// Print every database of the store, one per line.
pub fn handle_schemas(args: &ConnectArgs) -> Result<(), CliError> {
    let config = args.load_config()?;
    let handler = MetadataHandler::new(args.connect(&config)?, config);
    for schema in handler.list_schema_names()? {
        println!("{}", schema);
    }
    Ok(())
}

/// Print the logical tables of a database, one per line.
pub fn handle_tables(args: &ConnectArgs, schema: &str) -> Result<(), CliError> {
    let config = args.load_config()?;
    let handler = MetadataHandler::new(args.connect(&config)?, config);
    for table in handler.list_table_names(schema)? {
        println!("{}", table);
    }
    Ok(())
}
