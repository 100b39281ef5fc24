//! Schema command implementation.

use crate::error::Result;
use crate::output::Formatter;
use clinotes_domain::FieldSchema;

/// Execute the schema command.
pub fn execute_schema(formatter: &Formatter) -> Result<()> {
    println!("{}", formatter.format_schema(FieldSchema::clinical())?);
    Ok(())
}
