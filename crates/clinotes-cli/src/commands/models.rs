//! Models command implementation.

use crate::config::Config;
use crate::error::Result;
use crate::output::Formatter;
use clinotes_llm::fireworks::{DEFAULT_MODEL, KNOWN_MODELS};

/// Execute the models command.
///
/// The configured model is marked when it is one of the known models;
/// with none configured, the recommended model is marked instead.
pub fn execute_models(config: &Config, formatter: &Formatter) -> Result<()> {
    let default_model = config.model.model_id.as_deref().unwrap_or(DEFAULT_MODEL);
    println!("{}", formatter.format_models(KNOWN_MODELS, default_model)?);
    Ok(())
}
