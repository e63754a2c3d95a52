mod cli;
mod json;

pub use cli::policies_table;
pub use json::write_json;

use crate::error::Result;
use crate::model::Policy;
use std::io::Write;

/// Output format for the policy listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// One `id=... name='...' description='...'` line per policy
    #[default]
    Plain,
    /// Human-readable table format
    Table,
    /// JSON format for programmatic use
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "plain" | "text" => Ok(OutputFormat::Plain),
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!(
                "Unknown format: {}. Use 'plain', 'table', or 'json'",
                s
            )),
        }
    }
}

pub fn write_policies<W: Write>(
    out: &mut W,
    policies: &[Policy],
    format: OutputFormat,
) -> Result<()> {
    match format {
        OutputFormat::Plain => {
            for policy in policies {
                writeln!(
                    out,
                    "id={} name='{}' description='{}'",
                    policy.display_id(),
                    policy.name,
                    policy.description
                )?;
            }
            Ok(())
        }
        OutputFormat::Table => {
            writeln!(out, "{}", policies_table(policies))?;
            Ok(())
        }
        OutputFormat::Json => write_json(out, policies),
    }
}
