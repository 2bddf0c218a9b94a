use std::collections::HashMap;
use std::time::Duration;

use crate::error::Result;
use crate::process;

/// External uploader that injects the test patient's records into OpenMRS.
///
/// `{openmrs_url}` and `{home}` in `args` are expanded before the command runs.
#[derive(Debug, Clone)]
pub struct SeedCommand {
    pub program: String,
    pub args: Vec<String>,
    pub timeout: Duration,
}

impl SeedCommand {
    /// Splits a configured command line into program and arguments; `None`
    /// when the command is empty.
    pub fn from_argv(argv: &[String], timeout: Duration) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
            timeout,
        })
    }

    pub async fn run(&self, vars: &HashMap<&str, String>) -> Result<()> {
        let args = process::expand_args(&self.args, vars);
        tracing::info!(program = %self.program, ?args, "Seeding test data");
        let output = process::run(&self.program, &args, self.timeout).await?;
        if !output.stderr.is_empty() {
            tracing::debug!(stderr = %output.stderr, "Seed command stderr");
        }
        Ok(())
    }
}
