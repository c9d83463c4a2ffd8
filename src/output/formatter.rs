//! Output formatting

use crate::invocation::DockerInvocation;
use crate::output::human::format_human;
use crate::output::json::format_json;
use crate::resolve::ResolvedInvocation;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Human,
    Json,
}

/// Everything a dry run reports.
#[derive(Debug, Clone, Copy)]
pub struct DryRun<'a> {
    /// The docker executable
    pub program: &'a str,
    pub resolved: &'a ResolvedInvocation,
    pub invocation: &'a DockerInvocation,
}

impl DryRun<'_> {
    /// Full command line, program first.
    pub fn argv(&self) -> Vec<String> {
        std::iter::once(self.program.to_string())
            .chain(self.invocation.argv.iter().cloned())
            .collect()
    }
}

pub fn format_output(dry_run: &DryRun, format: &OutputFormat, verbose: bool) -> String {
    match format {
        OutputFormat::Human => format_human(dry_run, verbose),
        OutputFormat::Json => format_json(dry_run),
    }
}
