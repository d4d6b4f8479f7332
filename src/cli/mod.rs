//! Stablecash Command Line Interface.
//!
//! Drives a protocol snapshot stored on disk: each command loads the
//! snapshot, runs one operation and writes the result back.

pub mod commands;
pub mod config;
pub mod output;

pub use commands::*;
pub use config::*;
pub use output::*;

use thiserror::Error;

use crate::protocol::state::ProtocolState;

// ═══════════════════════════════════════════════════════════════════════════════
// CLI APPLICATION
// ═══════════════════════════════════════════════════════════════════════════════

/// CLI Application state
#[derive(Debug)]
pub struct CliApp {
    /// Configuration
    config: CliConfig,
    /// Output formatter
    output: OutputFormatter,
    /// Verbose mode
    verbose: bool,
}

impl CliApp {
    /// Create new CLI application
    pub fn new(config: CliConfig) -> Self {
        let mut output = OutputFormatter::new(config.format);
        if !config.color {
            output = output.without_color();
        }
        Self {
            config,
            output,
            verbose: false,
        }
    }

    /// Enable verbose output
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Set output format
    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.config.format = format;
        self.output = OutputFormatter::new(format);
        if !self.config.color {
            self.output = self.output.without_color();
        }
        self
    }

    /// Get configuration
    pub fn config(&self) -> &CliConfig {
        &self.config
    }

    /// Get output formatter
    pub fn output(&self) -> &OutputFormatter {
        &self.output
    }

    /// Check if verbose
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Load the protocol snapshot
    pub fn load_state(&self) -> CliResult<ProtocolState> {
        let path = &self.config.state_path;
        if !path.exists() {
            return Err(CliError::NotFound(format!(
                "no protocol state at {}; run `stablecash init` first",
                path.display()
            )));
        }
        Ok(ProtocolState::load(path)?)
    }

    /// Write the protocol snapshot
    pub fn save_state(&self, state: &ProtocolState) -> CliResult<()> {
        Ok(state.save(&self.config.state_path)?)
    }

    /// Execute a command
    pub fn execute(&self, command: Command) -> CliResult<CommandOutput> {
        if self.verbose {
            self.output.info(&format!("Executing: {:?}", command));
        }

        match command {
            Command::Init(cmd) => cmd.execute(self),
            Command::Status(cmd) => cmd.execute(self),
            Command::Advance(cmd) => cmd.execute(self),
            Command::Fund(cmd) => cmd.execute(self),
            Command::Balance(cmd) => cmd.execute(self),
            Command::Bid(cmd) => cmd.execute(self),
            Command::Settle(cmd) => cmd.execute(self),
            Command::Exchange(cmd) => cmd.execute(self),
            Command::Transfer(cmd) => cmd.execute(self),
            Command::Burn(cmd) => cmd.execute(self),
            Command::Events(cmd) => cmd.execute(self),
            Command::Simulate(cmd) => cmd.execute(self),
        }
    }
}

impl Default for CliApp {
    fn default() -> Self {
        Self::new(CliConfig::default())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// CLI RESULT
// ═══════════════════════════════════════════════════════════════════════════════

/// CLI Error types
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    /// Protocol rejected the operation
    #[error("Protocol error [{code}]: {0}", code = .0.code())]
    Protocol(#[from] crate::error::Error),
    /// Invalid argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    /// Not found
    #[error("Not found: {0}")]
    NotFound(String),
}

/// CLI Result type
pub type CliResult<T> = std::result::Result<T, CliError>;

// ═══════════════════════════════════════════════════════════════════════════════
// COMMAND OUTPUT
// ═══════════════════════════════════════════════════════════════════════════════

/// Command execution output
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Success status
    pub success: bool,
    /// Output message
    pub message: String,
    /// Structured data (JSON serializable)
    pub data: Option<serde_json::Value>,
    /// Warnings
    pub warnings: Vec<String>,
}

impl CommandOutput {
    /// Create success output
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: None,
            warnings: Vec::new(),
        }
    }

    /// Create success with data
    pub fn success_with_data(message: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
            warnings: Vec::new(),
        }
    }

    /// Create error output
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
            warnings: Vec::new(),
        }
    }

    /// Add warning
    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }

    /// Print through a formatter
    pub fn render(&self, output: &OutputFormatter) {
        if self.success {
            output.success(&self.message);
        } else {
            output.error(&self.message);
        }
        if let Some(data) = &self.data {
            output.data(data);
        }
        for warning in &self.warnings {
            output.warning(warning);
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMMAND TRAIT
// ═══════════════════════════════════════════════════════════════════════════════

/// Trait for executable commands
pub trait Executable {
    /// Execute the command
    fn execute(&self, app: &CliApp) -> CliResult<CommandOutput>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_app_creation() {
        let app = CliApp::default();
        assert!(!app.is_verbose());
        assert_eq!(app.output().format(), OutputFormat::Text);
    }

    #[test]
    fn test_cli_app_verbose_and_format() {
        let app = CliApp::default().with_verbose(true).with_format(OutputFormat::Json);
        assert!(app.is_verbose());
        assert_eq!(app.config().format, OutputFormat::Json);
    }

    #[test]
    fn test_command_output_with_warning() {
        let output = CommandOutput::success("OK")
            .with_warning("Warning 1")
            .with_warning("Warning 2");
        assert!(output.success);
        assert_eq!(output.warnings.len(), 2);
    }

    #[test]
    fn test_cli_error_display() {
        let err = CliError::from(crate::error::Error::ZeroAmount);
        assert!(err.to_string().starts_with("Protocol error [5002]"));

        let err = CliError::InvalidArgument("bad".into());
        assert!(err.to_string().contains("Invalid argument"));
    }

    #[test]
    fn test_load_missing_state() {
        let dir = tempfile::tempdir().unwrap();
        let app = CliApp::new(CliConfig::new(dir.path().join("missing.json")));
        assert!(matches!(app.load_state(), Err(CliError::NotFound(_))));
    }
}
