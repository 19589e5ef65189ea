// ABOUTME: Command-line argument parsing — overlays environment-derived ServerConfig (spec §6.3)
// ABOUTME: `--list-toolsets` and tools-path resolution failures map to the documented exit codes

use clap::Parser;

use crate::config::environment::{ServerConfig, Transport};

/// Process exit codes named in spec §6.3.
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const INVALID_ARGS_OR_FATAL_STARTUP: i32 = 1;
    pub const TOOLS_PATH_INACCESSIBLE: i32 = 2;
}

#[derive(Debug, Parser)]
#[command(name = "ibmi-mcp-server", about = "Declarative SQL-tool MCP server for Db2 for i")]
pub struct Cli {
    /// File, directory, or glob of YAML tool-configuration documents.
    #[arg(long)]
    pub tools: Option<String>,

    /// Comma-separated toolset names to enable.
    #[arg(long = "toolsets", visible_alias = "ts")]
    pub toolsets: Option<String>,

    /// Print available toolsets and exit.
    #[arg(long = "list-toolsets")]
    pub list_toolsets: bool,

    /// Dispatch transport.
    #[arg(long = "transport", short = 't')]
    pub transport: Option<String>,

    /// Override the HTTP bind port (only used when `--transport http`).
    #[arg(long = "http-port")]
    pub http_port: Option<u16>,

    /// Override the log level (error, warn, info, debug, trace).
    #[arg(long = "log-level")]
    pub log_level: Option<String>,

    /// Allow duplicate tool names across merged YAML documents.
    #[arg(long = "allow-duplicate-tools")]
    pub allow_duplicate_tools: bool,

    /// Allow duplicate source names across merged YAML documents.
    #[arg(long = "allow-duplicate-sources")]
    pub allow_duplicate_sources: bool,

    /// Concatenate (rather than override) array-valued fields across merged documents.
    #[arg(long = "merge-arrays")]
    pub merge_arrays: bool,
}

impl Cli {
    /// Overlay parsed flags onto an environment-derived [`ServerConfig`]
    /// (spec §6.3; CLI flags take precedence over env vars per §6.4).
    pub fn apply_overrides(&self, config: &mut ServerConfig) {
        if let Some(tools) = &self.tools {
            config.tools_path = Some(tools.clone());
        }
        if let Some(toolsets) = &self.toolsets {
            config.selected_toolsets = toolsets
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_owned)
                .collect();
        }
        if let Some(transport) = &self.transport {
            config.transport = Transport::from_str_or_default(transport);
        }
        if let Some(port) = self.http_port {
            config.http_port = port;
        }
        if let Some(level) = &self.log_level {
            config.log_level = crate::config::environment::LogLevel::from_str_or_default(level);
        }
        if self.allow_duplicate_tools {
            config.merge_options.allow_duplicate_tools = true;
        }
        if self.allow_duplicate_sources {
            config.merge_options.allow_duplicate_sources = true;
        }
        if self.merge_arrays {
            config.merge_options.merge_arrays = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toolsets_flag_splits_on_comma_and_trims() {
        let cli = Cli {
            tools: None,
            toolsets: Some(" fast, slow ".to_owned()),
            list_toolsets: false,
            transport: None,
            http_port: None,
            log_level: None,
            allow_duplicate_tools: false,
            allow_duplicate_sources: false,
            merge_arrays: false,
        };
        let mut config = ServerConfig::default();
        cli.apply_overrides(&mut config);
        assert_eq!(config.selected_toolsets, vec!["fast", "slow"]);
    }

    #[test]
    fn transport_flag_overrides_env_default() {
        let cli = Cli {
            tools: None,
            toolsets: None,
            list_toolsets: false,
            transport: Some("http".to_owned()),
            http_port: None,
            log_level: None,
            allow_duplicate_tools: false,
            allow_duplicate_sources: false,
            merge_arrays: false,
        };
        let mut config = ServerConfig::default();
        cli.apply_overrides(&mut config);
        assert_eq!(config.transport, Transport::Http);
    }
}
