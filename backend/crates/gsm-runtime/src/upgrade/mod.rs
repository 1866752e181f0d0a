//! Server install and upgrade through the external update tool.

mod cache_copy;
mod orchestrator;
mod output_parser;
mod steamcmd;

pub use cache_copy::{CopyStats, copy_directory, has_files_modified_since};
pub use output_parser::{OutputParserFactory, SteamCmdOutputParser, UpdateOutputParser};
pub use steamcmd::{SteamCmdRunner, ToolInvocation, UpdateTool};

use crate::progress::{NullProgress, ProgressSink};

use std::path::PathBuf;
use std::sync::Arc;

use gsm_config::{AutoUpdateConfig, UpdateConfig};
use tokio_util::sync::CancellationToken;

/// Prefix on every progress line the upgrade writes.
pub const OUTPUT_PREFIX: &str = "[UPDATE]";

/// Heartbeat dots per line while copying from the cache.
pub const DIRECTORIES_PER_LINE: u64 = 200;

/// Server branch to install.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BranchSelection {
    pub name: Option<String>,
    pub password: Option<String>,
}

impl BranchSelection {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            password: None,
        }
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    fn name(&self) -> Option<&str> {
        self.name.as_deref().filter(|name| !name.trim().is_empty())
    }

    fn password(&self) -> Option<&str> {
        self.password
            .as_deref()
            .filter(|password| !password.trim().is_empty())
    }

    /// Branch name for display and cache lookup; empty means the default.
    pub fn resolved_name<'a>(&'a self, default_branch: &'a str) -> &'a str {
        self.name().unwrap_or(default_branch)
    }
}

/// One upgrade run.
#[derive(Clone)]
pub struct UpgradeRequest {
    /// Run the update tool; when false only the state round trip happens
    pub update_server: bool,
    pub branch: BranchSelection,
    pub validate: bool,
    /// Proceed with a tool run on a 32-bit host
    pub allow_32bit_host: bool,
    pub cancel: CancellationToken,
    pub progress: Arc<dyn ProgressSink>,
}

impl UpgradeRequest {
    pub fn new(update_server: bool) -> Self {
        Self {
            update_server,
            branch: BranchSelection::default(),
            validate: false,
            allow_32bit_host: false,
            cancel: CancellationToken::new(),
            progress: Arc::new(NullProgress),
        }
    }

    pub fn with_branch(mut self, branch: BranchSelection) -> Self {
        self.branch = branch;
        self
    }

    pub fn with_validate(mut self, validate: bool) -> Self {
        self.validate = validate;
        self
    }

    pub fn with_allow_32bit_host(mut self, allow: bool) -> Self {
        self.allow_32bit_host = allow;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpgradeOutcome {
    pub success: bool,
    /// New content was downloaded, as opposed to the tool merely succeeding
    pub got_new_version: bool,
    pub cancelled: bool,
    pub message: String,
}

impl UpgradeOutcome {
    pub(crate) fn succeeded(got_new_version: bool, message: impl Into<String>) -> Self {
        Self {
            success: true,
            got_new_version,
            cancelled: false,
            message: message.into(),
        }
    }

    pub(crate) fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            got_new_version: false,
            cancelled: false,
            message: message.into(),
        }
    }

    pub(crate) fn cancelled() -> Self {
        Self {
            success: false,
            got_new_version: false,
            cancelled: true,
            message: String::from("Upgrade cancelled."),
        }
    }
}

/// One substitution for [`format_command_line`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandArg<'a> {
    /// A single argument, shell-quoted on substitution
    Value(&'a str),
    /// Already formatted argument text, inserted as is
    Fragment(&'a str),
}

/// Substitute `{0}`, `{1}`, ... in a command-line `format` with `args`.
///
/// Values are quoted so that [`shell_words::split`] yields them unchanged.
/// Quotes the format places around a value placeholder are dropped.
pub fn format_command_line(format: &str, args: &[CommandArg<'_>]) -> String {
    args.iter()
        .enumerate()
        .fold(format.to_string(), |formatted, (index, arg)| {
            let placeholder = format!("{{{index}}}");
            match arg {
                CommandArg::Fragment(text) => formatted.replace(&placeholder, text),
                CommandArg::Value(value) => {
                    let quoted = shell_words::quote(value);
                    formatted
                        .replace(&format!("\"{placeholder}\""), &placeholder)
                        .replace(&format!("'{placeholder}'"), &placeholder)
                        .replace(&placeholder, &quoted)
                }
            }
        })
}

/// Branch selection arguments, empty for the default branch.
pub fn branch_args(update: &UpdateConfig, branch: &BranchSelection) -> String {
    let Some(name) = branch.name() else {
        return String::new();
    };

    let mut args = format_command_line(
        &update.beta_name_args_format,
        &[CommandArg::Value(name)],
    );
    if let Some(password) = branch.password() {
        args.push(' ');
        args.push_str(&format_command_line(
            &update.beta_password_args_format,
            &[CommandArg::Value(password)],
        ));
    }
    args
}

/// Cache folder holding `branch`, when the cache is enabled and configured.
///
/// The folder is not checked for existence.
pub fn cache_folder(
    auto_update: &AutoUpdateConfig,
    update: &UpdateConfig,
    branch: &BranchSelection,
) -> Option<PathBuf> {
    if !auto_update.enabled || auto_update.cache_dir.trim().is_empty() {
        return None;
    }

    let branch_name = branch.resolved_name(&update.default_branch_name);
    Some(PathBuf::from(&auto_update.cache_dir).join(format!(
        "{}{branch_name}",
        auto_update.branch_folder_prefix
    )))
}
