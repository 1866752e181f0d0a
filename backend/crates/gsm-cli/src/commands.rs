use clap::Subcommand;

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub(crate) enum Commands {
    /// Print the current state of the instance
    Status,

    /// Launch the server
    Start {
        /// Do not launch when firewall ports could not be opened
        #[arg(long)]
        abort_on_firewall_failure: bool,
    },

    /// Stop the server gracefully
    Stop,

    /// Install or upgrade the server through SteamCMD
    Upgrade {
        /// Server branch (defaults to the profile's branch, then the public branch)
        #[arg(long)]
        branch: Option<String>,

        /// Password for a protected branch
        #[arg(long, requires = "branch")]
        branch_password: Option<String>,

        /// Ask SteamCMD to validate every installed file
        #[arg(long)]
        validate: bool,

        /// Skip the SteamCMD run
        #[arg(long)]
        no_update: bool,

        /// Install even though this host is 32-bit
        #[arg(long = "allow-32bit")]
        allow_32bit: bool,
    },

    /// Print state changes until interrupted
    Watch,
}
