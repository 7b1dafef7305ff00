use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(author, version, about = "Cached SSO sessions and role credentials", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Start URL of the SSO tenant, overrides the config file
    #[arg(long, global = true)]
    pub start_url: Option<String>,

    /// Region of the SSO tenant, overrides the config file
    #[arg(long, global = true)]
    pub region: Option<String>,

    /// Log at debug level
    #[arg(long, global = true)]
    pub debug: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ensures a usable session, authorizing in the browser when needed
    Login {
        /// Drop the cached session first
        #[arg(long)]
        clean: bool,
    },
    /// Removes the cached session and lock file
    Clean,
    /// Prints temporary credentials for a role
    Credentials {
        /// Account id
        #[arg(short = 'a', long = "account-id")]
        account_id: String,
        /// Role name
        #[arg(short = 'n', long = "role-name")]
        role_name: String,
        #[arg(long, value_enum, default_value_t = CredentialsFormat::Env)]
        format: CredentialsFormat,
        /// Write a profile to the shared credentials file instead of printing
        #[arg(long)]
        profile: Option<String>,
        /// Store static keys in the profile instead of a `credential_process` entry
        #[arg(long, requires = "profile")]
        keys: bool,
    },
    /// Rewrites a credentials profile for the last used, or the given, role
    Refresh {
        /// Account id, defaults to the last used one
        #[arg(short = 'a', long = "account-id", requires = "role_name")]
        account_id: Option<String>,
        /// Role name, defaults to the last used one
        #[arg(short = 'n', long = "role-name", requires = "account_id")]
        role_name: Option<String>,
        /// Profile to write, defaults to the last used one or `default`
        #[arg(long)]
        profile: Option<String>,
        /// Store static keys instead of a `credential_process` entry
        #[arg(long)]
        keys: bool,
    },
    /// Lists accounts and roles available to the session
    Accounts,
    /// Shows or writes the config file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Prints the effective settings and where they are read from
    Show,
    /// Saves `--start-url` and `--region` to the config file
    Write,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialsFormat {
    /// `export` lines for a POSIX shell
    Env,
    /// JSON document for `credential_process`
    Process,
}
