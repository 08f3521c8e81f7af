#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]

mod commands;
mod logging;

use clap::Parser;
use commands::install::ChangeAction;
use miette::Result;
use snapkit_core::{Config, Intent, PollConfig, DEFAULT_CHANNEL};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "snapkit")]
#[command(author, version, about = "Install, upgrade and remove snaps through the snap daemon", long_about = None)]
struct Cli {
    /// Increase logging verbosity (-v for DEBUG, -vv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit JSON formatted output (stable, machine-readable)
    #[arg(long, global = true)]
    json: bool,

    /// Daemon socket (default: $SNAPKIT_SOCKET or /run/snapd.socket)
    #[arg(long, global = true, value_name = "PATH")]
    socket: Option<PathBuf>,

    /// Delay between change status polls
    #[arg(long, global = true, value_name = "MS")]
    poll_interval_ms: Option<u64>,

    /// Polls before giving up on a change
    #[arg(long, global = true, value_name = "N")]
    max_attempts: Option<u32>,

    /// Read/write timeout for one daemon request (0 disables)
    #[arg(long, global = true, value_name = "SECS")]
    timeout_secs: Option<u64>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Print version information
    Version,

    /// Install snaps
    Install(ChangeArgs),

    /// Refresh installed snaps
    Upgrade(ChangeArgs),

    /// Remove snaps
    Remove {
        /// Snap names
        #[arg(required = true)]
        names: Vec<String>,

        /// Only show what would change
        #[arg(long)]
        dry_run: bool,
    },

    /// Remove snaps (same as remove)
    Purge {
        /// Snap names
        #[arg(required = true)]
        names: Vec<String>,

        /// Only show what would change
        #[arg(long)]
        dry_run: bool,
    },

    /// Show installed and available versions
    Status {
        /// Snap names
        #[arg(required = true)]
        names: Vec<String>,

        /// Channel to compare against
        #[arg(long, default_value = DEFAULT_CHANNEL)]
        channel: String,
    },

    /// List installed snaps
    List,

    /// Wait for an existing change to finish
    Wait {
        /// Change id
        change_id: String,
    },

    /// Read or write snap configuration
    Conf {
        #[command(subcommand)]
        conf_cmd: ConfCommands,
    },
}

#[derive(clap::Args, Debug)]
struct ChangeArgs {
    /// Snaps as `name` or `name=version`
    #[arg(required = true, value_name = "NAME[=VERSION]")]
    packages: Vec<String>,

    /// Channel to install from or refresh to
    #[arg(long, default_value = DEFAULT_CHANNEL)]
    channel: String,

    /// Put the snap in classic confinement
    #[arg(long)]
    classic: bool,

    /// Put the snap in development mode
    #[arg(long)]
    devmode: bool,

    /// Put the snap in enforced confinement mode
    #[arg(long)]
    jailmode: bool,

    /// Ignore validation by other snaps
    #[arg(long)]
    ignore_validation: bool,

    /// Install an unsigned local snap file
    #[arg(long)]
    dangerous: bool,

    /// Install this revision
    #[arg(long)]
    revision: Option<String>,

    /// Install from a local snap file instead of the store
    #[arg(long, value_name = "PATH")]
    source: Option<PathBuf>,

    /// Extra request field passed to the daemon (value parsed as JSON)
    #[arg(long = "option", value_name = "KEY=VALUE")]
    options: Vec<String>,

    /// Only show what would change
    #[arg(long)]
    dry_run: bool,
}

#[derive(clap::Subcommand, Debug)]
enum ConfCommands {
    /// Print configuration values
    Get {
        /// Snap name
        name: String,

        /// Keys to read (all when omitted)
        keys: Vec<String>,
    },

    /// Set configuration values and wait for the change
    Set {
        /// Snap name
        name: String,

        /// Assignments; values are parsed as JSON, falling back to strings
        #[arg(required = true, value_name = "KEY=VALUE")]
        values: Vec<String>,
    },
}

impl ChangeArgs {
    fn into_action(self, intent: Intent) -> ChangeAction {
        ChangeAction {
            intent,
            packages: self.packages,
            channel: self.channel,
            flags: [
                ("classic", self.classic),
                ("devmode", self.devmode),
                ("jailmode", self.jailmode),
                ("ignore-validation", self.ignore_validation),
                ("dangerous", self.dangerous),
            ]
            .into_iter()
            .filter(|(_, set)| *set)
            .map(|(name, _)| name.to_string())
            .collect(),
            options: self.options,
            revision: self.revision,
            source: self.source,
            dry_run: self.dry_run,
        }
    }
}

fn removal(intent: Intent, names: Vec<String>, dry_run: bool) -> ChangeAction {
    ChangeAction {
        intent,
        packages: names,
        channel: DEFAULT_CHANNEL.to_string(),
        flags: Vec::new(),
        options: Vec::new(),
        revision: None,
        source: None,
        dry_run,
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::default()
        .with_verbosity(cli.verbose)
        .with_json_logs(cli.json);
    if let Some(socket) = cli.socket {
        config = config.with_socket(socket);
    }
    if cli.poll_interval_ms.is_some() || cli.max_attempts.is_some() {
        let poll = PollConfig::new(
            cli.poll_interval_ms
                .map_or(config.poll.interval, Duration::from_millis),
            cli.max_attempts.unwrap_or(config.poll.max_attempts),
        );
        config = config.with_poll(poll);
    }
    if let Some(secs) = cli.timeout_secs {
        config = config.with_request_timeout(Duration::from_secs(secs));
    }

    logging::init(config.verbosity, config.json_logs);

    let json = cli.json;
    match cli.command {
        Some(Commands::Version) | None => commands::version::run(json),
        Some(Commands::Install(args)) => {
            commands::install::run(&config, args.into_action(Intent::Install), json)
        }
        Some(Commands::Upgrade(args)) => {
            commands::install::run(&config, args.into_action(Intent::Upgrade), json)
        }
        Some(Commands::Remove { names, dry_run }) => {
            commands::install::run(&config, removal(Intent::Remove, names, dry_run), json)
        }
        Some(Commands::Purge { names, dry_run }) => {
            commands::install::run(&config, removal(Intent::Purge, names, dry_run), json)
        }
        Some(Commands::Status { names, channel }) => {
            let span = tracing::info_span!("status", cmd = "status");
            let _guard = span.enter();
            commands::status::run(&config, &names, &channel, json)
        }
        Some(Commands::List) => commands::list::run(&config, json),
        Some(Commands::Wait { change_id }) => commands::wait::run(&config, &change_id, json),
        Some(Commands::Conf { conf_cmd }) => {
            let action = match conf_cmd {
                ConfCommands::Get { name, keys } => commands::conf::ConfAction::Get { name, keys },
                ConfCommands::Set { name, values } => {
                    commands::conf::ConfAction::Set { name, values }
                }
            };
            commands::conf::run(&config, action, json)
        }
    }
}
