//! Command-line entry point for game clients.
//!
//! Every player binary looks the same: parse the standard arguments,
//! set up logging, connect, play until the session ends. [`start`] does all
//! of that; [`StartArgs`], [`init_logging`] and [`run`] are the pieces, for
//! binaries that need to customise one of them.
//!
//! ```text
//! socha-player --host localhost --port 13050 --reservation abc123 --verbose
//! ```

use std::fs::File;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::Parser;
use socha_client::{ClientConfig, GameLogic, JoinStrategy, SessionClient, Termination};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use crate::SochaError;

// ---------------------------------------------------------------------------
// StartArgs
// ---------------------------------------------------------------------------

/// The standard player command line.
///
/// `-h` is the host, as the game server's tooling expects, so help is only
/// available as `--help`.
#[derive(Debug, Clone, PartialEq, Eq, Parser)]
#[command(name = "socha", version, about = "Software Challenge game client", long_about = None)]
#[command(disable_help_flag = true)]
pub struct StartArgs {
    /// Game server host
    #[arg(short = 'h', long, default_value = "localhost")]
    pub host: String,

    /// Game server port
    #[arg(short, long, default_value_t = 13050)]
    pub port: u16,

    /// Reservation code of a prepared game
    #[arg(short, long)]
    pub reservation: Option<String>,

    /// Id of an existing room to join
    #[arg(long)]
    pub room: Option<String>,

    /// Administrator password
    #[arg(long)]
    pub password: Option<String>,

    /// Keep running after the game ends
    #[arg(long)]
    pub survive: bool,

    /// Reconnect after the server leaves
    #[arg(long)]
    pub auto_reconnect: bool,

    /// Hand every room message to the logic undecoded
    #[arg(long)]
    pub headless: bool,

    /// Log at debug level
    #[arg(short, long)]
    pub verbose: bool,

    /// Also write the log to socha-<timestamp>.log
    #[arg(long)]
    pub log: bool,

    /// Log filter, e.g. `warn` or `socha_client=trace` (overrides --verbose)
    #[arg(long, value_name = "FILTER")]
    pub log_level: Option<String>,

    /// Print help
    #[arg(long, action = clap::ArgAction::Help)]
    help: Option<bool>,
}

impl StartArgs {
    /// Builds the session configuration. Conflicting join options are
    /// resolved (and logged) by [`JoinStrategy::resolve`].
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            host: self.host.clone(),
            port: self.port,
            join: JoinStrategy::resolve(
                self.reservation.clone(),
                self.room.clone(),
                self.password.clone(),
            ),
            survive: self.survive,
            auto_reconnect: self.auto_reconnect,
            headless: self.headless,
            ..ClientConfig::default()
        }
    }

    /// The filter used when `RUST_LOG` is not set.
    pub fn log_filter(&self) -> String {
        match (&self.log_level, self.verbose) {
            (Some(filter), _) => filter.clone(),
            (None, true) => "debug".to_string(),
            (None, false) => "info".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

/// Installs the global `tracing` subscriber.
///
/// `RUST_LOG` wins when set; otherwise [`StartArgs::log_filter`] applies.
/// With `--log` a second, uncoloured copy goes to
/// `socha-<unix seconds>.log` in the working directory, whose path is
/// returned.
///
/// # Errors
/// [`SochaError::Logging`] if the filter does not parse, the log file
/// cannot be created, or a subscriber is already installed.
pub fn init_logging(args: &StartArgs) -> Result<Option<PathBuf>, SochaError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(args.log_filter())
            .map_err(|e| SochaError::Logging(format!("invalid log filter: {e}")))?,
    };

    let (file_layer, path) = if args.log {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        let path = PathBuf::from(format!("socha-{secs}.log"));
        let file = File::create(&path).map_err(|e| {
            SochaError::Logging(format!("cannot create {}: {e}", path.display()))
        })?;
        let layer = fmt::layer().with_ansi(false).with_writer(Mutex::new(file));
        (Some(layer), Some(path))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .with(file_layer)
        .try_init()
        .map_err(|e| SochaError::Logging(e.to_string()))?;

    Ok(path)
}

// ---------------------------------------------------------------------------
// Running
// ---------------------------------------------------------------------------

/// Plays with already parsed arguments. Does not touch logging.
pub async fn run<G: GameLogic>(args: &StartArgs, logic: G) -> Result<Termination, SochaError> {
    let config = args.client_config();
    tracing::info!(
        host = %config.host,
        port = config.port,
        join = config.join.kind(),
        survive = config.survive,
        auto_reconnect = config.auto_reconnect,
        "starting client"
    );

    let mut client = SessionClient::new(config, logic);
    let termination = client.run().await?;

    tracing::info!(?termination, exit_code = termination.exit_code(), "client finished");
    Ok(termination)
}

/// Parses the process arguments, sets up logging, and plays.
///
/// ```rust,no_run
/// use socha::prelude::*;
///
/// struct Player;
///
/// impl GameLogic for Player {
///     type Move = RoomData;
///     fn calculate_move(&mut self) -> Option<RoomData> {
///         Some(RoomData::new("FallBack"))
///     }
/// }
///
/// #[tokio::main]
/// async fn main() -> Result<(), SochaError> {
///     let termination = socha::start(Player).await?;
///     std::process::exit(termination.exit_code());
/// }
/// ```
pub async fn start<G: GameLogic>(logic: G) -> Result<Termination, SochaError> {
    let args = StartArgs::parse();
    if let Some(path) = init_logging(&args)? {
        tracing::info!(path = %path.display(), "logging to file");
    }
    run(&args, logic).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> StartArgs {
        StartArgs::try_parse_from(std::iter::once("socha").chain(args.iter().copied()))
            .expect("arguments should parse")
    }

    #[test]
    fn test_defaults() {
        let args = parse(&[]);
        assert_eq!(args.host, "localhost");
        assert_eq!(args.port, 13050);
        assert!(!args.verbose && !args.log && !args.survive);
        assert_eq!(args.client_config(), ClientConfig::default());
        assert_eq!(args.log_filter(), "info");
    }

    #[test]
    fn test_short_flags() {
        let args = parse(&["-h", "10.0.0.2", "-p", "13051", "-r", "abc", "-v"]);
        assert_eq!(args.host, "10.0.0.2");
        assert_eq!(args.port, 13051);
        assert_eq!(args.reservation.as_deref(), Some("abc"));
        assert_eq!(args.log_filter(), "debug");

        let config = args.client_config();
        assert_eq!(config.join, JoinStrategy::Reservation("abc".into()));
        assert_eq!(config.host, "10.0.0.2");
    }

    #[test]
    fn test_long_flags_map_to_config() {
        let args = parse(&["--room", "r1", "--survive", "--auto-reconnect", "--headless"]);
        let config = args.client_config();
        assert_eq!(config.join, JoinStrategy::Room("r1".into()));
        assert!(config.survive && config.auto_reconnect && config.headless);
    }

    #[test]
    fn test_reservation_beats_password() {
        let args = parse(&["--password", "pw", "--reservation", "code"]);
        assert_eq!(
            args.client_config().join,
            JoinStrategy::Reservation("code".into())
        );
    }

    #[test]
    fn test_log_level_overrides_verbose() {
        let args = parse(&["-v", "--log-level", "warn"]);
        assert_eq!(args.log_filter(), "warn");
    }

    #[test]
    fn test_help_is_long_only() {
        let err = StartArgs::try_parse_from(["socha", "--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        assert!(StartArgs::try_parse_from(["socha", "--port", "99999"]).is_err());
    }
}
