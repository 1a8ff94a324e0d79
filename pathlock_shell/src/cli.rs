//! # pathlock CLI
//!
//! Command-line definition and entry point for the `pathlock` binary.

use crate::{config::Config, logging::init_logging};
use anyhow::{Context, Result, anyhow};
use clap::Parser;
use pathlock::{Bundle, Locker, PathRule, Rule, Safety};
use std::{env, ffi::OsString, path::PathBuf};

/// Environment variable overriding the config file's safety level.
pub const SAFETY_ENV: &str = "PATHLOCK_SAFETY";

/// pathlock: run a command with its filesystem access restricted by Landlock.
#[derive(Parser, Debug, Clone)]
#[command(
    author,
    version,
    about,
    long_about = "pathlock restricts itself with Landlock and then executes COMMAND,
which inherits the restriction for the rest of its life.

Rules take the form <d|f>:<mode>:<path> where mode combines
r (read), w (write), c (create/remove, directories only) and x (execute).

Bundles: shared, stdio, tty, tmp, vminfo, dns, certs.

Example: pathlock --bundle shared --bundle stdio --rule d:rw:/srv/data -- /usr/bin/backup"
)]
pub struct Cli {
    /// Grant access to a path, as <d|f>:<mode>:<path> (repeatable)
    #[arg(long = "rule", value_name = "RULE")]
    pub rules: Vec<PathRule>,

    /// Grant access to a named group of common paths (repeatable)
    #[arg(long = "bundle", value_name = "NAME")]
    pub bundles: Vec<Bundle>,

    /// What to do when Landlock is missing or fails: mandatory, only-supported, only-available or try
    #[arg(long)]
    pub safety: Option<Safety>,

    /// Path to a TOML config file (defaults to the user config directory)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Print the resolved rules and exit without locking
    #[arg(long)]
    pub print_rules: bool,

    /// Print the detected Landlock ABI version and exit
    #[arg(long)]
    pub detect: bool,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// Log to a daily rolling file in the cache directory instead of stderr
    #[arg(long)]
    pub log_to_file: bool,

    /// Command to execute once locked
    #[arg(last = true, value_name = "COMMAND")]
    pub command: Vec<OsString>,
}

/// Safety precedence: command line, then `PATHLOCK_SAFETY`, then config,
/// then [`Safety::Mandatory`].
pub fn resolve_safety(
    flag: Option<Safety>,
    env_value: Option<&str>,
    config: &Config,
) -> Result<Safety> {
    if let Some(safety) = flag {
        return Ok(safety);
    }
    if let Some(value) = env_value {
        return value.parse().with_context(|| format!("invalid {SAFETY_ENV}"));
    }
    Ok(config.safety()?.unwrap_or_default())
}

/// Explicit rules from config then command line, followed by bundles from
/// config then command line. The first rule for a path wins, so an explicit
/// rule always takes precedence over a bundle entry.
pub fn collect_rules(config: &Config, cli: &Cli) -> Result<Vec<Rule>> {
    let mut rules: Vec<Rule> = Vec::new();
    rules.extend(config.path_rules()?.into_iter().map(Rule::from));
    rules.extend(cli.rules.iter().cloned().map(Rule::from));
    rules.extend(config.bundles()?.into_iter().map(Rule::from));
    rules.extend(cli.bundles.iter().copied().map(Rule::from));
    Ok(rules)
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.debug { "debug" } else { "warn" };
    init_logging(log_level, cli.log_to_file)?;

    if cli.detect {
        match pathlock::detect() {
            Ok(version) => println!("landlock abi v{version}"),
            Err(err) => println!("landlock unavailable: {err}"),
        }
        return Ok(());
    }

    let default_config = Config::default_path();
    let config = Config::resolve(cli.config.as_deref(), default_config.as_deref())?;
    let env_safety = env::var(SAFETY_ENV).ok();
    let safety = resolve_safety(cli.safety, env_safety.as_deref(), &config)?;
    let locker = Locker::new(collect_rules(&config, &cli)?);

    if cli.print_rules {
        println!("{locker}");
        return Ok(());
    }

    let (program, args) = cli.command.split_first().ok_or_else(|| {
        anyhow!("no command given (usage: pathlock [OPTIONS] -- <COMMAND> [ARGS...])")
    })?;

    tracing::debug!(%safety, rules = %locker, "locking before exec");
    locker.lock(safety).context("failed to lock filesystem access")?;

    exec(program, args)
}

#[cfg(unix)]
fn exec(program: &OsString, args: &[OsString]) -> Result<()> {
    use std::os::unix::process::CommandExt;

    // exec only returns on failure.
    let err = std::process::Command::new(program).args(args).exec();
    Err(err).with_context(|| format!("failed to execute {}", program.to_string_lossy()))
}

#[cfg(not(unix))]
fn exec(program: &OsString, args: &[OsString]) -> Result<()> {
    let status = std::process::Command::new(program)
        .args(args)
        .status()
        .with_context(|| format!("failed to execute {}", program.to_string_lossy()))?;
    std::process::exit(status.code().unwrap_or(1));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("pathlock").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_parse_rules_bundles_and_command() {
        let cli = parse(&[
            "--rule",
            "d:rw:/tmp",
            "--bundle",
            "shared",
            "--rule",
            "f:x:/bin/cat",
            "--safety",
            "try",
            "--",
            "/bin/cat",
            "--number",
            "/etc/hosts",
        ]);

        assert_eq!(
            cli.rules,
            vec![PathRule::dir("/tmp", "rw"), PathRule::file("/bin/cat", "x")]
        );
        assert_eq!(cli.bundles, vec![Bundle::Shared]);
        assert_eq!(cli.safety, Some(Safety::Try));
        assert_eq!(cli.command, vec!["/bin/cat", "--number", "/etc/hosts"]);
    }

    #[test]
    fn test_invalid_rule_is_a_usage_error() {
        let err = Cli::try_parse_from(["pathlock", "--rule", "q:r:/tmp"]).unwrap_err();
        assert!(err.to_string().contains("improper filetype"), "{err}");
    }

    #[test]
    fn test_invalid_bundle_is_a_usage_error() {
        let err = Cli::try_parse_from(["pathlock", "--bundle", "everything"]).unwrap_err();
        assert!(err.to_string().contains("everything"), "{err}");
    }

    #[test]
    fn test_safety_precedence() {
        let config = Config {
            safety: Some("only-supported".to_string()),
            ..Config::default()
        };

        assert_eq!(
            resolve_safety(Some(Safety::Try), Some("mandatory"), &config).unwrap(),
            Safety::Try
        );
        assert_eq!(
            resolve_safety(None, Some("only-available"), &config).unwrap(),
            Safety::OnlyAvailable
        );
        assert_eq!(
            resolve_safety(None, None, &config).unwrap(),
            Safety::OnlySupported
        );
        assert_eq!(
            resolve_safety(None, None, &Config::default()).unwrap(),
            Safety::Mandatory
        );
        assert!(resolve_safety(None, Some("nope"), &config).is_err());
    }

    #[test]
    fn test_collect_rules_orders_explicit_before_bundles() {
        let config = Config {
            rules: vec!["d:r:/etc".to_string()],
            bundles: vec!["dns".to_string()],
            ..Config::default()
        };
        let cli = parse(&["--bundle", "tmp", "--rule", "d:rw:/srv"]);

        let rules = collect_rules(&config, &cli).unwrap();
        assert_eq!(
            rules,
            vec![
                Rule::from(PathRule::dir("/etc", "r")),
                Rule::from(PathRule::dir("/srv", "rw")),
                Rule::from(Bundle::Dns),
                Rule::from(Bundle::Tmp),
            ]
        );
    }
}
