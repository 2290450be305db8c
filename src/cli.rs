/// CLI argument parsing for the `valkey-snap` binary.
///
/// Hand-rolled in the same `--flag value` style as the rest of this crate's
/// ancestry, rather than pulled in through a dedicated argument-parsing
/// crate.

use crate::config::Config;

/// Extracts an option value from command-line arguments.
///
/// Looks for `--{option_name}` and returns the following argument as the value.
fn get_option_value(option_name: &str, args: &[String]) -> Option<String> {
    let option_flag = format!("--{}", option_name);
    if let Some(option_position) = args.iter().position(|x| x == &option_flag) {
        args.get(option_position + 1).cloned()
    } else {
        None
    }
}

/// Whether a bare boolean flag (no following value) is present.
fn has_flag(flag_name: &str, args: &[String]) -> bool {
    let flag = format!("--{}", flag_name);
    args.iter().any(|x| x == &flag)
}

fn get_parsed<T: std::str::FromStr>(option_name: &str, args: &[String]) -> Result<Option<T>, anyhow::Error>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match get_option_value(option_name, args) {
        Some(v) => v.parse().map(Some).map_err(|e: T::Err| anyhow::anyhow!("--{option_name}: {e}")),
        None => Ok(None),
    }
}

/// Parses `args` (as returned by `std::env::args().collect()`) into a
/// `Config`, starting from `Config::default()` and overriding whichever
/// flags are present.
///
/// Recognised flags: `--host`, `--port`, `--emit-commands`, `--no-entries`,
/// `--max-elements-per-command`, `--max-bytes-per-command`,
/// `--rate-limit-bytes-per-second`, `--output`, `--replay-host` +
/// `--replay-port` (required together).
pub fn parse_config(args: &[String]) -> Result<Config, anyhow::Error> {
    let mut config = Config::default();

    if let Some(host) = get_option_value("host", args) {
        config.host = host;
    }
    if let Some(port) = get_parsed("port", args)? {
        config.port = port;
    }
    if has_flag("emit-commands", args) {
        config.emit_commands = true;
    }
    if has_flag("no-entries", args) {
        config.emit_entries = false;
    }
    if let Some(n) = get_parsed("max-elements-per-command", args)? {
        config.max_elements_per_command = n;
    }
    if let Some(n) = get_parsed("max-bytes-per-command", args)? {
        config.max_bytes_per_command = n;
    }
    if let Some(n) = get_parsed("rate-limit-bytes-per-second", args)? {
        config.rate_limit_bytes_per_second = n;
    }
    if let Some(path) = get_option_value("output", args) {
        config.output_path = Some(path);
    }

    let replay_host = get_option_value("replay-host", args);
    let replay_port = get_parsed("replay-port", args)?;
    match (replay_host, replay_port) {
        (Some(host), Some(port)) => config.replay_target = Some((host, port)),
        (None, None) => {}
        _ => anyhow::bail!("--replay-host and --replay-port must be given together"),
    }

    Ok(config)
}
