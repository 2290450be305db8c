/// Runtime configuration, per the external-interfaces configuration table:
/// which callbacks to drive, chunking ceilings, rate limiting, and the
/// primary to connect to.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub emit_entries: bool,
    pub emit_commands: bool,
    pub max_elements_per_command: usize,
    pub max_bytes_per_command: usize,
    pub rate_limit_bytes_per_second: u64,
    pub output_path: Option<String>,
    pub replay_target: Option<(String, u16)>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            host: "127.0.0.1".to_string(),
            port: 6379,
            emit_entries: true,
            emit_commands: false,
            max_elements_per_command: 1000,
            max_bytes_per_command: 64 * 1024,
            rate_limit_bytes_per_second: 0,
            output_path: None,
            replay_target: None,
        }
    }
}
