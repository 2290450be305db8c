use std::env;
use std::fs::File;
use std::io::Read;
use std::net::TcpStream;
use std::time::{Duration, Instant};

use valkey_snap::cli;
use valkey_snap::handshake;
use valkey_snap::payload_source::{BoundedPayload, SentinelPayload};
use valkey_snap::rate_limit::TokenBucketReader;
use valkey_snap::resp::PayloadPrefix;
use valkey_snap::sink::EventSink;
use valkey_snap::sinks::{ReplaySink, StdoutSink};
use valkey_snap::stream_loop::StreamLoop;

fn main() -> Result<(), anyhow::Error> {
    env_logger::init();
    let args: Vec<String> = env::args().collect();
    let config = cli::parse_config(&args)?;

    let address = format!("{}:{}", config.host, config.port);
    log::info!("connecting to {address}");
    let mut stream = TcpStream::connect(&address)?;
    stream.set_read_timeout(Some(Duration::new(10, 0)))?;

    // We never accept inbound connections ourselves, so there is no real
    // listening-port to report; 0 mirrors what a one-shot inspection client
    // tells the master.
    let (full_resync, prefix) = handshake::perform_handshake(&mut stream, 0)?;
    println!(
        "connected to {address}, replication id {}, offset {}",
        full_resync.replication_id, full_resync.master_offset
    );

    let payload: Box<dyn Read> = match prefix {
        PayloadPrefix::Bounded(len) => Box::new(BoundedPayload::new(stream, len)),
        PayloadPrefix::Sentinel(sentinel) => Box::new(SentinelPayload::new(stream, sentinel)),
    };
    let payload: Box<dyn Read> = if config.rate_limit_bytes_per_second > 0 {
        Box::new(TokenBucketReader::new(payload, config.rate_limit_bytes_per_second))
    } else {
        payload
    };

    let mut sink: Box<dyn EventSink> = if let Some((host, port)) = &config.replay_target {
        log::info!("replaying to {host}:{port}");
        let replay_stream = TcpStream::connect(format!("{host}:{port}"))?;
        Box::new(ReplaySink::new(replay_stream))
    } else if let Some(path) = &config.output_path {
        Box::new(StdoutSink::new(File::create(path)?))
    } else {
        Box::new(StdoutSink::new(std::io::stdout()))
    };

    let started = Instant::now();
    let total_keys = StreamLoop::new(payload, sink.as_mut(), &config).run()?;
    println!("decoded {total_keys} keys in {:.2?}", started.elapsed());

    Ok(())
}
