use std::io::{Read, Write};

use anyhow::{anyhow, ensure};

use crate::resp::{read_payload_prefix, PayloadPrefix, RespDecoder, RespValue};

/// What the master told us in its `+FULLRESYNC <id> <offset>` reply.
#[derive(Debug, Clone, PartialEq)]
pub struct FullResync {
    pub replication_id: String,
    pub master_offset: i64,
}

fn expect_simple_string<S: Read>(stream: &mut S, expected: &str, step: &str) -> Result<(), anyhow::Error> {
    let reply = RespDecoder::new(stream).read_value()?;
    let text = reply.as_string()?;
    ensure!(
        text == expected,
        "expected {expected:?} from the master during {step}, got {text:?}"
    );
    Ok(())
}

/// Runs the PSYNC handshake over an already-connected stream: PING,
/// REPLCONF listening-port, REPLCONF capa psync2, PSYNC ? -1. Returns the
/// parsed FULLRESYNC reply and the payload prefix that introduces the RDB
/// transfer.
pub fn perform_handshake<S: Read + Write>(
    stream: &mut S,
    listening_port: u16,
) -> Result<(FullResync, PayloadPrefix), anyhow::Error> {
    log::debug!("handshake: PING");
    write_command(stream, &["PING"])?;
    expect_simple_string(stream, "PONG", "PING")?;

    log::debug!("handshake: REPLCONF listening-port {listening_port}");
    write_command(stream, &["REPLCONF", "listening-port", &listening_port.to_string()])?;
    expect_simple_string(stream, "OK", "REPLCONF listening-port")?;

    log::debug!("handshake: REPLCONF capa psync2");
    write_command(stream, &["REPLCONF", "capa", "psync2"])?;
    expect_simple_string(stream, "OK", "REPLCONF capa")?;

    log::debug!("handshake: PSYNC ? -1");
    write_command(stream, &["PSYNC", "?", "-1"])?;
    let reply = RespDecoder::new(&mut *stream).read_value()?;
    let text = reply.as_string()?;
    let full_resync = parse_fullresync(&text)?;
    log::info!(
        "full resync: replication id {}, offset {}",
        full_resync.replication_id,
        full_resync.master_offset
    );

    let prefix = read_payload_prefix(stream)?;
    Ok((full_resync, prefix))
}

fn write_command<S: Write>(stream: &mut S, parts: &[&str]) -> Result<(), anyhow::Error> {
    let value = RespValue::array(parts.iter().map(|p| RespValue::bulk_string(p)).collect());
    stream.write_all(&value.serialize())?;
    Ok(())
}

fn parse_fullresync(text: &str) -> Result<FullResync, anyhow::Error> {
    let mut parts = text.split(' ');
    let tag = parts.next().ok_or_else(|| anyhow!("empty PSYNC reply"))?;
    ensure!(tag == "FULLRESYNC", "expected FULLRESYNC, got {text:?}");
    let replication_id = parts
        .next()
        .ok_or_else(|| anyhow!("FULLRESYNC reply missing replication id: {text:?}"))?
        .to_string();
    let master_offset = parts
        .next()
        .ok_or_else(|| anyhow!("FULLRESYNC reply missing offset: {text:?}"))?
        .parse()
        .map_err(|e| anyhow!("FULLRESYNC offset is not an integer: {e}"))?;
    Ok(FullResync { replication_id, master_offset })
}
