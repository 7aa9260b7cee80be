use std::io::Read;

use koruza_frame::{FrameParser, FrameStats, MessageQueue};
use koruza_message::Message;

use crate::cmd::DecodeArgs;
use crate::exit::{io_error, CliError, CliResult, DATA_INVALID, SUCCESS, USAGE};
use crate::output::{print_decoded, OutputFormat};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let text = match args.hex {
        Some(text) => text,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .map_err(|err| io_error("read stdin failed", err))?;
            buf
        }
    };
    let bytes = parse_hex(&text)?;

    let (messages, stats) = if args.payload {
        let message = Message::parse(&bytes)
            .map_err(|err| CliError::new(DATA_INVALID, format!("invalid payload: {err}")))?;
        let stats = FrameStats {
            delivered: 1,
            ..FrameStats::default()
        };
        (vec![message], stats)
    } else {
        decode_frames(&bytes)
    };

    print_decoded(&messages, stats, format);

    if messages.is_empty() && (stats.rejected > 0 || stats.oversized > 0) {
        return Err(CliError::new(
            DATA_INVALID,
            format!(
                "no valid frames ({} rejected, {} oversized)",
                stats.rejected, stats.oversized
            ),
        ));
    }
    Ok(SUCCESS)
}

fn decode_frames(bytes: &[u8]) -> (Vec<Message>, FrameStats) {
    let mut parser = FrameParser::new(MessageQueue::new());
    parser.push_buffer(bytes);
    let stats = parser.stats();
    let messages = parser.into_handler().drain().collect();
    (messages, stats)
}

fn parse_hex(text: &str) -> CliResult<Vec<u8>> {
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    let compact = compact
        .strip_prefix("0x")
        .unwrap_or(compact.as_str())
        .to_string();
    hex::decode(&compact).map_err(|err| CliError::new(USAGE, format!("invalid hex input: {err}")))
}

#[cfg(test)]
mod tests {
    use koruza_frame::frame_message;
    use koruza_message::{Command, MotorPosition};

    use super::*;

    #[test]
    fn parses_spaced_hex() {
        assert_eq!(parse_hex("f1 01\n00 f2").unwrap(), vec![0xF1, 0x01, 0x00, 0xF2]);
        assert_eq!(parse_hex("0xF1F2").unwrap(), vec![0xF1, 0xF2]);
        assert_eq!(parse_hex("zz").unwrap_err().code, USAGE);
    }

    #[test]
    fn decodes_noisy_stream() {
        let mut restore = Message::command(Command::RestoreMotor);
        restore.add_motor_position(&MotorPosition::new(-18004, -18009, 0));
        let mut bytes = vec![0x10, 0x20, 0xF3, 0xF1, 0x15, 0xF2];
        bytes.extend_from_slice(&frame_message(&restore, usize::MAX).unwrap());

        let (messages, stats) = decode_frames(&bytes);
        assert_eq!(messages, vec![restore]);
        assert_eq!(stats.rejected, 0);
    }
}
