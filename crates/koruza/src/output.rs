use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use koruza_frame::FrameStats;
use koruza_message::Message;
use koruza_supervisor::{StatusSnapshot, SurveySnapshot};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct FieldOutput {
    tag: &'static str,
    code: u8,
    length: usize,
    value: String,
}

#[derive(Serialize)]
struct MessageOutput {
    #[serde(skip_serializing_if = "Option::is_none")]
    command: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply: Option<&'static str>,
    fields: Vec<FieldOutput>,
    summary: String,
}

impl MessageOutput {
    fn new(message: &Message) -> Self {
        Self {
            command: message.command_code().map(|c| c.name()),
            reply: message.reply_code().map(|r| r.name()),
            fields: message
                .fields()
                .iter()
                .map(|field| FieldOutput {
                    tag: field.tag.name(),
                    code: field.tag.into(),
                    length: field.value.len(),
                    value: hex::encode(&field.value),
                })
                .collect(),
            summary: message.to_string(),
        }
    }
}

#[derive(Serialize)]
struct EncodedOutput<'a> {
    message: MessageOutput,
    frame_size: usize,
    frame: &'a str,
}

/// Print a freshly encoded frame.
pub fn print_encoded(message: &Message, frame: &[u8], format: OutputFormat) {
    let encoded = hex::encode(frame);
    match format {
        OutputFormat::Json => {
            let out = EncodedOutput {
                message: MessageOutput::new(message),
                frame_size: frame.len(),
                frame: &encoded,
            };
            print_json(&out);
        }
        OutputFormat::Table => {
            let mut table = fields_table(message);
            table.add_row(vec![
                "frame".to_string(),
                "-".to_string(),
                frame.len().to_string(),
                encoded,
            ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!("{message}");
            println!("frame ({} bytes): {encoded}", frame.len());
        }
        OutputFormat::Raw => print_raw(frame),
    }
}

#[derive(Serialize)]
struct DecodedOutput {
    messages: Vec<MessageOutput>,
    delivered: u64,
    rejected: u64,
    oversized: u64,
}

/// Print messages recovered from a byte stream along with decode counters.
pub fn print_decoded(messages: &[Message], stats: FrameStats, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = DecodedOutput {
                messages: messages.iter().map(MessageOutput::new).collect(),
                delivered: stats.delivered,
                rejected: stats.rejected,
                oversized: stats.oversized,
            };
            print_json(&out);
        }
        OutputFormat::Table => {
            for message in messages {
                println!("{}", fields_table(message));
            }
            println!(
                "delivered={} rejected={} oversized={}",
                stats.delivered, stats.rejected, stats.oversized
            );
        }
        OutputFormat::Pretty | OutputFormat::Raw => {
            for message in messages {
                println!("{message}");
            }
        }
    }
}

/// Print a supervisor status snapshot and the survey grid summary.
pub fn print_status(status: &StatusSnapshot, survey: &SurveySnapshot, format: OutputFormat) {
    match format {
        OutputFormat::Json | OutputFormat::Raw => {
            print_json(&serde_json::json!({ "status": status, "survey": survey }));
        }
        OutputFormat::Table => {
            let position = &status.motors.position;
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["FIELD", "VALUE"])
                .add_row(vec!["id".to_string(), status.id.clone()])
                .add_row(vec!["connected".to_string(), status.connected.to_string()])
                .add_row(vec![
                    "motors".to_string(),
                    format!("({}, {}, {})", position.x, position.y, position.z),
                ])
                .add_row(vec![
                    "range".to_string(),
                    format!("±{} / ±{}", status.motors.range_x, status.motors.range_y),
                ])
                .add_row(vec![
                    "rx_power_mw".to_string(),
                    format!("{:.4}", status.sfp.rx_power_mw),
                ])
                .add_row(vec![
                    "survey".to_string(),
                    format!(
                        "{} of {} cells",
                        survey.points.len(),
                        survey.bins * survey.bins
                    ),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            let position = &status.motors.position;
            println!(
                "id={} connected={} motors=({}, {}, {}) rx_power_mw={:.4} survey_points={}",
                status.id,
                status.connected,
                position.x,
                position.y,
                position.z,
                status.sfp.rx_power_mw,
                survey.points.len()
            );
        }
    }
}

fn fields_table(message: &Message) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["TAG", "CODE", "LENGTH", "VALUE"]);
    for field in message.fields() {
        table.add_row(vec![
            field.tag.name().to_string(),
            u8::from(field.tag).to_string(),
            field.value.len().to_string(),
            hex::encode(&field.value),
        ]);
    }
    table
}

fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}
