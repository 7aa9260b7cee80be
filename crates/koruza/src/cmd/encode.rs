use koruza_frame::{frame_message, FRAME_MAX_LENGTH};
use koruza_message::{Message, MotorPosition};

use crate::cmd::{CommandName, EncodeArgs};
use crate::exit::{frame_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_encoded, OutputFormat};

pub fn run(args: EncodeArgs, format: OutputFormat) -> CliResult<i32> {
    let message = build_message(&args)?;
    let frame =
        frame_message(&message, FRAME_MAX_LENGTH).map_err(|err| frame_error("encode failed", err))?;
    print_encoded(&message, &frame, format);
    Ok(SUCCESS)
}

fn build_message(args: &EncodeArgs) -> CliResult<Message> {
    let mut message = Message::command(args.command.into());

    match (args.command, args.position.as_deref()) {
        (_, Some(&[x, y, z])) => {
            message.add_motor_position(&MotorPosition::new(x, y, z));
        }
        (_, Some(other)) => {
            return Err(CliError::new(
                USAGE,
                format!("--position expects X,Y,Z, got {} values", other.len()),
            ));
        }
        (CommandName::MoveMotor, None) => {
            return Err(CliError::new(USAGE, "move-motor requires --position X,Y,Z"));
        }
        (_, None) => {}
    }

    if let Some(power) = args.power {
        message.add_power_reading(power);
    }
    Ok(message)
}
