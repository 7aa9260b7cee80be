use koruza_frame::{FRAME_MAX_LENGTH, MARKER_END, MARKER_ESCAPE, MARKER_START};

use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("koruza {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: koruza");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!(
        "rustc: {}",
        option_env!("RUSTC_VERSION").unwrap_or("unknown")
    );
    println!("git_hash: {}", option_env!("GIT_HASH").unwrap_or("unknown"));
    println!(
        "frame: start=0x{MARKER_START:02X} end=0x{MARKER_END:02X} escape=0x{MARKER_ESCAPE:02X} max_length={FRAME_MAX_LENGTH}"
    );
    println!("checksum: additive-u32");

    Ok(SUCCESS)
}
