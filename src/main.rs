#[macro_use]
mod util;
mod cmd;
mod logging;

use libsoc::sim::SimBoard;
use libsoc::{Result, Soc};
use std::collections;
use std::env;
use std::io;
use std::path::PathBuf;
use std::process;
use tracing::debug;

/// Environment variable libsoc reads the board configuration path from.
const BOARD_CONFIG_ENV: &str = "LIBSOC_CONF";

fn main() {
    let mut cli = clap::App::new("socctl")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Poke GPIO, ADC, PWM, I2C and SPI peripherals through libsoc.")
        .arg(clap::Arg::with_name("sim")
            .long("sim")
            .help("Use a simulated board instead of the system's libsoc. This is the default \
                   when built without the native feature"))
        .arg(clap::Arg::with_name("board-config")
            .long("board-config")
            .takes_value(true)
            .help("The board configuration that maps pin names to GPIO numbers. Defaults to \
                   the LIBSOC_CONF environment variable"))
        .arg(clap::Arg::with_name("debug")
            .short("d")
            .long("debug")
            .help("Enable debug logging, including libsoc's own"));

    let mut handlers = collections::HashMap::new();
    for (command, handler) in cmd::commands() {
        handlers.insert(command.get_name().to_string(), handler);
        cli = cli.subcommand(command);
    }

    let matches = cli.clone().get_matches();
    let (sub_name, sub_matches) = matches.subcommand();
    let (handler, sub_matches) = match (handlers.get(sub_name), sub_matches) {
        (Some(handler), Some(sub_matches)) => (handler, sub_matches),
        _ => {
            let mut out = io::stderr();
            let _ = cli.write_help(&mut out);
            eprintln!();
            process::exit(1);
        }
    };

    let debug = matches.is_present("debug");
    logging::init(debug);

    let result = open_soc(&matches).and_then(|soc| {
        soc.set_debug(debug);
        handler(sub_matches, &soc)
    });
    if let Err(err) = result {
        eprintln!("{}", err);
        process::exit(1);
    }
}

fn board_config(matches: &clap::ArgMatches) -> Option<PathBuf> {
    matches
        .value_of_os("board-config")
        .map(PathBuf::from)
        .or_else(|| env::var_os(BOARD_CONFIG_ENV).filter(|v| !v.is_empty()).map(PathBuf::from))
}

#[cfg(feature = "native")]
fn open_soc(matches: &clap::ArgMatches) -> Result<Soc> {
    if matches.is_present("sim") {
        return simulated(matches);
    }
    if let Some(path) = board_config(matches) {
        env::set_var(BOARD_CONFIG_ENV, &path);
    }
    debug!("using the system's libsoc");
    Ok(Soc::native())
}

#[cfg(not(feature = "native"))]
fn open_soc(matches: &clap::ArgMatches) -> Result<Soc> {
    simulated(matches)
}

/// A board with a bit of everything.
///
/// * GPIO 0 to 127
/// * ADC chip 0, pins 0 to 7, each reading 128 times its pin number
/// * PWM chip 0, outputs 0 to 3
/// * I2C bus 0 and 1, a device at 0x62 on both
/// * SPI devices 0.0 and 1.0
fn simulated(matches: &clap::ArgMatches) -> Result<Soc> {
    let board = SimBoard::new();
    for id in 0..128 {
        board.add_gpio(id);
    }
    for pin in 0..8 {
        board.set_adc(0, pin, pin * 128);
    }
    for pin in 0..4 {
        board.add_pwm(0, pin);
    }
    board.add_i2c(0, 0x62);
    board.add_i2c(1, 0x62);
    board.add_spi(0, 0);
    board.add_spi(1, 0);
    if let Some(path) = board_config(matches) {
        debug!(path = %path.display(), "loading board configuration");
        board.load_board_config(&path)?;
    }
    Ok(Soc::new(board))
}
