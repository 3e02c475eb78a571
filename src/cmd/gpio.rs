use clap;
use libsoc::{Board, Direction, Edge, Error, Gpio, Level, Result, Soc};
use std::time::Duration;
use crate::cmd::*;

pub fn command<'a, 'b>() -> clap::App<'a, 'b> {
    let id = || number_arg("id", "The GPIO number");
    clap::SubCommand::with_name("gpio")
        .about("Read, drive and watch GPIO lines")
        .setting(clap::AppSettings::SubcommandRequiredElseHelp)
        .subcommand(clap::SubCommand::with_name("get")
            .about("Print the level of an input")
            .arg(id()))
        .subcommand(clap::SubCommand::with_name("set")
            .about("Drive an output")
            .arg(id())
            .arg(clap::Arg::with_name("level")
                .required(true)
                .possible_values(&["0", "1", "low", "high"])
                .help("The level to drive the output to")))
        .subcommand(clap::SubCommand::with_name("wait")
            .about("Wait for an edge on an input")
            .arg(id())
            .arg(clap::Arg::with_name("edge")
                .long("edge")
                .takes_value(true)
                .default_value("both")
                .possible_values(&["rising", "falling", "both"])
                .help("The transition to wait for"))
            .arg(clap::Arg::with_name("timeout")
                .long("timeout")
                .takes_value(true)
                .validator(regex_validator!(r"^\d+$"))
                .help("Give up after this many milliseconds. Waits indefinitely if omitted")))
        .subcommand(clap::SubCommand::with_name("id")
            .about("Print the GPIO number of a pin name in the board configuration")
            .arg(clap::Arg::with_name("pin")
                .required(true)
                .help("The pin name, e.g. P9_12")))
}

pub fn from_command(args: &clap::ArgMatches, soc: &Soc) -> Result<()> {
    match args.subcommand() {
        ("get", Some(args)) => {
            let gpio = Gpio::new(soc, number(args, "id")?, Direction::Input);
            gpio.open()?;
            println!("{}", gpio.level()?.to_raw());
            gpio.close()
        }
        ("set", Some(args)) => {
            let level: Level = parsed(args, "level")?.unwrap_or(Level::Low);
            let gpio = Gpio::new(soc, number(args, "id")?, Direction::Output);
            gpio.open()?;
            gpio.set_level(level)?;
            gpio.close()
        }
        ("wait", Some(args)) => {
            let edge: Edge = parsed(args, "edge")?.unwrap_or(Edge::Both);
            let timeout = optional_number::<u64>(args, "timeout")?.map(Duration::from_millis);
            let gpio = Gpio::new(soc, number(args, "id")?, Direction::Input).edge(edge);
            gpio.open()?;
            if !gpio.wait_for_interrupt(timeout)? {
                return Err(Error::Operation(format!(
                    "Timed out waiting for a {} edge on {}",
                    edge, gpio
                )));
            }
            println!("{}", gpio.level()?.to_raw());
            gpio.close()
        }
        ("id", Some(args)) => {
            let pin = args.value_of("pin").unwrap_or_default();
            let board = Board::new(soc);
            board.open()?;
            println!("{}", board.gpio_id(pin)?);
            board.close()
        }
        (name, _) => Err(unknown_subcommand(name)),
    }
}
