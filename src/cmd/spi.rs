use clap;
use libsoc::{BitsPerWord, Result, Soc, Spi, SpiMode};
use crate::cmd::*;
use crate::util;

pub fn command<'a, 'b>() -> clap::App<'a, 'b> {
    clap::SubCommand::with_name("spi")
        .about("Transfer data with SPI devices")
        .setting(clap::AppSettings::SubcommandRequiredElseHelp)
        .subcommand(clap::SubCommand::with_name("transfer")
            .about("Send bytes and print the bytes received meanwhile in hex")
            .arg(number_arg("device", "The spidev device number"))
            .arg(number_arg("chip-select", "The chip select of the device"))
            .arg(clap::Arg::with_name("bytes")
                .required(true)
                .multiple(true)
                .validator(regex_validator!(util::HEX_BYTES))
                .help("The bytes to send in hex, e.g. \"01 80 00\""))
            .arg(clap::Arg::with_name("mode")
                .long("mode")
                .takes_value(true)
                .default_value("0")
                .possible_values(&["0", "1", "2", "3"])
                .help("The SPI mode"))
            .arg(clap::Arg::with_name("speed")
                .long("speed")
                .takes_value(true)
                .default_value("1000000")
                .validator(regex_validator!(r"^[1-9]\d*$"))
                .help("The clock speed in Hz"))
            .arg(clap::Arg::with_name("bpw")
                .long("bpw")
                .takes_value(true)
                .default_value("8")
                .possible_values(&["8", "16"])
                .help("Bits per word")))
}

pub fn from_command(args: &clap::ArgMatches, soc: &Soc) -> Result<()> {
    match args.subcommand() {
        ("transfer", Some(args)) => {
            let tx = util::parse_bytes(args.values_of("bytes").into_iter().flatten())?;
            let spi = Spi::new(
                soc,
                number(args, "device")?,
                number(args, "chip-select")?,
                parsed(args, "mode")?.unwrap_or(SpiMode::Mode0),
                number(args, "speed")?,
                parsed(args, "bpw")?.unwrap_or(BitsPerWord::Eight),
            )?;
            spi.open()?;
            println!("{}", util::format_bytes(&spi.transfer(&tx)?));
            spi.close()
        }
        (name, _) => Err(unknown_subcommand(name)),
    }
}
