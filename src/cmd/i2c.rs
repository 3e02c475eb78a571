use clap;
use libsoc::{I2c, Result, Soc};
use std::time::Duration;
use crate::cmd::*;
use crate::util;

pub fn command<'a, 'b>() -> clap::App<'a, 'b> {
    let bus = || number_arg("bus", "The I2C bus");
    let address = || number_arg("address", "The 7-bit address of the device");
    let timeout = || clap::Arg::with_name("timeout")
        .long("timeout")
        .takes_value(true)
        .validator(regex_validator!(r"^\d+$"))
        .help("The bus timeout in milliseconds, rounded up to 10ms");
    clap::SubCommand::with_name("i2c")
        .about("Transfer data with I2C devices")
        .setting(clap::AppSettings::SubcommandRequiredElseHelp)
        .subcommand(clap::SubCommand::with_name("read")
            .about("Read bytes from a device and print them in hex")
            .arg(bus())
            .arg(address())
            .arg(number_arg("count", "The number of bytes to read"))
            .arg(clap::Arg::with_name("register")
                .long("register")
                .takes_value(true)
                .validator(regex_validator!(util::NUMBER))
                .help("Select this register before reading"))
            .arg(timeout()))
        .subcommand(clap::SubCommand::with_name("write")
            .about("Write bytes to a device")
            .arg(bus())
            .arg(address())
            .arg(clap::Arg::with_name("bytes")
                .required(true)
                .multiple(true)
                .validator(regex_validator!(util::HEX_BYTES))
                .help("The bytes to write in hex, e.g. \"02 ff\""))
            .arg(timeout()))
}

fn open(args: &clap::ArgMatches, soc: &Soc) -> Result<I2c> {
    let dev = I2c::new(soc, number(args, "bus")?, number(args, "address")?)?;
    dev.open()?;
    if let Some(ms) = optional_number::<u64>(args, "timeout")? {
        dev.set_timeout(Duration::from_millis(ms))?;
    }
    Ok(dev)
}

pub fn from_command(args: &clap::ArgMatches, soc: &Soc) -> Result<()> {
    match args.subcommand() {
        ("read", Some(args)) => {
            let count: usize = number(args, "count")?;
            let dev = open(args, soc)?;
            if let Some(register) = optional_number::<u8>(args, "register")? {
                dev.write(&[register])?;
            }
            println!("{}", util::format_bytes(&dev.read(count)?));
            dev.close()
        }
        ("write", Some(args)) => {
            let bytes = util::parse_bytes(args.values_of("bytes").into_iter().flatten())?;
            let dev = open(args, soc)?;
            dev.write(&bytes)?;
            dev.close()
        }
        (name, _) => Err(unknown_subcommand(name)),
    }
}
