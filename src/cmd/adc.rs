use clap;
use libsoc::{Adc, Result, Soc};
use crate::cmd::*;

pub fn command<'a, 'b>() -> clap::App<'a, 'b> {
    clap::SubCommand::with_name("adc")
        .about("Sample analog inputs")
        .setting(clap::AppSettings::SubcommandRequiredElseHelp)
        .subcommand(clap::SubCommand::with_name("read")
            .about("Print the value of an ADC pin")
            .arg(number_arg("chip", "The ADC chip"))
            .arg(number_arg("pin", "The pin on the chip")))
}

pub fn from_command(args: &clap::ArgMatches, soc: &Soc) -> Result<()> {
    match args.subcommand() {
        ("read", Some(args)) => {
            let adc = Adc::new(soc, number(args, "chip")?, number(args, "pin")?);
            adc.open()?;
            println!("{}", adc.read()?);
            adc.close()
        }
        (name, _) => Err(unknown_subcommand(name)),
    }
}
