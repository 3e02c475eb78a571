use clap;
use libsoc::{Polarity, Pwm, Result, Soc};
use crate::cmd::*;

pub fn command<'a, 'b>() -> clap::App<'a, 'b> {
    let chip = || number_arg("chip", "The PWM chip");
    let pin = || number_arg("pin", "The output on the chip");
    clap::SubCommand::with_name("pwm")
        .about("Configure pulse width modulated outputs")
        .setting(clap::AppSettings::SubcommandRequiredElseHelp)
        .subcommand(clap::SubCommand::with_name("set")
            .about("Apply settings to an output")
            .arg(chip())
            .arg(pin())
            .arg(clap::Arg::with_name("period")
                .long("period")
                .takes_value(true)
                .validator(regex_validator!(r"^\d+$"))
                .help("The period in nanoseconds"))
            .arg(clap::Arg::with_name("duty")
                .long("duty")
                .takes_value(true)
                .validator(regex_validator!(r"^\d+$"))
                .help("The duty cycle in nanoseconds. May not exceed the period"))
            .arg(clap::Arg::with_name("polarity")
                .long("polarity")
                .takes_value(true)
                .possible_values(&["normal", "inversed"]))
            .arg(clap::Arg::with_name("enable")
                .long("enable")
                .conflicts_with("disable")
                .help("Turn the output on"))
            .arg(clap::Arg::with_name("disable")
                .long("disable")
                .help("Turn the output off")))
        .subcommand(clap::SubCommand::with_name("get")
            .about("Print the settings of an output")
            .arg(chip())
            .arg(pin()))
}

pub fn from_command(args: &clap::ArgMatches, soc: &Soc) -> Result<()> {
    match args.subcommand() {
        ("set", Some(args)) => {
            let mut pwm = Pwm::new(soc, number(args, "chip")?, number(args, "pin")?);
            if let Some(period) = optional_number(args, "period")? {
                pwm = pwm.period(period);
            }
            if let Some(duty) = optional_number(args, "duty")? {
                pwm = pwm.duty_cycle(duty);
            }
            if let Some(polarity) = parsed::<Polarity>(args, "polarity")? {
                pwm = pwm.polarity(polarity);
            }
            if args.is_present("enable") {
                pwm = pwm.enabled(true);
            } else if args.is_present("disable") {
                pwm = pwm.enabled(false);
            }
            pwm.open()?;
            pwm.close()
        }
        ("get", Some(args)) => {
            let pwm = Pwm::new(soc, number(args, "chip")?, number(args, "pin")?);
            pwm.open()?;
            println!("period: {}", pwm.get_period()?);
            println!("duty_cycle: {}", pwm.get_duty_cycle()?);
            println!("polarity: {}", pwm.get_polarity()?);
            println!("enabled: {}", pwm.is_enabled()?);
            pwm.close()
        }
        (name, _) => Err(unknown_subcommand(name)),
    }
}
