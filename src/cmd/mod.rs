use clap;
use libsoc::{Error, Result, Soc};
use std::convert::TryFrom;
use std::str::FromStr;
use crate::util;

pub mod adc;
pub mod gpio;
pub mod i2c;
pub mod pwm;
pub mod spi;

/// Runs a subcommand against the board.
pub type Handler = fn(&clap::ArgMatches, &Soc) -> Result<()>;

pub fn commands<'a, 'b>() -> Vec<(clap::App<'a, 'b>, Handler)> {
    vec![
        (adc::command(), adc::from_command),
        (gpio::command(), gpio::from_command),
        (i2c::command(), i2c::from_command),
        (pwm::command(), pwm::from_command),
        (spi::command(), spi::from_command),
    ]
}

/// A positional argument holding a decimal or hexadecimal number.
pub fn number_arg<'a, 'b>(name: &'a str, help: &'a str) -> clap::Arg<'a, 'b> {
    clap::Arg::with_name(name)
        .required(true)
        .validator(regex_validator!(util::NUMBER))
        .help(help)
}

pub fn number<T: TryFrom<u64>>(args: &clap::ArgMatches, name: &str) -> Result<T> {
    let value = args
        .value_of(name)
        .ok_or_else(|| Error::InvalidArgument(format!("missing {}", name)))?;
    util::parse_number(value)
}

pub fn optional_number<T: TryFrom<u64>>(args: &clap::ArgMatches, name: &str) -> Result<Option<T>> {
    match args.value_of(name) {
        Some(value) => util::parse_number(value).map(Some),
        None => Ok(None),
    }
}

/// Parses an argument with the `FromStr` implementation of a libsoc type.
pub fn parsed<T>(args: &clap::ArgMatches, name: &str) -> Result<Option<T>>
where
    T: FromStr<Err = Error>,
{
    args.value_of(name).map(str::parse).transpose()
}

pub fn unknown_subcommand(name: &str) -> Error {
    Error::InvalidArgument(format!("unknown subcommand \"{}\"", name))
}
