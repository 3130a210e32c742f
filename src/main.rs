extern crate chrono;
extern crate clap;
extern crate embedded_hal;
extern crate fern;
#[macro_use]
extern crate log;
extern crate usi_i2c;

use std::error::Error;
use std::num::ParseIntError;
use std::time::Duration;

use clap::{Parser, Subcommand};
use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;

use usi_i2c::bit_layer::{is_reserved_7b, Config, Line, NoDelay, StdDelay, StretchLimit, UsiMaster};
use usi_i2c::emulation::{RegisterDevice, SimBus, Stretch};
use usi_i2c::gpio::GpioLine;

/// Software I2C master on two GPIO pins.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// BCM number of the clock pin
    #[arg(long, default_value_t = 3)]
    scl: u8,

    /// BCM number of the data pin
    #[arg(long, default_value_t = 2)]
    sda: u8,

    /// Half clock period in microseconds
    #[arg(long, default_value_t = 4)]
    half_period_us: u64,

    /// Give up on a stretched clock after this many milliseconds, 0 waits forever
    #[arg(long, default_value_t = 100)]
    stretch_timeout_ms: u64,

    /// More output, repeat for more
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the addresses that acknowledge
    Scan,
    /// Write bytes to a device
    Write {
        #[arg(short, long, value_parser = parse_byte)]
        address: u8,
        #[arg(value_parser = parse_byte, required = true)]
        bytes: Vec<u8>,
    },
    /// Read bytes from a device, optionally selecting a register first
    Read {
        #[arg(short, long, value_parser = parse_byte)]
        address: u8,
        #[arg(short, long, value_parser = parse_byte)]
        register: Option<u8>,
        #[arg(short, long, default_value_t = 1)]
        count: usize,
    },
    /// Run a write and a read against a simulated register device
    Simulate {
        /// Hold the clock low for this many polls on every pulse
        #[arg(long, default_value_t = 0)]
        stretch: u32,
    },
}

fn parse_byte(value: &str) -> Result<u8, ParseIntError> {
    match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => value.parse(),
    }
}

fn setup_logger(verbosity: u8) -> Result<(), fern::InitError> {
    let level = match verbosity {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}[{}][{}] {}",
                chrono::Local::now().format("[%Y-%m-%d][%H:%M:%S%.6f]"),
                record.target(),
                record.level(),
                message
            ))
        })
        .level(level)
        .chain(std::io::stderr())
        .apply()?;
    Ok(())
}

fn config_from(cli: &Cli) -> Config {
    let clock_stretch = match cli.stretch_timeout_ms {
        0 => StretchLimit::Unbounded,
        ms => StretchLimit::Deadline(Duration::from_millis(ms)),
    };

    Config::builder()
        .half_period(Duration::from_micros(cli.half_period_us))
        .clock_stretch(clock_stretch)
        .build()
}

fn format_bytes(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|byte| format!("{:#04x}", byte))
        .collect::<Vec<_>>()
        .join(" ")
}

fn scan<L, D>(master: &mut UsiMaster<L, D>) -> Result<Vec<u8>, usi_i2c::Error<L::Error>>
where
    L: Line,
    D: DelayNs,
{
    let mut found = Vec::new();
    for address in (0x00..=0x7F).filter(|address| !is_reserved_7b(*address)) {
        if master.probe(address)? {
            info!("Device answered at {:#04x}", address);
            found.push(address);
        }
    }
    Ok(found)
}

fn simulate(config: Config, stretch: u32) -> Result<(), Box<dyn Error>> {
    let bus = SimBus::new(RegisterDevice::new(0x68, vec![0; 8]));
    if stretch > 0 {
        bus.stretch_clock(Stretch::Polls(stretch));
    }

    let (scl, sda) = bus.lines();
    let mut master = UsiMaster::new(scl, sda, NoDelay, config);
    master.init()?;

    master.write(0x68, &[0x02, 0x17, 0x44])?;
    println!("write: {}", bus.transcript());
    bus.clear_events();

    let mut buffer = [0u8; 2];
    master.write_read(0x68, &[0x02], &mut buffer)?;
    println!("read:  {}", bus.transcript());
    println!("data:  {}", format_bytes(&buffer));
    if stretch > 0 {
        println!("clock stretched {} times", bus.stretches());
    }
    Ok(())
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let config = config_from(&cli);
    info!(
        "Bus clock about {} Hz, clock stretch limit {:?}",
        config.bus_frequency_hz(),
        config.clock_stretch
    );

    match cli.command {
        Command::Simulate { stretch } => simulate(config, stretch),
        command => on_hardware(cli.scl, cli.sda, config, command),
    }
}

fn on_hardware(scl: u8, sda: u8, config: Config, command: Command) -> Result<(), Box<dyn Error>> {
    let (scl, sda) = GpioLine::pair(scl, sda)?;
    let mut master = UsiMaster::new(scl, sda, StdDelay, config);
    master.init()?;

    match command {
        Command::Scan => {
            let found = scan(&mut master)?;
            if found.is_empty() {
                println!("no devices found");
            } else {
                println!("{}", format_bytes(&found));
            }
        }
        Command::Write { address, bytes } => {
            master.write(address, &bytes)?;
        }
        Command::Read {
            address,
            register,
            count,
        } => {
            let mut buffer = vec![0u8; count];
            match register {
                Some(register) => master.write_read(address, &[register], &mut buffer)?,
                None => master.read(address, &mut buffer)?,
            }
            println!("{}", format_bytes(&buffer));
        }
        Command::Simulate { stretch } => simulate(config, stretch)?,
    }

    Ok(())
}

fn main() {
    let cli = Cli::parse();
    setup_logger(cli.verbose).expect("Could not init logger.");

    trace!("Setting up main");

    match run(cli) {
        Ok(()) => {}
        Err(error) => {
            eprintln!("Error: {}", error);
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_and_decimal() {
        assert_eq!(parse_byte("0x27"), Ok(0x27));
        assert_eq!(parse_byte("0XA0"), Ok(0xA0));
        assert_eq!(parse_byte("104"), Ok(104));
        assert!(parse_byte("0x100").is_err());
    }

    #[test]
    fn zero_timeout_waits_forever() {
        let cli = Cli::parse_from(["usi-i2c", "--stretch-timeout-ms", "0", "scan"]);
        assert_eq!(config_from(&cli).clock_stretch, StretchLimit::Unbounded);
    }
}
