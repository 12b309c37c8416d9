use clap::{Parser, Subcommand, ValueEnum};
use color_eyre::eyre::Result;
use lotus_lamp_controller::*;
use tokio::time::Duration;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configured device name (defaults to the first device in the config)
    #[arg(long, global = true)]
    device: Option<String>,

    /// Path to a configuration file (defaults to the standard locations)
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Clone, Copy, ValueEnum, Debug)]
enum NamedColor {
    Red,
    Green,
    Blue,
    White,
    Yellow,
    Cyan,
    Magenta,
    Orange,
    Purple,
    Pink,
    Off,
}

impl NamedColor {
    fn rgb(self) -> (u8, u8, u8) {
        match self {
            NamedColor::Red => (255, 0, 0),
            NamedColor::Green => (0, 255, 0),
            NamedColor::Blue => (0, 0, 255),
            NamedColor::White => (255, 255, 255),
            NamedColor::Yellow => (255, 255, 0),
            NamedColor::Cyan => (0, 255, 255),
            NamedColor::Magenta => (255, 0, 255),
            NamedColor::Orange => (255, 165, 0),
            NamedColor::Purple => (128, 0, 128),
            NamedColor::Pink => (255, 192, 203),
            NamedColor::Off => (0, 0, 0),
        }
    }
}

#[derive(Clone, Copy, ValueEnum, Debug)]
enum TimerTarget {
    /// The power-on timer
    On,
    /// The power-off timer
    Off,
}

impl From<TimerTarget> for TimerKind {
    fn from(target: TimerTarget) -> TimerKind {
        match target {
            TimerTarget::On => TimerKind::On,
            TimerTarget::Off => TimerKind::Off,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Demonstration of lamp features
    Demo {
        /// Duration of each demo step in seconds
        #[arg(short, long, default_value_t = 3)]
        duration: u64,
    },
    /// Scan for nearby lamps (no configuration required)
    Scan {
        /// How long to scan in seconds
        #[arg(short, long, default_value_t = 10)]
        timeout: u64,
    },
    /// Turn the lamp on
    On,
    /// Turn the lamp off
    Off,
    /// Set a color by name
    Color {
        /// Color name
        #[arg(value_enum)]
        color: NamedColor,
    },
    /// Set a custom RGB color
    Rgb {
        /// Red value (0-255)
        #[arg(short, long, default_value_t = 255)]
        red: u8,
        /// Green value (0-255)
        #[arg(short, long, default_value_t = 255)]
        green: u8,
        /// Blue value (0-255)
        #[arg(short, long, default_value_t = 255)]
        blue: u8,
    },
    /// Set brightness
    Brightness {
        /// Brightness level (0-100)
        #[arg(short, long, default_value_t = 100)]
        level: u8,
    },
    /// Set animation speed
    Speed {
        /// Speed level (0-100); only affects animations
        #[arg(short, long, default_value_t = 50)]
        level: u8,
    },
    /// Set an animation mode
    Mode {
        /// Mode number (0-212)
        mode: u8,
    },
    /// List or search documented animation modes
    Modes {
        /// Search term; lists everything when omitted
        query: Option<String>,
    },
    /// Crossfade through the hue circle with solid-color commands
    Rainbow {
        /// Total duration in seconds
        #[arg(short, long, default_value_t = 5)]
        duration: u64,
    },
    /// Synchronize the lamp clock with the system time
    SyncTime,
    /// Set an arbitrary time on the lamp
    SetTime {
        /// Hour (0-23)
        hour: u8,
        /// Minute (0-59)
        minute: u8,
        /// Day (mon,tue,wed,thu,fri,sat,sun)
        day: String,
        /// Second (0-59)
        #[arg(default_value_t = 0)]
        second: u8,
    },
    /// Schedule the lamp to turn on
    TimerOn {
        /// Hour (0-23)
        #[arg(long, default_value_t = 8)]
        hour: u8,
        /// Minute (0-59)
        #[arg(short, long, default_value_t = 30)]
        minute: u8,
        /// Days (mon,tue,...,sun,all,weekdays,weekend); omit for a one-shot timer
        #[arg(short, long)]
        days: Option<String>,
    },
    /// Schedule the lamp to turn off
    TimerOff {
        /// Hour (0-23)
        #[arg(long, default_value_t = 23)]
        hour: u8,
        /// Minute (0-59)
        #[arg(short, long, default_value_t = 0)]
        minute: u8,
        /// Days (mon,tue,...,sun,all,weekdays,weekend); omit for a one-shot timer
        #[arg(short, long)]
        days: Option<String>,
    },
    /// Disable a previously set timer
    TimerDisable {
        /// Which timer to disable
        #[arg(value_enum)]
        target: TimerTarget,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with pretty colors
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("RUST_LOG")
                .unwrap_or_else(|_| EnvFilter::new("lotus_lamp_controller=info")),
        )
        .compact()
        .init();

    // Initialize color-eyre for pretty error reporting
    color_eyre::install()?;

    let cli = Cli::parse();
    debug!("Parsed command line arguments");

    let command = cli.command.unwrap_or(Commands::Demo { duration: 3 });

    // Commands that do not need a connected lamp
    match &command {
        Commands::Scan { timeout } => {
            let lamps = LotusLamp::scan(Duration::from_secs(*timeout)).await?;
            if lamps.is_empty() {
                println!("No lamps found. Make sure the lamp is powered on and nearby.");
            }
            for lamp in lamps {
                match lamp.rssi {
                    Some(rssi) => println!("{}  {}  ({} dBm)", lamp.address, lamp.name, rssi),
                    None => println!("{}  {}", lamp.address, lamp.name),
                }
            }
            return Ok(());
        }
        Commands::Modes { query } => {
            let results = match query {
                Some(query) => modes::search_modes(query),
                None => modes::documented_modes().collect(),
            };
            if results.is_empty() {
                println!("No matching modes. Any number 0-212 still works with `mode`.");
            }
            for (number, info) in results {
                println!("{number:3}  {:8}  {}", info.category.to_string(), info.name);
            }
            return Ok(());
        }
        _ => {}
    }

    let config = load_device_config(cli.config.as_deref(), cli.device.as_deref())?;
    let mut lamp = match LotusLamp::connect(config).await {
        Ok(lamp) => lamp,
        Err(e) => {
            error!("Failed to connect to lamp: {}", e);
            return Err(e.into());
        }
    };

    match command {
        Commands::Demo { duration } => {
            run_demo(&mut lamp, duration).await?;
        }
        Commands::Scan { .. } | Commands::Modes { .. } => unreachable!(),
        Commands::On => {
            lamp.power_on().await?;
        }
        Commands::Off => {
            lamp.power_off().await?;
        }
        Commands::Color { color } => {
            let (red, green, blue) = color.rgb();
            lamp.power_on().await?;
            lamp.set_color(red, green, blue).await?;
        }
        Commands::Rgb { red, green, blue } => {
            lamp.power_on().await?;
            lamp.set_color(red, green, blue).await?;
        }
        Commands::Brightness { level } => {
            // The lamp must be on for brightness changes to be visible
            lamp.power_on().await?;
            lamp.set_brightness(level).await?;
        }
        Commands::Speed { level } => {
            lamp.set_speed(level).await?;
        }
        Commands::Mode { mode } => {
            lamp.power_on().await?;
            lamp.set_animation(mode).await?;
            if let Some(name) = modes::mode_name(mode) {
                info!("Mode {}: {}", mode, name);
            }
        }
        Commands::Rainbow { duration } => {
            lamp.power_on().await?;
            lamp.rainbow_cycle(Duration::from_secs(duration), 30).await?;
        }
        Commands::SyncTime => {
            lamp.sync_time().await?;
        }
        Commands::SetTime {
            hour,
            minute,
            second,
            day,
        } => {
            let weekday: Weekday = day.parse()?;
            lamp.set_custom_time(hour, minute, second, weekday).await?;
        }
        Commands::TimerOn { hour, minute, days } => {
            let days = parse_days(days.as_deref())?;
            lamp.set_timer_on(hour, minute, &days).await?;
        }
        Commands::TimerOff { hour, minute, days } => {
            let days = parse_days(days.as_deref())?;
            lamp.set_timer_off(hour, minute, &days).await?;
        }
        Commands::TimerDisable { target } => {
            lamp.disable_timer(target.into()).await?;
        }
    }

    lamp.disconnect().await?;
    Ok(())
}

/// Load the device configuration from an explicit file or the defaults
fn load_device_config(
    config_path: Option<&str>,
    device_name: Option<&str>,
) -> lotus_lamp_controller::Result<DeviceConfig> {
    let manager = match config_path {
        Some(path) => ConfigManager::load(path)?,
        None => ConfigManager::discover()?,
    };
    manager.resolve(device_name)
}

/// Parse a days argument into a weekday set; `None` means a one-shot timer
fn parse_days(days: Option<&str>) -> lotus_lamp_controller::Result<Vec<Weekday>> {
    let Some(days) = days else {
        return Ok(Vec::new());
    };

    let mut result = Vec::new();
    for part in days.split(',') {
        match part.trim().to_lowercase().as_str() {
            "all" => result.extend(Weekday::ALL),
            "weekdays" => result.extend(schedule::WEEKDAYS),
            "weekend" => result.extend(schedule::WEEKEND),
            day => result.push(day.parse()?),
        }
    }
    Ok(result)
}

/// Sleep for specified number of seconds
async fn sleep(seconds: u64) {
    tokio::time::sleep(Duration::from_secs(seconds)).await;
}

/// Run a demonstration of the lamp's features
async fn run_demo(lamp: &mut LotusLamp, duration: u64) -> Result<()> {
    info!("Running lamp demo with {}s intervals", duration);

    info!("Turning lamp on");
    lamp.power_on().await?;
    sleep(duration).await;

    // Solid colors
    info!("Setting color to red");
    lamp.set_color(255, 0, 0).await?;
    sleep(duration).await;

    info!("Setting color to green");
    lamp.set_color(0, 255, 0).await?;
    sleep(duration).await;

    info!("Setting color to blue");
    lamp.set_color(0, 0, 255).await?;
    sleep(duration).await;

    // Brightness steps
    info!("Setting brightness to 50%");
    lamp.set_brightness(50).await?;
    sleep(duration).await;

    info!("Setting brightness to 100%");
    lamp.set_brightness(100).await?;
    sleep(duration).await;

    // Animation with speed control
    info!("Setting animation mode 1");
    lamp.set_animation(1).await?;
    sleep(duration).await;

    info!("Slowing animation down (speed 20)");
    lamp.set_speed(20).await?;
    sleep(duration).await;

    info!("Speeding animation up (speed 100)");
    lamp.set_speed(100).await?;
    sleep(duration).await;

    // Rainbow of solid-color commands
    info!("Rainbow cycle");
    lamp.rainbow_cycle(Duration::from_secs(duration), 30).await?;

    info!("Turning lamp off to end demo");
    lamp.power_off().await?;

    info!("Demo completed!");
    Ok(())
}
