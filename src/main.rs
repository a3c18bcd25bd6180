//! PMS5003 Telemetry Agent Binary
//!
//! Runs the sampling agent on the device, or exercises the sensor and the
//! configuration from the command line.

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use pms_telemetry::{
    drivers::{Platform, SensorDriver},
    Agent, AgentConfig, DevicePlatform, HardwareConfig, SensorSample, DEFAULT_CYCLE_INTERVAL_MS,
    DEFAULT_MAX_ATTEMPTS, DEFAULT_WINDOW_SIZE,
};
use tracing::{info, warn, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "pms_telemetry")]
#[command(about = "PMS5003 particulate telemetry agent")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(author = "Austin Couch")]
#[command(
    long_about = "Samples a PMS5003 sensor, smooths readings over a tumbling window and publishes them over MQTT"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Wi-Fi network to join
    #[arg(long, env = "WIFI_SSID", default_value = "")]
    ssid: String,

    /// Wi-Fi pre-shared key
    #[arg(long, env = "WIFI_PASSWORD", default_value = "", hide_env_values = true)]
    password: String,

    /// Wireless interface
    #[arg(long, env = "WIFI_INTERFACE", default_value = "wlan0")]
    interface: String,

    /// MQTT broker host
    #[arg(long, env = "MQTT_HOST", default_value = "raspberrypi")]
    mqtt_host: String,

    /// MQTT broker port
    #[arg(long, env = "MQTT_PORT", default_value_t = 1883)]
    mqtt_port: u16,

    /// MQTT client identifier
    #[arg(long, env = "MQTT_CLIENT_ID", default_value = "pms5003")]
    client_id: String,

    /// Samples averaged into each published record
    #[arg(short, long, env = "WINDOW_SIZE", default_value_t = DEFAULT_WINDOW_SIZE)]
    window_size: usize,

    /// Sleep between cycles in milliseconds
    #[arg(short, long, env = "CYCLE_INTERVAL_MS", default_value_t = DEFAULT_CYCLE_INTERVAL_MS)]
    interval: u64,

    /// Network status polls before giving up
    #[arg(long, env = "MAX_ATTEMPTS", default_value_t = DEFAULT_MAX_ATTEMPTS)]
    max_attempts: u32,

    /// I2C bus the display may be attached to
    #[arg(long, env = "I2C_BUS", default_value_t = 1)]
    i2c_bus: u8,

    /// Serial device the sensor is wired to
    #[arg(long, env = "PMS_UART", default_value = "/dev/serial0")]
    uart: String,

    /// BCM pin of the status LED
    #[arg(long, env = "LED_PIN", default_value_t = 17)]
    led_pin: u8,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the telemetry agent (default)
    Run,

    /// Read samples straight from the sensor and print them as JSON lines
    Sample(SampleArgs),

    /// Print the effective configuration as JSON
    Config,
}

#[derive(Args)]
struct SampleArgs {
    /// Number of samples to read
    #[arg(short = 'n', long, default_value_t = 10)]
    count: usize,
}

impl Cli {
    fn agent_config(&self) -> AgentConfig {
        let hardware = HardwareConfig {
            i2c_bus: self.i2c_bus,
            uart_path: self.uart.clone(),
            led_pin: self.led_pin,
            ..HardwareConfig::default()
        };

        let mut config = AgentConfig::new(&self.ssid, &self.password)
            .with_interface(&self.interface)
            .with_broker(&self.mqtt_host, self.mqtt_port)
            .with_window_size(self.window_size)
            .with_cycle_interval_ms(self.interval)
            .with_max_attempts(self.max_attempts)
            .with_hardware(hardware);
        config.mqtt.client_id = self.client_id.clone();
        config
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(&cli)?;

    let config = cli.agent_config();
    match &cli.command {
        Some(Commands::Run) | None => run_command(config).await,
        Some(Commands::Sample(args)) => sample_command(config, args).await,
        Some(Commands::Config) => config_command(&config),
    }
}

fn init_logging(cli: &Cli) -> anyhow::Result<()> {
    let level = if cli.debug {
        Level::DEBUG
    } else if cli.verbose {
        Level::INFO
    } else {
        Level::WARN
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    Ok(())
}

async fn run_command(config: AgentConfig) -> anyhow::Result<()> {
    config.validate().context("invalid configuration")?;

    info!("Starting PMS5003 telemetry agent");
    info!("  - Broker: {}", config.broker_address());
    info!("  - Window: {} samples", config.sampling.window_size);
    info!("  - Cycle interval: {}ms", config.sampling.cycle_interval_ms);

    #[cfg(not(feature = "rpi"))]
    warn!("Built without the `rpi` feature; the sensor cannot be opened on this host");

    let platform = DevicePlatform::new(config.clone());
    let never = Agent::start(platform, config)
        .await
        .context("status indicator unavailable")?;
    match never {}
}

async fn sample_command(config: AgentConfig, args: &SampleArgs) -> anyhow::Result<()> {
    let interval = config.cycle_interval();
    let mut platform = DevicePlatform::new(config);
    let mut sensor = platform.sensor().context("failed to open sensor")?;

    for i in 0..args.count {
        let sample = sensor.read().await.context("sensor read failed")?;
        match sample_line(&sample)? {
            Some(line) => println!("{}", line),
            None => warn!("Discarding out-of-range sample: {:?}", sample),
        }

        if i + 1 < args.count {
            tokio::time::sleep(interval).await;
        }
    }

    Ok(())
}

/// JSON line for a valid sample, `None` for one that must not be printed.
fn sample_line(sample: &SensorSample) -> serde_json::Result<Option<String>> {
    if !sample.is_valid() {
        return Ok(None);
    }
    serde_json::to_string(sample).map(Some)
}

fn config_command(config: &AgentConfig) -> anyhow::Result<()> {
    if let Err(e) = config.validate() {
        warn!("{}", e);
    }
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}
