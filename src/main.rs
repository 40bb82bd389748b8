use log::{error, info, warn};
use time::OffsetDateTime;
use tokio::time::{interval, Duration, MissedTickBehavior};

use envprobe::config::MonitorConfig;
use envprobe::hal::rpi::Board;
use envprobe::monitor::Readings;
use envprobe::utils::format_value;
use envprobe::{Quantity, SensorMonitor};

fn load_sensors(config: &MonitorConfig) -> Result<SensorMonitor, Box<dyn std::error::Error>> {
    let board = Board::open(config.bus_delay_us)?;
    let mut monitor = SensorMonitor::new();

    for entry in &config.sensors {
        match board.build(entry) {
            Ok(sensors) => {
                for sensor in sensors {
                    monitor.add_sensor(sensor);
                }
            }
            Err(e) => error!("Failed to open {}: {}", entry.kind, e),
        }
    }

    if monitor.is_empty() {
        return Err("No sensors could be opened".into());
    }
    info!(
        "Loaded sensors: {}",
        monitor.sensor_names().collect::<Vec<_>>().join(" ")
    );
    Ok(monitor)
}

fn log_summary(readings: &Readings) {
    for (name, fields) in readings {
        let Some(fields) = fields else {
            warn!("No valid reading from {}", name);
            continue;
        };
        info!("Summary for {}:", name);
        let value = |q| format_value(fields.get(&q).copied());
        if fields.contains_key(&Quantity::Temperature) {
            info!("  Temperature: {}°C", value(Quantity::Temperature));
        }
        if fields.contains_key(&Quantity::Humidity) {
            info!("  Humidity: {}%", value(Quantity::Humidity));
        }
        if fields.contains_key(&Quantity::Pressure) {
            info!("  Pressure: {} hPa", value(Quantity::Pressure));
        }
    }
}

async fn main_loop(
    mut monitor: SensorMonitor,
    config: MonitorConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    info!("Starting sensor polling every {} s", config.poll_interval_secs);
    info!("{}", monitor.header());

    let mut ticker = interval(Duration::from_secs(config.poll_interval_secs));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        // reads busy-wait on the line, keep them off the async workers
        let readings = tokio::task::block_in_place(|| monitor.get_readings());
        info!(
            "{}",
            monitor.readings_line(&OffsetDateTime::now_utc(), &readings)
        );
        log_summary(&readings);

        if readings.values().all(Option::is_none) {
            warn!("No valid readings during this poll!");
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .format_timestamp_secs()
        .init();

    // Load configuration
    let config = match MonitorConfig::new() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    let monitor = match tokio::task::block_in_place(|| load_sensors(&config)) {
        Ok(monitor) => monitor,
        Err(e) => {
            error!("Failed to set up sensors: {}", e);
            return Err(e);
        }
    };

    // Run main loop or wait for shutdown signal
    tokio::select! {
        result = main_loop(monitor, config) => {
            if let Err(e) = result {
                error!("Fatal error: {}", e);
            }
        }
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                error!("Failed to listen for Ctrl+C: {}", e);
            }
            info!("Program terminated by user. Exiting gracefully.");
        }
    }

    Ok(())
}
