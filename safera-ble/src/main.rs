//! BLE client for Safera Sense cooker guards
//!
//! Scans for Safera devices, streams decoded sensor telemetry and
//! drives the connected hood's fan and light.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use btleplug::api::{Central, Manager as _, Peripheral as _, ScanFilter, WriteType};
use btleplug::platform::{Adapter, Manager, Peripheral};
use clap::{Parser, Subcommand};
use futures::StreamExt;
use safera_proto::command::{self, CommandSequence, FanSpeed, LightLevel};
use safera_proto::{uuids, EventBody, NotificationRouter, TypedEvent, Value};
use uuid::Uuid;

// Advertised name prefixes for this device family.
const NAME_PREFIXES: &[&str] = &["Safera", "Røroshetta"];

#[derive(Parser)]
#[command(name = "safera-ble")]
#[command(about = "BLE client for Safera Sense cooker guards")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan for Safera devices
    Scan {
        /// Scan duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
    },
    /// Read device identity strings
    Info {
        /// Device name or address to connect to
        #[arg(short, long)]
        device: Option<String>,
    },
    /// Stream decoded sensor reports
    Monitor {
        /// Device name or address to connect to
        #[arg(short, long)]
        device: Option<String>,
        /// Stop after this many seconds (default: run until interrupted)
        #[arg(short = 't', long)]
        duration: Option<u64>,
        /// Emit one JSON object per notification
        #[arg(long)]
        json: bool,
    },
    /// Set the hood fan: off, 1, 2, 3, boost or auto
    Fan {
        level: String,
        /// Device name or address to connect to
        #[arg(short, long)]
        device: Option<String>,
    },
    /// Set the hood light: off, 1, 2 or 3
    Light {
        level: String,
        /// Device name or address to connect to
        #[arg(short, long)]
        device: Option<String>,
    },
    /// Set the device clock from the system clock
    Clock {
        /// Device name or address to connect to
        #[arg(short, long)]
        device: Option<String>,
    },
    /// Read the network settings record
    Network {
        /// Device name or address to connect to
        #[arg(short, long)]
        device: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let cli = Cli::parse();

    let manager = Manager::new().await?;
    let adapters = manager.adapters().await?;
    let adapter = adapters.into_iter().next().ok_or("No Bluetooth adapter found")?;

    match cli.command {
        Commands::Scan { duration } => {
            scan_devices(&adapter, duration).await?;
        }
        Commands::Info { device } => {
            let device = connect(&adapter, device).await?;
            print_device_info(&device).await?;
            device.disconnect().await?;
        }
        Commands::Monitor { device, duration, json } => {
            let device = connect(&adapter, device).await?;
            monitor(&device, duration, json).await?;
            let _ = device.disconnect().await;
        }
        Commands::Fan { level, device } => {
            let speed = parse_fan_level(&level)?;
            let device = connect(&adapter, device).await?;
            write_command_sequence(&device, command::set_fan_speed(speed)).await?;
            println!("Fan set to {}", level.to_lowercase());
            device.disconnect().await?;
        }
        Commands::Light { level, device } => {
            let light = parse_light_level(&level)?;
            let device = connect(&adapter, device).await?;
            write_command_sequence(&device, command::set_light_level(light)).await?;
            println!("Light set to {}", level.to_lowercase());
            device.disconnect().await?;
        }
        Commands::Clock { device } => {
            let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs();
            let now = u32::try_from(now).map_err(|_| "system clock out of range")?;
            let device = connect(&adapter, device).await?;
            write_command_sequence(&device, command::set_clock(now)).await?;
            println!("Device clock set to {}", now);
            device.disconnect().await?;
        }
        Commands::Network { device } => {
            let device = connect(&adapter, device).await?;
            print_network_settings(&device).await?;
            device.disconnect().await?;
        }
    }

    Ok(())
}

fn parse_fan_level(level: &str) -> Result<FanSpeed, String> {
    match level.to_ascii_lowercase().as_str() {
        "off" | "0" => Ok(FanSpeed::Off),
        "1" => Ok(FanSpeed::Level1),
        "2" => Ok(FanSpeed::Level2),
        "3" => Ok(FanSpeed::Level3),
        "boost" | "4" => Ok(FanSpeed::Boost),
        "auto" => Ok(FanSpeed::Auto),
        other => Err(format!("unknown fan level '{other}' (off, 1, 2, 3, boost, auto)")),
    }
}

fn parse_light_level(level: &str) -> Result<LightLevel, String> {
    match level.to_ascii_lowercase().as_str() {
        "off" | "0" => Ok(LightLevel::Off),
        "1" => Ok(LightLevel::Level1),
        "2" => Ok(LightLevel::Level2),
        "3" => Ok(LightLevel::Level3),
        other => Err(format!("unknown light level '{other}' (off, 1, 2, 3)")),
    }
}

fn is_safera_name(name: &str) -> bool {
    NAME_PREFIXES.iter().any(|p| name.starts_with(p))
}

async fn scan_devices(adapter: &Adapter, duration: u64) -> Result<(), Box<dyn std::error::Error>> {
    println!("Scanning for Safera devices ({} seconds)...", duration);

    adapter.start_scan(ScanFilter::default()).await?;
    tokio::time::sleep(Duration::from_secs(duration)).await;

    let peripherals = adapter.peripherals().await?;

    println!("\nFound {} devices:", peripherals.len());
    for peripheral in peripherals {
        let props = peripheral.properties().await?;
        if let Some(props) = props {
            let name = props.local_name.unwrap_or_else(|| "Unknown".to_string());
            let addr = peripheral.address();
            let rssi = props.rssi.map(|r| format!("{} dBm", r)).unwrap_or_else(|| "N/A".to_string());

            let marker = if is_safera_name(&name) { " [SAFERA]" } else { "" };
            println!("  {} ({}) RSSI: {}{}", name, addr, rssi, marker);
        }
    }

    adapter.stop_scan().await?;
    Ok(())
}

async fn find_device(
    adapter: &Adapter,
    target: Option<String>,
) -> Result<Peripheral, Box<dyn std::error::Error>> {
    println!("Scanning for Safera devices...");

    adapter.start_scan(ScanFilter::default()).await?;
    tokio::time::sleep(Duration::from_secs(5)).await;

    let peripherals = adapter.peripherals().await?;

    for peripheral in peripherals {
        let props = peripheral.properties().await?;
        if let Some(props) = props {
            let name = props.local_name.unwrap_or_default();
            let addr = peripheral.address().to_string();

            let matches = match &target {
                Some(t) => name.contains(t) || addr.contains(t),
                None => is_safera_name(&name),
            };

            if matches {
                adapter.stop_scan().await?;
                println!("Found device: {} ({})", name, addr);
                return Ok(peripheral);
            }
        }
    }

    adapter.stop_scan().await?;
    Err("No Safera device found".into())
}

async fn connect(
    adapter: &Adapter,
    target: Option<String>,
) -> Result<Peripheral, Box<dyn std::error::Error>> {
    let device = find_device(adapter, target).await?;

    println!("Connecting...");
    device.connect().await?;
    println!("Connected!");

    device.discover_services().await?;
    Ok(device)
}

async fn print_device_info(device: &Peripheral) -> Result<(), Box<dyn std::error::Error>> {
    let router = NotificationRouter::new();
    let characteristics = device.characteristics();

    let identity = [
        ("Manufacturer", uuids::MANUFACTURER),
        ("Model", uuids::MODEL_NUMBER),
        ("Serial", uuids::SERIAL_NUMBER),
        ("Hardware", uuids::HARDWARE_REV),
        ("Firmware", uuids::FIRMWARE_REV),
        ("Software", uuids::SOFTWARE_REV),
    ];

    for (label, uuid) in identity {
        let Some(ch) = characteristics.iter().find(|c| c.uuid == uuid) else {
            log::debug!("characteristic {uuid} not exposed by this firmware");
            continue;
        };
        let bytes = device.read(ch).await?;
        match router.route(uuid, &bytes)?.body {
            Ok(EventBody::Text(text)) => println!("  {:<14} {}", label, text),
            Ok(other) => log::warn!("{label} decoded unexpectedly: {other:?}"),
            Err(e) => log::warn!("{label} failed to decode: {e}"),
        }
    }
    Ok(())
}

async fn print_network_settings(device: &Peripheral) -> Result<(), Box<dyn std::error::Error>> {
    let router = NotificationRouter::new();
    let characteristics = device.characteristics();
    let ch = characteristics
        .iter()
        .find(|c| c.uuid == uuids::NETWORK_SETTINGS)
        .ok_or("network settings characteristic not found")?;

    let bytes = device.read(ch).await?;
    let event = router.route(uuids::NETWORK_SETTINGS, &bytes)?;
    match event.body {
        Ok(EventBody::Record(record)) => {
            for (name, value) in record.fields() {
                println!("  {:<14} {}", name, display_value(value));
            }
        }
        Ok(other) => log::warn!("network settings decoded unexpectedly: {other:?}"),
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

async fn monitor(
    device: &Peripheral,
    duration: Option<u64>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let router = NotificationRouter::new();
    let characteristics = device.characteristics();

    // Subscribe to everything the device notifies on that we can decode.
    for uuid in [uuids::SENSOR_REPORT, uuids::EVENT_LOG, uuids::DCV_REPORT] {
        if let Some(ch) = characteristics.iter().find(|c| c.uuid == uuid) {
            device.subscribe(ch).await?;
            router.confirm_subscribed(uuid)?;
            log::info!("subscribed to {uuid}");
        }
    }
    if !router.is_subscribed(uuids::SENSOR_REPORT) {
        return Err("sensor characteristic not found".into());
    }

    let mut stream = device.notifications().await?;
    let consume = async {
        while let Some(notification) = stream.next().await {
            match router.route(notification.uuid, &notification.value) {
                Ok(event) => print_event(&event, json),
                // Unknown characteristics are expected across firmware
                // revisions; log and keep streaming.
                Err(e) => log::debug!("{e}"),
            }
        }
    };

    match duration {
        Some(secs) => {
            let _ = tokio::time::timeout(Duration::from_secs(secs), consume).await;
        }
        None => consume.await,
    }

    router.connection_lost();
    Ok(())
}

fn print_event(event: &TypedEvent, json: bool) {
    if json {
        match serde_json::to_string(event) {
            Ok(line) => println!("{line}"),
            Err(e) => log::error!("serialization failed: {e}"),
        }
        return;
    }
    match &event.body {
        Ok(EventBody::Record(record)) => {
            println!("[{}]", event.characteristic);
            for (name, value) in record.fields() {
                println!("  {:<22} {}", name, display_value(value));
            }
        }
        Ok(EventBody::Entries(entries)) => {
            println!("[{}] {} entries", event.characteristic, entries.len());
            for entry in entries {
                let line: Vec<String> = entry
                    .fields()
                    .map(|(name, value)| format!("{}={}", name, display_value(value)))
                    .collect();
                println!("  {}", line.join(" "));
            }
        }
        Ok(EventBody::Text(text)) => println!("[{}] {}", event.characteristic, text),
        Err(e) => log::warn!("{}: {e}", event.characteristic),
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::UInt(v) => v.to_string(),
        Value::Int(v) => v.to_string(),
        Value::Float(v) => format!("{v:.2}"),
        Value::Bool(v) => v.to_string(),
        Value::Text(s) => s.clone(),
        Value::Enum { raw, tag: Some(tag) } => format!("{tag} ({raw})"),
        Value::Enum { raw, tag: None } => format!("unknown ({raw})"),
        Value::Bits { raw, tags, residual } => {
            if *raw == 0 {
                "none".to_string()
            } else if *residual == 0 {
                tags.join("|")
            } else {
                format!("{}|residual 0x{residual:x}", tags.join("|"))
            }
        }
        Value::Bytes(b) => b.iter().map(|x| format!("{x:02x}")).collect::<String>(),
        Value::Ipv4(addr) => addr.to_string(),
    }
}

/// Writes a command sequence in order, stopping at the first failure.
/// A partially applied sequence is left as-is; the device state should
/// be read back before retrying.
async fn write_command_sequence(
    device: &Peripheral,
    sequence: CommandSequence,
) -> Result<(), Box<dyn std::error::Error>> {
    let ch = find_characteristic(device, uuids::DEVICE_COMMAND)?;
    for payload in sequence {
        log::debug!("writing {:02x?}", payload.as_bytes());
        device.write(&ch, payload.as_bytes(), WriteType::WithoutResponse).await?;
    }
    Ok(())
}

fn find_characteristic(
    device: &Peripheral,
    uuid: Uuid,
) -> Result<btleplug::api::Characteristic, Box<dyn std::error::Error>> {
    device
        .characteristics()
        .into_iter()
        .find(|c| c.uuid == uuid)
        .ok_or_else(|| format!("characteristic {uuid} not found").into())
}
