//! Output device listing.

use remaster_io::list_devices;

pub fn run() -> anyhow::Result<()> {
    let devices = list_devices()?;
    if devices.is_empty() {
        println!("No output devices found.");
        return Ok(());
    }
    println!("Output devices:");
    for (i, device) in devices.iter().enumerate() {
        println!(
            "  [{i}] {} ({} Hz, {} ch)",
            device.name, device.default_sample_rate, device.default_channels
        );
    }
    Ok(())
}
