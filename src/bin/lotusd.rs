use lotus_lamp_controller::*;
use std::{env, io};

#[tokio::main]
async fn main() -> Result<()> {
    // Optional device name from command line arguments; the default
    // configured device is used when omitted.
    let usage = "Usage: lotusd [device name]";
    let args: Vec<_> = env::args().collect();
    if args.len() > 1 && (args[1] == "-h" || args[1] == "--help") {
        eprintln!("{usage}");
        std::process::exit(0);
    }

    // Resolve the device from the standard config locations and connect
    let manager = ConfigManager::discover()?;
    let config = manager.resolve(args.get(1).map(String::as_str))?;
    let mut lamp = LotusLamp::connect(config).await?;

    // Inform about successful initialization
    println!("OK");

    // Mainloop: wait for user input, line by line
    loop {
        // Read a command from stdin
        let mut input: String = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            // stdin closed
            break;
        }

        // Read command and execute it
        let mut cmd = input.trim().split(':');
        match cmd.next() {
            Some("power_on") => {
                lamp.power_on().await?;
                println!("OK");
            }
            Some("power_off") => {
                lamp.power_off().await?;
                println!("OK");
            }
            Some("set_color") => {
                let rgb: Vec<u8> = match cmd
                    .next()
                    .unwrap_or_default()
                    .split(',')
                    .map(|s| s.trim().parse())
                    .collect()
                {
                    Ok(rgb) => rgb,
                    Err(_) => {
                        eprintln!("ERR Invalid color format. Use R,G,B (e.g., 255,0,0 for red)");
                        continue;
                    }
                };
                if rgb.len() != 3 {
                    eprintln!("ERR Invalid color format. Use R,G,B (e.g., 255,0,0 for red)");
                    continue;
                }
                lamp.set_color(rgb[0], rgb[1], rgb[2]).await?;
                println!("OK");
            }
            Some("set_brightness") => {
                match cmd.next().unwrap_or_default().trim().parse::<u8>() {
                    Ok(level) if level <= 100 => {
                        lamp.set_brightness(level).await?;
                        println!("OK");
                    }
                    _ => eprintln!("ERR Brightness must be between 0 and 100"),
                }
            }
            Some("set_speed") => {
                match cmd.next().unwrap_or_default().trim().parse::<u8>() {
                    Ok(level) if level <= 100 => {
                        lamp.set_speed(level).await?;
                        println!("OK");
                    }
                    _ => eprintln!("ERR Speed must be between 0 and 100"),
                }
            }
            Some("set_animation") => {
                match cmd.next().unwrap_or_default().trim().parse::<u8>() {
                    Ok(mode) if mode <= protocol::MAX_ANIMATION_MODE => {
                        lamp.set_animation(mode).await?;
                        println!("OK");
                    }
                    _ => eprintln!("ERR Animation mode must be between 0 and 212"),
                }
            }
            Some("sync_time") => {
                lamp.sync_time().await?;
                println!("OK");
            }
            Some("quit") | Some("exit") => break,
            Some("") => {}
            Some(other) => {
                eprintln!("ERR Unknown command: {other}");
            }
            None => {
                eprintln!("ERR No command given");
            }
        }
    }

    lamp.disconnect().await?;
    Ok(())
}
