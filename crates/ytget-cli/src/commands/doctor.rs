use anyhow::Result;
use std::path::Path;
use std::process::Command;
use ytget_core::config::Config;

pub async fn run(config_path: Option<&Path>) -> Result<()> {
    println!("ytget dependency check\n");

    let config = Config::load(config_path)?;
    let mut all_ok = true;

    // FFmpeg is only needed for --combine
    print!("ffmpeg:        ");
    match config.ffmpeg_path() {
        Ok(path) => match Command::new(&path).args(["-version"]).output() {
            Ok(out) => {
                let first_line = String::from_utf8_lossy(&out.stdout)
                    .lines()
                    .next()
                    .unwrap_or("")
                    .to_string();
                // Extract just version number
                let version_part = first_line.split_whitespace().nth(2).unwrap_or("unknown");
                println!("OK ({}, {})", version_part, path.display());
            }
            Err(_) => {
                println!("FOUND but failed to run: {}", path.display());
                all_ok = false;
            }
        },
        Err(_) => {
            println!("NOT FOUND");
            println!("           Install ffmpeg to use --combine");
            all_ok = false;
        }
    }

    print!("temp dir:      ");
    let temp_dir = config.temp_dir();
    if temp_dir.is_dir() {
        println!("OK ({})", temp_dir.display());
    } else {
        println!("MISSING ({})", temp_dir.display());
        all_ok = false;
    }

    println!();
    if all_ok {
        println!("All dependencies OK!");
    } else {
        println!("Some dependencies are missing. See above for details.");
    }

    Ok(())
}
