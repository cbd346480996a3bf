//! Check encoder and storage setup.

use promoreel_common::config::AppConfig;
use promoreel_render_engine::{EncoderBackend, FfmpegBackend};

pub fn run(config: AppConfig) -> anyhow::Result<()> {
    println!("Promoreel System Check");
    println!("{}", "=".repeat(50));

    let backend = FfmpegBackend::new(&config.encoder);
    let encoder_ok = backend.is_available();
    if encoder_ok {
        println!("[OK] Encoder: {}", config.encoder.ffmpeg_binary);
    } else {
        println!(
            "[WARN] Encoder: {} not found (renders will be simulated)",
            config.encoder.ffmpeg_binary
        );
    }
    if backend.probe_available() {
        println!("[OK] Prober: {}", config.encoder.ffprobe_binary);
    } else {
        println!(
            "[WARN] Prober: {} not found (voiceover timing unavailable)",
            config.encoder.ffprobe_binary
        );
    }

    println!();
    let dirs = [
        ("Storage root", &config.storage_root),
        ("Output dir", &config.output_dir),
        ("Generated dir", &config.generated_dir),
        ("Music dir", &config.music_dir),
        ("Jobs dir", &config.jobs_dir),
    ];
    for (name, dir) in dirs {
        let tag = if dir.is_dir() { "[OK]  " } else { "[MISS]" };
        println!("{tag} {name}: {}", dir.display());
    }

    let branding = if config.branding_image.is_file() { "[OK]  " } else { "[MISS]" };
    println!("{branding} Branding image: {}", config.branding_image.display());
    match &config.logo_path {
        Some(logo) if logo.is_file() => println!("[OK]   Logo: {}", logo.display()),
        Some(logo) => println!("[MISS] Logo: {}", logo.display()),
        None => println!("[--]   Logo: not configured"),
    }
    match &config.media_manifest {
        Some(path) if path.is_file() => println!("[OK]   Media manifest: {}", path.display()),
        Some(path) => println!("[MISS] Media manifest: {}", path.display()),
        None => println!("[--]   Media manifest: not configured"),
    }

    println!();
    if encoder_ok {
        println!("Encoder found. Promoreel is ready to render.");
    } else {
        println!(
            "Install ffmpeg or set encoder.ffmpeg_binary in the config to render real videos."
        );
    }
    Ok(())
}
