// =============================================================================
// VULKAN SCAFFOLD - window, device and swapchain bootstrap
// =============================================================================
//
// Opens a window and negotiates everything needed to present to it:
//
// ┌─────────────────────────────────────────────────────────────────┐
// │  Engine (window + event loop)                                   │
// │    └── VulkanContext (instance, debug messenger)                │
// │          └── Surface                                            │
// │                └── Device (GPU pick, queue families)            │
// │                      └── Swapchain (format, mode, extent)       │
// └─────────────────────────────────────────────────────────────────┘
//
// No rendering happens yet: the window stays open until closed.
//
// =============================================================================

mod backend;
mod config;
mod engine;

use anyhow::{Context, Result};
use config::Config;
use engine::Engine;
use std::fs::OpenOptions;
use std::io::Write;

// =============================================================================
// ENTRY POINT
// =============================================================================

fn main() -> Result<()> {
    // Load configuration from config.toml
    let (config, load_error) = Config::load();

    // Initialize logging
    init_logging(&config)?;
    if let Some(e) = load_error {
        log::warn!("Failed to load config.toml: {:#}. Using defaults.", e);
    }
    log::info!("Starting Vulkan scaffold");
    log::info!(
        "Window: {}x{} ({})",
        config.window.width,
        config.window.height,
        if config.window.resizable { "resizable" } else { "fixed size" }
    );
    log::info!(
        "Validation layers: {}",
        if config.validation_enabled() { "enabled" } else { "disabled" }
    );

    let mut engine = Engine::from_config(&config);
    engine.run()
}

/// Initialize logging, optionally into a file instead of stderr.
/// `RUST_LOG` overrides the configured level.
fn init_logging(config: &Config) -> Result<()> {
    use env_logger::{Builder, Env, Target};

    let mut builder = Builder::new();
    builder.filter_level(config.log_level());
    builder.parse_env(Env::default());

    if config.debug.log_to_file {
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&config.debug.log_file)
            .with_context(|| format!("Failed to open log file: {}", config.debug.log_file))?;

        writeln!(file, "=== Vulkan Scaffold Log ===")?;
        writeln!(file, "Started: {:?}", std::time::SystemTime::now())?;
        writeln!(file)?;

        builder.target(Target::Pipe(Box::new(file)));
    }

    builder.init();
    Ok(())
}
