//! `pajakgate onboard` — First-time setup.

use pajakgate_config::AppConfig;

/// Starter `keywords.txt`. Terms here have no everyday one-edit neighbours.
const SAMPLE_KEYWORDS: &str = concat!(
    "# Extra scope keywords, one phrase per line.\n",
    "# Added on top of the built-in tax lexicon when scope.keywords_file\n",
    "# points here.\n",
    "ntpn\n",
    "nsfp\n",
    "e-bupot unifikasi\n",
);

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = AppConfig::config_dir();
    let config_path = config_dir.join("config.toml");
    let keywords_path = config_dir.join("keywords.txt");

    println!("🧾 PajakGate — First-Time Setup");
    println!("==============================\n");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
        println!("✅ Created config directory: {}", config_dir.display());
    } else {
        println!("  Config directory exists: {}", config_dir.display());
    }

    if !keywords_path.exists() {
        std::fs::write(&keywords_path, SAMPLE_KEYWORDS)?;
        println!("✅ Created keywords.txt");
    }

    if config_path.exists() {
        println!("\n⚠️  Config already exists at: {}", config_path.display());
        println!("   Edit it manually or delete and re-run onboard.\n");
    } else {
        let mut config = AppConfig::default();
        config.scope.keywords_file = Some(keywords_path.clone());
        let toml = toml::to_string_pretty(&config)?;
        std::fs::write(&config_path, toml)?;
        println!("✅ Created config.toml at: {}", config_path.display());
        println!("\n📝 Next steps:");
        println!("   1. Set GEMINI_API_KEY or add api_key to {}", config_path.display());
        println!("   2. Run: pajakgate check \"Berapa tarif PPN?\"");
        println!("   3. Run: pajakgate gateway\n");
    }

    println!("🎉 Setup complete!\n");

    Ok(())
}
