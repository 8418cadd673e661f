//! `pajakgate doctor` — Diagnose configuration.

use pajakgate_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("🩺 PajakGate Doctor — Configuration Diagnostics");
    println!("==============================================\n");

    let mut issues = 0;

    let config_path = AppConfig::config_dir().join("config.toml");
    if !config_path.exists() {
        println!("  ⚠️  No config file — defaults in use (run `pajakgate onboard`)");
        issues += 1;
    }

    match AppConfig::load() {
        Ok(config) => {
            println!("  ✅ Config valid");

            match pajakgate_providers::build_from_config(&config) {
                Ok(generator) => {
                    println!("  ✅ Answer generator: {} ({})", generator.name(), config.model);
                }
                Err(e) => {
                    println!("  ❌ {e} — set api_key in config.toml or GEMINI_API_KEY");
                    issues += 1;
                }
            }

            match config.scope.load_keywords() {
                Ok(lexicon) if lexicon.is_empty() => {
                    println!("  ❌ Keyword lexicon is empty — every question will be refused");
                    issues += 1;
                }
                Ok(lexicon) => {
                    println!(
                        "  ✅ Lexicon loaded: {} keyword(s), window {}",
                        lexicon.len(),
                        config.scope.window_size
                    );
                }
                Err(e) => {
                    println!("  ❌ Keywords failed to load: {e}");
                    issues += 1;
                }
            }
        }
        Err(e) => {
            println!("  ❌ Config file invalid: {e}");
            issues += 1;
        }
    }

    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
