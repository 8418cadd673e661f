//! `pajakgate check` — Evaluate messages against the scope gate.

use pajakgate_config::{AppConfig, parse_keyword_lines};
use pajakgate_core::message::Message;
use pajakgate_core::scope::{ScopeMatcher, ScopeVerdict};
use std::path::PathBuf;

pub async fn run(
    messages: Vec<String>,
    window: Option<usize>,
    keywords_file: Option<PathBuf>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    let mut lexicon = config.scope.load_keywords()?;
    if let Some(path) = keywords_file {
        let content = std::fs::read_to_string(&path)
            .map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
        lexicon = lexicon.merged(parse_keyword_lines(&content));
    }

    let matcher = ScopeMatcher::new(window.unwrap_or(config.scope.window_size));
    let history: Vec<Message> = messages.into_iter().map(Message::user).collect();
    let verdict = matcher.evaluate(&history, &lexicon);

    tracing::debug!(
        keywords = lexicon.len(),
        window_size = matcher.window_size(),
        in_scope = verdict.is_in_scope(),
        "Scope check finished"
    );

    if json {
        let out = serde_json::json!({
            "in_scope": verdict.is_in_scope(),
            "match": verdict.matched(),
            "window_size": matcher.window_size(),
            "keywords": lexicon.len(),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    match verdict {
        ScopeVerdict::InScope(m) => {
            println!("✅ In scope — {m}");
        }
        ScopeVerdict::OutOfScope => {
            println!("🚫 Out of scope");
            println!("   Reply: {}", config.scope.refusal_message);
        }
    }
    println!(
        "   Window: {} message(s), lexicon: {} keyword(s)",
        matcher.window_size(),
        lexicon.len()
    );

    Ok(())
}
