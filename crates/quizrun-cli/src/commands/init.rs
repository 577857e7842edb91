//! The `quizrun init` command.

use std::path::Path;

use anyhow::{Context, Result};

pub fn execute() -> Result<()> {
    let path = Path::new("quizrun.toml");
    if path.exists() {
        println!("quizrun.toml already exists, skipping.");
    } else {
        std::fs::write(path, SAMPLE_CONFIG).context("failed to write quizrun.toml")?;
        println!("Created quizrun.toml");
    }

    println!("\nNext steps:");
    println!("  1. Edit quizrun.toml with your service URL and token");
    println!("  2. Run: quizrun take <quiz-id>");
    println!("  3. Or try it offline: quizrun take --demo");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# quizrun configuration

base_url = "http://localhost:8000/api"
api_token = "${QUIZRUN_TOKEN}"
timeout_secs = 30

# Quiz taken when `quizrun take` is run without an id.
# default_quiz = "rust-basics"
"#;
