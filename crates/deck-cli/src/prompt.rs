//! Interactive confirmation on the terminal.

use async_trait::async_trait;
use deck_core::{AssetRecord, RemovalPolicy};
use std::io::{self, BufRead, Write};
use tracing::warn;

/// Asks on stdin before removing a remote asset. Anything but yes keeps it.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdinPrompt;

/// Interpret a typed answer. Only an explicit yes counts.
pub fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

fn ask(question: &str) -> io::Result<String> {
    let mut stdout = io::stdout().lock();
    write!(stdout, "{} [y/N] ", question)?;
    stdout.flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(answer)
}

#[async_trait]
impl RemovalPolicy for StdinPrompt {
    async fn confirm_removal(&self, asset: &AssetRecord) -> bool {
        let question = format!(
            "{} is on the remote deck but not in this directory. Remove it from the deck?",
            asset.filename
        );

        match tokio::task::spawn_blocking(move || ask(&question)).await {
            Ok(Ok(answer)) => is_yes(&answer),
            Ok(Err(e)) => {
                warn!("Could not read answer, keeping {}: {}", asset.filename, e);
                false
            }
            Err(e) => {
                warn!("Prompt failed, keeping {}: {}", asset.filename, e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_yes_confirms() {
        assert!(is_yes("y\n"));
        assert!(is_yes(" YES "));
        assert!(!is_yes("\n"));
        assert!(!is_yes("n"));
        assert!(!is_yes("yep"));
    }
}
