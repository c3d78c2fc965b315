use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use findit_types::Challenge;

/// One entry of the challenge seed file
#[derive(Debug, Deserialize)]
struct SeedEntry {
    word: String,
    variants: Vec<String>,
    #[serde(default = "default_active")]
    active: bool,
}

fn default_active() -> bool {
    true
}

pub fn parse_challenges(json: &str) -> Result<Vec<Challenge>> {
    let entries: Vec<SeedEntry> =
        serde_json::from_str(json).context("Challenge seed is not a valid JSON list")?;

    Ok(entries
        .into_iter()
        .map(|entry| Challenge {
            active: entry.active,
            ..Challenge::new(entry.word, entry.variants)
        })
        .collect())
}

pub async fn load_challenges(path: &Path) -> Result<Vec<Challenge>> {
    let json = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    parse_challenges(&json)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_defaults_to_active() {
        let challenges = parse_challenges(
            r#"[
                { "word": "Cuchara", "variants": ["spoon", "tablespoon"] },
                { "word": "Paraguas", "variants": ["umbrella"], "active": false }
            ]"#,
        )
        .unwrap();

        assert_eq!(challenges.len(), 2);
        assert!(challenges[0].active);
        assert_eq!(challenges[0].variants, vec!["spoon", "tablespoon"]);
        assert!(!challenges[1].active);
        assert_ne!(challenges[0].id, challenges[1].id);
    }

    #[test]
    fn test_parse_rejects_malformed_seed() {
        assert!(parse_challenges(r#"{ "word": "Taza" }"#).is_err());
    }

    #[tokio::test]
    async fn test_bundled_seed_file_parses() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../data/challenges.json");
        let challenges = load_challenges(&path).await.unwrap();
        assert!(challenges.iter().filter(|challenge| challenge.active).count() >= 10);
    }
}
