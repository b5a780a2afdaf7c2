use anyhow::Result;

#[derive(Clone, Debug, Default)]
pub struct AppConfig {
    /// Empty means any origin is accepted.
    pub cors_allowed_origins: Vec<String>,
    pub seed_on_start: bool,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        Ok(Self::from_lookup(|key| std::env::var(key).ok()))
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let cors_allowed_origins = lookup("CORS_ALLOWED_ORIGINS")
            .unwrap_or_default()
            .split(',')
            .filter_map(|s| {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_string())
                }
            })
            .collect::<Vec<_>>();

        let seed_on_start = lookup("SEED_ON_START")
            .map(|val| env_flag(&val))
            .unwrap_or(false);

        Self {
            cors_allowed_origins,
            seed_on_start,
        }
    }
}

fn env_flag(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "1" | "true" | "yes")
}
