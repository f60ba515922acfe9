use chrono::Duration;

use iam_models::TenantSettings;

#[derive(Debug, Clone, Copy)]
pub struct GlobalDefaults {
    pub access_token_minutes: i64,
    pub refresh_token_days: i64,
    pub id_token_minutes: i64,
    pub max_token_ttl_minutes: i64,
}

impl Default for GlobalDefaults {
    fn default() -> Self {
        Self {
            access_token_minutes: 15,
            refresh_token_days: 30,
            id_token_minutes: 15,
            max_token_ttl_minutes: 24 * 60,
        }
    }
}

impl GlobalDefaults {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            access_token_minutes: env_i64("IAM_ACCESS_TOKEN_MINUTES", default.access_token_minutes),
            refresh_token_days: env_i64("IAM_REFRESH_TOKEN_DAYS", default.refresh_token_days),
            id_token_minutes: env_i64("IAM_ID_TOKEN_MINUTES", default.id_token_minutes),
            max_token_ttl_minutes: env_i64("IAM_MAX_TOKEN_TTL_MINUTES", default.max_token_ttl_minutes),
        }
    }
}

fn env_i64(key: &str, default: i64) -> i64 {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

pub struct ResolvedLifetimes {
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
    pub id_ttl: Duration,
}

/// Derives effective token TTLs from global defaults, tenant policy
/// overrides, and the remember-me flag, clamped so no issued access token
/// ever exceeds the system's `max_token_ttl` bound.
pub struct LifetimeResolver {
    defaults: GlobalDefaults,
}

impl LifetimeResolver {
    pub fn new(defaults: GlobalDefaults) -> Self {
        Self { defaults }
    }

    pub fn resolve(&self, settings: &TenantSettings, remember_me: bool) -> ResolvedLifetimes {
        let access_minutes = settings.access_token_minutes.min(self.defaults.max_token_ttl_minutes);
        let mut refresh_days = settings.refresh_token_days;

        if remember_me && settings.remember_me_enabled {
            refresh_days = settings.remember_me_refresh_days;
        }

        ResolvedLifetimes {
            access_ttl: Duration::minutes(access_minutes),
            refresh_ttl: Duration::days(refresh_days),
            id_ttl: Duration::minutes(settings.id_token_minutes),
        }
    }
}
