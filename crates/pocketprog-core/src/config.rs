//! Process-wide settings read from the environment

/// Environment variable enabling dry-run mode
pub const DRY_RUN_ENV: &str = "POCKET_DRY_RUN";

/// Whether a dry-run toggle value means "on" (`1`, `true`, `yes`)
pub fn parse_toggle(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes"
    )
}

/// Read the dry-run toggle from `POCKET_DRY_RUN`
pub fn dry_run_from_env() -> bool {
    std::env::var(DRY_RUN_ENV)
        .map(|v| parse_toggle(&v))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_toggle() {
        for on in ["1", "true", "TRUE", "Yes", " yes "] {
            assert!(parse_toggle(on), "{:?}", on);
        }
        for off in ["", "0", "false", "no", "on", "2"] {
            assert!(!parse_toggle(off), "{:?}", off);
        }
    }
}
