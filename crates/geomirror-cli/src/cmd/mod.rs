pub mod editions;
pub mod publish;

use comfy_table::{Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};

use crate::config::Config;

fn secret_state(value: &Option<String>) -> &'static str {
    match value.as_deref() {
        Some(v) if !v.trim().is_empty() => "configured",
        _ => "not set",
    }
}

/// Effective configuration; secrets are never shown.
pub fn config_table(config: &Config) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            Cell::new("Setting").fg(Color::Cyan),
            Cell::new("Value").fg(Color::Cyan),
        ]);

    table.add_row(vec!["MaxMind base URL", config.maxmind.base_url.as_str()]);
    table.add_row(vec!["MaxMind auth", &config.maxmind.auth.to_string()]);
    table.add_row(vec![
        "MaxMind account ID",
        secret_state(&config.maxmind.account_id),
    ]);
    table.add_row(vec![
        "MaxMind license key",
        secret_state(&config.maxmind.license_key),
    ]);
    table.add_row(vec!["Registry URL", config.registry.url.as_str()]);
    table.add_row(vec!["Registry scope", config.registry.scope.as_str()]);
    table.add_row(vec!["Registry token", secret_state(&config.registry.token)]);
    table.add_row(vec!["npm program", config.registry.npm.as_str()]);
    table.add_row(vec!["Object store API", config.object_store.api_base.as_str()]);
    table.add_row(vec!["Object store bucket", config.object_store.bucket.as_str()]);
    table.add_row(vec![
        "Object store account",
        secret_state(&config.object_store.account_id),
    ]);
    table.add_row(vec![
        "Object store token",
        secret_state(&config.object_store.api_token),
    ]);
    table.add_row(vec![
        "Timeouts",
        &format!(
            "response {}s, stall {}s, upload {}s",
            config.http.response_timeout, config.http.stall_timeout, config.http.upload_timeout
        ),
    ]);
    table.add_row(vec![
        "Scratch directory",
        &config.scratch.dir.display().to_string(),
    ]);
    table
}

pub fn print_config(config: &Config) {
    eprintln!("\n{}", config_table(config));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secrets_are_masked() {
        let mut config = Config::default();
        config.maxmind.license_key = Some("super-secret-key".to_string());
        config.registry.token = Some("  ".to_string());
        let rendered = config_table(&config).to_string();
        assert!(!rendered.contains("super-secret-key"));
        assert!(rendered.contains("configured"));
        assert!(rendered.contains("not set"));
    }
}
