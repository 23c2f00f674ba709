//! Editions subcommand - list what `publish` can handle

use comfy_table::{Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};

use geomirror_maxmind::Edition;

use crate::config::Config;

fn editions_table(config: &Config) -> Table {
    let package = config.package_settings();

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            Cell::new("Edition").fg(Color::Cyan),
            Cell::new("Name").fg(Color::Cyan),
            Cell::new("Package").fg(Color::Cyan),
        ]);

    for edition in Edition::ALL {
        table.add_row(vec![
            edition.id().to_string(),
            edition.display_name().to_string(),
            package.qualified_name(edition),
        ]);
    }
    table
}

pub fn run(config: &Config) {
    eprintln!("\n{}", editions_table(config));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_scoped_packages() {
        let rendered = editions_table(&Config::default()).to_string();
        assert!(rendered.contains("GeoLite2-City"));
        assert!(rendered.contains("@geo-mmd/geolite2-country"));
    }
}
