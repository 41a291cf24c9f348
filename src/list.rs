//! Table rendering of the installed-tool inventory.

use std::io::Write;

use ansi_term::Color;
use is_terminal::IsTerminal;
use tabled::settings::{object::Rows, style::Style, Alignment, Height};
use tabled::{Table, Tabled};

use crate::config::Config;
use crate::core::GenericResult;
use crate::inventory::Inventory;

#[derive(Tabled)]
struct Row {
    #[tabled(rename = "Tool")]
    key: String,

    #[tabled(rename = "Version")]
    version: String,

    #[tabled(rename = "Latest")]
    latest: String,
}

/// Print every installed bin, one row per version (`full`) or just the latest version per bin.
pub fn list(config: &Config, full: bool) -> GenericResult<()> {
    let inventory = Inventory::build(&config.get_bin_path(), &config.get_opt_path())?;
    if inventory.count() == 0 {
        println!("No tools installed.");
        return Ok(());
    }

    let colored = std::io::stdout().is_terminal();
    let mut rows = Vec::new();

    for key in inventory.bins_sorted_keys() {
        let Some(versions) = inventory.get_bin_versions(key) else { continue };
        for version in versions {
            if !full && !version.latest {
                continue;
            }

            let latest = if version.latest { "yes" } else { "" };
            rows.push(Row {
                key: key.to_owned(),
                version: version.version.clone(),
                latest: if colored && version.latest {
                    Color::Green.paint(latest).to_string()
                } else {
                    latest.to_owned()
                },
            });
        }
    }

    let mut table = Table::new(&rows);
    table.with(Style::blank());
    table.modify(Rows::first(), Height::increase(2));
    if colored {
        table.modify(Rows::first(), tabled::settings::Color::BOLD);
    }
    table.modify(Rows::new(1..), Alignment::left());

    let _ = writeln!(std::io::stdout(), "{table}");
    Ok(())
}
