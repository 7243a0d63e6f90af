//! `kb config`: the enabled options of the current `.config`.

use anyhow::Result;

use crate::config::Project;
use crate::pipeline;
use crate::ui::{self, Table};

pub fn show_config(project: &Project) -> Result<()> {
    ui::header("Current configuration");

    let Some(options) = pipeline::enabled_options(project)? else {
        ui::warn(&format!("{} does not exist", project.config_path().display()));
        return Ok(());
    };

    let mut table = Table::new(&["Option", "Value"]);
    for (name, value) in options {
        table.add_row(vec![name, value]);
    }

    if table.is_empty() {
        ui::info("No enabled options found");
    } else {
        table.print();
    }
    Ok(())
}
