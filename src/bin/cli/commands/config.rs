use anyhow::Result;

use crate::app::App;
use crate::OutputFormat;

pub fn run(app: &App, format: &OutputFormat) -> Result<()> {
    let config = app.service.config();

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(config)?);
        }
        OutputFormat::Plain => {
            println!("# data dir: {}", app.data_dir.display());
            print!("{}", config.to_toml_string()?);
        }
    }

    Ok(())
}
