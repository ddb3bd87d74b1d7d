use std::{
    error::Error,
    fs,
    io::{self, Read},
    path::{Path, PathBuf},
};

use sqlc_gen_go_core::{
    error::GenError,
    generate,
    plugin::{GenerateRequest, GenerateResponse},
};
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

use crate::config::{CONFIG_FILE, GeneratorConfig};

fn init_logging(level: Level) -> Result<(), Box<dyn Error>> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

#[derive(clap::Args)]
#[command(about, long_about = None, name = "init")]
pub struct Initialize {}

impl Initialize {
    pub fn init(self) -> Result<(), Box<dyn Error>> {
        let exists = fs::exists(CONFIG_FILE)?;
        if exists {
            eprintln!("{CONFIG_FILE} already exists.\nExiting...");
            return Ok(());
        }

        let config = GeneratorConfig {
            request: Some("<path/to/request.json>".into()),
            out: Some("<path/to/output/directory>".into()),
            options: toml::Table::new(),
        };
        let toml = toml::to_string_pretty(&config)?;
        fs::write(CONFIG_FILE, toml)?;
        eprintln!("Written config to {CONFIG_FILE}!");
        Ok(())
    }
}

#[derive(clap::Args)]
#[command(about, long_about = None)]
pub struct Generate {
    #[arg(help = "Generation request as JSON, read from stdin when omitted")]
    request: Option<PathBuf>,
    #[arg(long, help = "Directory the generated files are written to")]
    out: Option<PathBuf>,
    #[arg(long, help = "Config file, defaults to sqlc-gen-go.toml when present")]
    config: Option<PathBuf>,
    #[arg(long, help = "Show debug information")]
    debug: bool,
}

impl Generate {
    pub fn generate(self) -> Result<(), Box<dyn Error>> {
        init_logging(match self.debug {
            true => Level::INFO,
            false => Level::WARN,
        })?;
        let config = GeneratorConfig::load(self.config)?;

        let raw = match self.request.or(config.request.clone()) {
            Some(path) => {
                info!("Reading request from {}", path.display());
                fs::read_to_string(path)?
            }
            None => {
                let mut raw = String::new();
                io::stdin().read_to_string(&mut raw)?;
                raw
            }
        };
        let mut request: GenerateRequest = serde_json::from_str(&raw)?;
        request.plugin_options = config.merge_options(request.plugin_options)?;

        let response = match generate(&request) {
            Ok(response) => response,
            Err(err) => {
                if let (GenError::Render { file, .. }, Some(partial)) = (&err, err.partial_output()) {
                    error!("Generation of {file} failed, partial output:\n{partial}");
                }
                return Err(err.into());
            }
        };

        match self.out.or(config.out) {
            Some(out) => write_files(&out, &response)?,
            None => println!("{}", serde_json::to_string_pretty(&response)?),
        }
        Ok(())
    }
}

fn write_files(out: &Path, response: &GenerateResponse) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(out)?;
    for file in &response.files {
        let path = out.join(&file.name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, &file.contents)?;
        info!("Wrote {}", path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use sqlc_gen_go_core::plugin::File;

    use super::*;

    #[test]
    fn files_land_under_output_directory() {
        let out = std::env::temp_dir().join(format!("sqlc-gen-go-{}", std::process::id()));
        let response = GenerateResponse {
            files: vec![
                File {
                    name: "db.go".into(),
                    contents: "package db\n".into(),
                },
                File {
                    name: "models.go".into(),
                    contents: "package db\n\ntype Author struct {\n}\n".into(),
                },
            ],
        };
        write_files(&out, &response).unwrap();
        assert_eq!(fs::read_to_string(out.join("db.go")).unwrap(), "package db\n");
        assert!(
            fs::read_to_string(out.join("models.go"))
                .unwrap()
                .contains("type Author struct")
        );
        fs::remove_dir_all(out).unwrap();
    }
}
