use std::path::Path;

use anyhow::anyhow;
use config::{Config, File};
use serde::Deserialize;

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// File extensions indexed as Markdown, compared case-insensitively
    pub markdown_extensions: Vec<String>,
    /// Read ignore files from the folder root; otherwise only `.git`/`.hg` are skipped
    pub respect_ignore_files: bool,
    pub ignore_files: Vec<String>,
}

impl Settings {
    pub fn new(root_dir: &Path) -> anyhow::Result<Settings> {
        let expanded = shellexpand::tilde("~/.config/marklink/settings");
        let settings = Config::builder()
            .add_source(File::with_name(&expanded).required(false))
            .add_source(
                File::with_name(&format!(
                    "{}/.marklink",
                    root_dir
                        .to_str()
                        .ok_or(anyhow!("Can't convert root_dir to str"))?
                ))
                .required(false),
            )
            .set_default("markdown_extensions", vec!["md"])?
            .set_default("respect_ignore_files", true)?
            .set_default("ignore_files", vec![".ignore", ".gitignore"])?
            .build()
            .map_err(|err| anyhow!("Build err: {err}"))?;

        let settings = settings.try_deserialize::<Settings>()?;

        anyhow::Ok(settings)
    }

    /// Settings for a folder root, falling back to the defaults when the
    /// settings files cannot be read.
    pub fn for_root(root_dir: &Path) -> Settings {
        Settings::new(root_dir).unwrap_or_else(|err| {
            tracing::warn!(root = %root_dir.display(), error = %err, "using default settings");
            Settings::default()
        })
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            markdown_extensions: vec!["md".to_string()],
            respect_ignore_files: true,
            ignore_files: vec![".ignore".to_string(), ".gitignore".to_string()],
        }
    }
}
