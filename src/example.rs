//! Code for working with the bundled demo models
use anyhow::{Context, Result, bail};
use include_dir::{Dir, DirEntry, include_dir};
use std::fs;
use std::path::Path;

/// The directory containing the demo models.
const DEMOS_DIR: Dir = include_dir!("$CARGO_MANIFEST_DIR/demos");

/// Get the names of all demo models
pub fn get_example_names() -> impl Iterator<Item = &'static str> {
    DEMOS_DIR
        .dirs()
        .filter_map(|dir| dir.path().as_os_str().to_str())
}

/// A bundled demo model
pub struct Example(Dir<'static>);

impl Example {
    /// Get the demo with the specified name
    pub fn from_name(name: &str) -> Result<Self> {
        let dir = DEMOS_DIR
            .get_dir(name)
            .with_context(|| format!("Example '{name}' not found"))?;

        Ok(Self(dir.clone()))
    }

    /// Get the contents of the readme file for this demo
    pub fn get_readme(&self) -> Result<&'static str> {
        self.0
            .get_file(self.0.path().join("README.txt"))
            .context("Missing file")?
            .contents_utf8()
            .context("File not UTF-8 encoded")
    }

    /// Extract this demo to a specified destination
    pub fn extract(&self, new_path: &Path) -> Result<()> {
        fs::create_dir(new_path)
            .with_context(|| format!("Could not create directory {}", new_path.display()))?;
        for entry in self.0.entries() {
            match entry {
                DirEntry::Dir(dir) => {
                    bail!("Subdirectories in examples not supported: {}", dir.path().display())
                }
                DirEntry::File(f) => {
                    let file_name = f.path().file_name().context("Missing file name")?;
                    fs::write(new_path.join(file_name), f.contents())?;
                }
            }
        }

        Ok(())
    }
}
