//! Loading indicator templates and movement scripts from disk.

use std::fs;
use std::path::{Path, PathBuf};

use image::RgbaImage;

use crate::error::{BotError, Result};
use crate::logger;
use crate::movement::MovementCommand;
use crate::screen::ClientView;
use crate::settings::AssetSettings;

const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Counts of what `install` registered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Installed {
    pub templates: usize,
    pub scripts: usize,
}

/// Files in `dir` with one of `extensions`, sorted by path. A missing
/// directory is reported and treated as empty.
fn files_with(dir: &Path, extensions: &[&str]) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        logger::warn_p("assets", &format!("directory not found: {}", dir.display()));
        return Ok(Vec::new());
    }
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let matches = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| extensions.iter().any(|x| e.eq_ignore_ascii_case(x)))
            .unwrap_or(false);
        if matches && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn stem(path: &Path) -> String {
    path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default()
}

pub fn load_templates(dir: &Path) -> Result<Vec<(String, RgbaImage)>> {
    let mut out = Vec::new();
    for path in files_with(dir, &IMAGE_EXTENSIONS)? {
        let img = image::open(&path).map_err(|e| BotError::asset(&path, e.to_string()))?;
        out.push((stem(&path), img.to_rgba8()));
    }
    Ok(out)
}

/// Parse a script body: a JSON array of `{ "units", "rotation" }`.
pub fn parse_script(path: &Path, text: &str) -> Result<Vec<MovementCommand>> {
    let commands: Vec<MovementCommand> =
        serde_json::from_str(text).map_err(|e| BotError::asset(path, e.to_string()))?;
    for (i, c) in commands.iter().enumerate() {
        if !c.units.is_finite() || !c.rotation.is_finite() {
            return Err(BotError::asset(path, format!("command {} is not finite", i)));
        }
        if c.units < 0.0 {
            return Err(BotError::asset(path, format!("command {} has negative units", i)));
        }
    }
    Ok(commands)
}

pub fn load_scripts(dir: &Path) -> Result<Vec<(String, Vec<MovementCommand>)>> {
    let mut out = Vec::new();
    for path in files_with(dir, &["json"])? {
        let text = fs::read_to_string(&path)?;
        out.push((stem(&path), parse_script(&path, &text)?));
    }
    Ok(out)
}

/// Register every template and script under `base` into `view`.
pub fn install(view: &mut ClientView, assets: &AssetSettings, base: &Path) -> Result<Installed> {
    let mut installed = Installed::default();

    for (name, template) in load_templates(&base.join(&assets.templates_dir))? {
        match view.register_sub_image(&name, template) {
            Ok(()) => installed.templates += 1,
            Err(BotError::DuplicateSubImage(n)) => {
                logger::warn_p("assets", &format!("skipping duplicate template {}", n));
            }
            Err(e) => return Err(e),
        }
    }
    for (name, commands) in load_scripts(&base.join(&assets.movements_dir))? {
        view.register_script(&name, commands);
        installed.scripts += 1;
    }

    logger::info_p(
        "assets",
        &format!("loaded {} templates and {} movement scripts", installed.templates, installed.scripts),
    );
    Ok(installed)
}
