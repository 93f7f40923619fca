//! Native command-line front end: per-image statistics and overlay rendering.
//!
//! Usage: `cmat-native <project.json> [image-index] [out.png]`

#[cfg(not(target_arch = "wasm32"))]
fn main() -> std::process::ExitCode {
    match native::run() {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            eprintln!("Error: {}", e);
            std::process::ExitCode::FAILURE
        }
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {}

#[cfg(not(target_arch = "wasm32"))]
mod native {
    use std::path::{Path, PathBuf};

    use cmat::format::ImageRecord;
    use cmat::{AppConfig, AppError, CmatApp, Project};
    use image::{Rgba, RgbaImage};

    const USAGE: &str = "usage: cmat-native <project.json> [image-index] [out.png]";

    /// Fill for the base image when the photograph cannot be read.
    const PLACEHOLDER: Rgba<u8> = Rgba([0x30, 0x30, 0x30, 0xFF]);

    #[derive(Debug, thiserror::Error)]
    pub enum CliError {
        #[error("{0}")]
        Usage(String),
        #[error(transparent)]
        App(#[from] AppError),
        #[error("Failed to write {path:?}: {source}")]
        Image {
            path: PathBuf,
            source: image::ImageError,
        },
    }

    fn init_logging(config: &AppConfig) {
        env_logger::Builder::new()
            .filter_level(config.preferences.log_level.to_level_filter())
            .parse_default_env()
            .init();
    }

    pub fn run() -> Result<(), CliError> {
        let mut args = std::env::args().skip(1);
        let project_path = args
            .next()
            .map(PathBuf::from)
            .ok_or_else(|| CliError::Usage(USAGE.to_string()))?;
        let index = args
            .next()
            .map(|s| {
                s.parse::<usize>()
                    .map_err(|_| CliError::Usage(format!("invalid image index '{}'\n{}", s, USAGE)))
            })
            .transpose()?;
        let output = args.next().map(PathBuf::from);

        let config = match AppConfig::load_from_default_path() {
            Ok(config) => {
                let config = config.unwrap_or_default();
                init_logging(&config);
                config
            }
            Err(e) => {
                let config = AppConfig::default();
                init_logging(&config);
                log::warn!(
                    "Ignoring config file {:?}, using defaults: {}",
                    AppConfig::default_path(),
                    e
                );
                config
            }
        };

        let project = Project::load(&project_path).map_err(AppError::from)?;
        let mut app = CmatApp::without_backend(config, project)?;
        let count = app.project().image_count();
        if count == 0 {
            log::warn!("Project {:?} has no images", project_path);
            return Ok(());
        }

        match index {
            Some(index) => {
                app.open_image(index)?;
                report(&app);
            }
            None => {
                for index in 0..count {
                    app.open_image(index)?;
                    report(&app);
                }
            }
        }

        if let Some(output) = output {
            let record = app
                .project()
                .image(app.project().active_index())
                .cloned()
                .ok_or(AppError::NoImage)?;
            let base = load_base(&record, project_path.parent().unwrap_or(Path::new(".")));
            let frame = app.draw(&base);
            frame.save(&output).map_err(|source| CliError::Image {
                path: output.clone(),
                source,
            })?;
            log::info!("Wrote overlay for '{}' to {:?}", record.file_name, output);
        }
        Ok(())
    }

    /// Log the statistics of the open image.
    fn report(app: &CmatApp) {
        let Some(data) = app.image() else {
            return;
        };
        let stats = app.statistics();
        log::info!(
            "[{}] {} ({}x{}, {} masks)",
            data.index(),
            data.file_name(),
            data.width(),
            data.height(),
            data.masks().len()
        );
        for entry in stats.coverage_chart() {
            log::info!("  coverage  {:<24} {:>10} px", entry.label, entry.value);
        }
        for entry in stats.species_coverage() {
            log::info!("  species   {:<24} {:>10} px", entry.label, entry.value);
        }
        for entry in stats.colony_chart() {
            log::info!("  colonies  {:<24} {:>10}", entry.label, entry.value);
        }
        for entry in stats.status_coverage() {
            log::info!("  status    {:<24} {:>10} px", entry.label, entry.value);
        }
    }

    /// Load the photograph behind the masks, falling back to a flat fill.
    fn load_base(record: &ImageRecord, project_dir: &Path) -> RgbaImage {
        let path = match &record.path {
            Some(path) => project_dir.join(path),
            None => project_dir.join(&record.file_name),
        };
        match image::open(&path) {
            Ok(img) => img.to_rgba8(),
            Err(e) => {
                log::warn!("Could not read {:?} ({}), using a blank base", path, e);
                RgbaImage::from_pixel(record.width, record.height, PLACEHOLDER)
            }
        }
    }
}
