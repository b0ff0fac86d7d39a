use addonpm::{
    AddonCache, AddonsFile, AddonsPaths, Config, GitAddonCache, InstallEvent, InstallOptions,
    InstallOutcome, Installer, ProgressCallback, ReportCallback, ReportLevel, TransferProgress,
};
use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

/// Exit code for a run that found conflicting addons
const EXIT_CANNOT_BE_RESOLVED: i32 = 2;

pub fn exit_code(outcome: InstallOutcome) -> i32 {
    match outcome {
        InstallOutcome::Succeeded | InstallOutcome::NothingToInstall => 0,
        InstallOutcome::CannotBeResolved => EXIT_CANNOT_BE_RESOLVED,
    }
}

/// Create an indicatif progress callback; a new bar starts whenever the message changes
fn create_progress_callback(template: &'static str) -> ProgressCallback {
    let state: Arc<Mutex<Option<(String, ProgressBar)>>> = Arc::new(Mutex::new(None));

    Arc::new(move |msg: &str, done: u64, total: u64| {
        let Ok(mut current) = state.lock() else {
            return;
        };

        let is_new = current.as_ref().map_or(true, |(m, _)| m != msg);
        if is_new {
            let bar = ProgressBar::new(total);
            if let Ok(style) = ProgressStyle::default_bar().template(template) {
                bar.set_style(style.progress_chars("=> "));
            }
            bar.set_message(msg.to_string());
            *current = Some((msg.to_string(), bar));
        }

        if let Some((_, bar)) = current.as_ref() {
            if total > 0 {
                bar.set_length(total);
            }
            bar.set_position(done);
            if total > 0 && done >= total {
                bar.finish_with_message(format!("✓ {}", msg));
            }
        }
    })
}

fn create_report_callback() -> ReportCallback {
    Arc::new(|event: &InstallEvent| match event {
        InstallEvent::Resolution(result) => {
            let marker = match result.level() {
                ReportLevel::Info => "•",
                ReportLevel::Warn => "⚠",
                ReportLevel::Error => "✗",
            };
            println!("  {} {}", marker, result);
        }
        InstallEvent::Finished(InstallOutcome::CannotBeResolved) => {
            println!();
            println!("✗ {}", InstallOutcome::CannotBeResolved);
        }
        InstallEvent::Finished(outcome) => {
            println!();
            println!("✓ {}", outcome);
        }
    })
}

pub fn run(
    path: Option<PathBuf>,
    max_depth: Option<usize>,
    manifest_file: Option<String>,
) -> Result<InstallOutcome> {
    let project_dir = super::project_dir(path)?;
    let config = Config::load()?;

    let manifest_file = manifest_file.or(config.install.manifest_file);
    let max_depth = max_depth.or(config.install.max_depth);
    let git = config.git.executable;

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async move {
        let (manifest, manifest_path) =
            AddonsFile::load(&project_dir, manifest_file.as_deref())?;
        println!("Installing addons from {}...", manifest_path.display());
        println!();

        let cache = GitAddonCache::new(AddonsPaths::new(&project_dir, &manifest), git);
        cache.ensure_cache_and_addons_directories_exist().await?;

        let cancel = CancellationToken::new();
        let on_interrupt = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                on_interrupt.cancel();
            }
        });

        let options = InstallOptions::new(&project_dir)
            .with_max_depth(max_depth)
            .with_manifest_file(manifest_file)
            .with_report(create_report_callback())
            .with_progress(TransferProgress {
                download: Some(create_progress_callback(
                    "{msg} [{bar:30.cyan/blue}] {bytes}/{total_bytes}",
                )),
                extract: Some(create_progress_callback(
                    "{msg} [{bar:30.green/blue}] {pos}/{len} files",
                )),
            })
            .with_cancel(cancel);

        let installer = Installer::new(cache);
        Ok::<_, anyhow::Error>(installer.install(&options).await?)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(exit_code(InstallOutcome::Succeeded), 0);
        assert_eq!(exit_code(InstallOutcome::NothingToInstall), 0);
        assert_eq!(exit_code(InstallOutcome::CannotBeResolved), 2);
    }
}
