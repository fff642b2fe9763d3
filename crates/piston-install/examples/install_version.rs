use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use piston_install::game::installer::config::InstallerConfig;
use piston_install::game::installer::types::{InstallLayout, ProgressReporter};
use piston_install::game::installer::Installation;
use piston_install::game::version::{ResolutionSession, VersionSelector};

struct ConsoleReporter;

impl ProgressReporter for ConsoleReporter {
    fn start_step(&self, label: &str, total_items: usize) {
        println!("[STEP START] {} ({} items)", label, total_items);
    }

    fn set_progress(&self, label: &str, fraction: f64) {
        println!("[PROGRESS] {} {:.1}%", label, fraction * 100.0);
    }

    fn set_message(&self, message: &str) {
        println!("[MSG] {}", message);
    }

    fn done(&self, label: &str, success: bool) {
        println!("[DONE] {} success={}", label, success);
    }
}

// Usage: install_version [selector] [root] [config.json]
#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let selector: VersionSelector = args
        .next()
        .unwrap_or_else(|| "release".to_string())
        .parse()?;
    let root = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("minecraft"));
    let config = match args.next() {
        Some(path) => InstallerConfig::load(Path::new(&path))
            .await
            .with_context(|| format!("reading installer config {}", path))?,
        None => InstallerConfig::default(),
    };

    let mut session = ResolutionSession::new(config, InstallLayout::new(root))?;
    let resolved = session.resolve(&selector).await?;
    println!(
        "Resolved {} (patched: {}, runtime: {:?})",
        resolved.descriptor.id,
        resolved.patched,
        resolved.runtime.as_ref().map(|r| r.version)
    );

    let mut install = Installation::new(&session, resolved);
    let report = install.install_all(&ConsoleReporter).await?;
    println!("{:#?}", report);
    Ok(())
}
