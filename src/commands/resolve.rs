//! # Resolve Command Implementation
//!
//! A dry run of `sync`: prints, for every repository the delivery targets,
//! the clone URL (credentials masked) and the mirror directory it would be
//! synchronized into. No git command is run and the registry is not written.

use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use mirror_hook::indexer::LogIndexer;
use mirror_hook::location::{rewrite, EffectiveLocation};
use mirror_hook::logging::Logger;
use mirror_hook::registry::{FileRegistry, RepositoryRecord};
use mirror_hook::{Settings, UpdateOrchestrator};

use super::DeliveryArgs;

/// Show which mirrors a notification would synchronize
#[derive(Args, Debug)]
pub struct ResolveArgs {
    #[command(flatten)]
    pub delivery: DeliveryArgs,
}

/// Execute the resolve command
pub fn execute(args: ResolveArgs, logger: Logger) -> Result<()> {
    let settings = args.delivery.settings()?;
    let request = args.delivery.request()?;
    let registry = Arc::new(FileRegistry::open(&args.delivery.registry)?);

    let orchestrator = UpdateOrchestrator::new(
        registry,
        Arc::new(LogIndexer::new(logger.clone())),
        settings,
    )
    .with_logger(logger);
    let repositories = orchestrator.resolve(&request)?;

    for record in &repositories {
        let location = locate(orchestrator.settings(), record);
        println!("{}", format_location(record, &location));
    }
    Ok(())
}

fn locate(settings: &Settings, record: &RepositoryRecord) -> EffectiveLocation {
    rewrite(&record.url, settings.credentials(), settings.base_dir())
}

fn format_location(record: &RepositoryRecord, location: &EffectiveLocation) -> String {
    format!(
        "{}/{}\t{}\t{}",
        record.project,
        record.identifier,
        location.redacted_clone_url(),
        location.local_path
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> RepositoryRecord {
        let mut record = RepositoryRecord::git("main", "https://github.com/acme/acme.git");
        record.project = "acme".to_string();
        record
    }

    #[test]
    fn test_resolve_line_masks_credentials() {
        let settings = Settings {
            credentials: Some("bot:s3cret".to_string()),
            base_dir: Some("/srv/mirrors".to_string()),
            ..Settings::default()
        };
        let record = record();
        let line = format_location(&record, &locate(&settings, &record));
        assert_eq!(
            line,
            "acme/main\thttps://***@github.com/acme/acme.git\t/srv/mirrors/acme/acme.git"
        );
        assert!(!line.contains("s3cret"));
    }

    #[test]
    fn test_resolve_line_without_settings() {
        let record = record();
        let line = format_location(&record, &locate(&Settings::default(), &record));
        assert_eq!(
            line,
            "acme/main\thttps://github.com/acme/acme.git\thttps://github.com/acme/acme.git"
        );
    }
}
