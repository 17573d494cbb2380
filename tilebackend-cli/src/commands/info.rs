//! Info command - show source metadata and derived capabilities.

use tilebackend::source::{DegradedResolutionPolicy, SourceCapabilities, SourceKind};

use crate::error::CliError;
use crate::runner::CliRunner;

/// Run the info command.
pub async fn run(runner: &CliRunner, source: Option<&str>) -> Result<(), CliError> {
    runner.log_startup("info");

    let backend = runner.open_backend(source)?;
    let info = backend.info().await?;
    let capabilities = backend.capabilities().await?;
    backend.shutdown();

    if let Some(name) = &info.name {
        println!("Name:         {}", name);
    }
    for line in describe(&capabilities) {
        println!("{}", line);
    }
    println!("Layers:       {}", info.vector_layers.len());
    println!("Config file:  {}", runner.config_path().display());
    Ok(())
}

fn describe(capabilities: &SourceCapabilities) -> Vec<String> {
    let policy = match capabilities.policy {
        DegradedResolutionPolicy::None => "none".to_string(),
        DegradedResolutionPolicy::Fillzoom(z) => format!("fillzoom {}", z),
        DegradedResolutionPolicy::MaskLevel(z) => format!("mask level {}", z),
    };
    let kind = match capabilities.kind {
        SourceKind::Vector => "vector",
        SourceKind::Raster => "raster",
    };

    vec![
        format!("Zoom range:   {}-{}", capabilities.minzoom, capabilities.maxzoom),
        format!("Fallback:     {}", policy),
        format!("Kind:         {}", kind),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_capabilities() {
        let capabilities = SourceCapabilities::new(2, 14)
            .with_policy(DegradedResolutionPolicy::MaskLevel(8))
            .with_kind(SourceKind::Raster);

        assert_eq!(
            describe(&capabilities),
            vec![
                "Zoom range:   2-14".to_string(),
                "Fallback:     mask level 8".to_string(),
                "Kind:         raster".to_string(),
            ]
        );
    }
}
