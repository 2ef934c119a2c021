use std::process::ExitCode;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use concur::icon::gen::OutputGenerator;
use concur::icon::inputs::decode::ImageDecoder;
use concur::icon::inputs::SourceCatalog;
use concur::icon::meta::{BuildPlan, IconMetadata};
use concur::icon::IconProcessor;

use crate::cli::Invocation;
use crate::error::ConcurError;

mod cli;
mod error;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = cli::expand_hotspot_groups(std::env::args_os());
    let matches = match cli::command().try_get_matches_from(args) {
        Ok(v) => v,
        Err(err) => {
            // Help and version output go to stdout and are not failures
            let code = if err.use_stderr() { 2 } else { 0 };
            let _ = err.print();
            return ExitCode::from(code);
        }
    };

    let invocation = Invocation::from_matches(&matches);

    // Set up logging using tracing, the guard flushes the writer when main returns
    let (writer, _guard) = tracing_appender::non_blocking(std::io::stderr());
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(writer))
        .with(
            EnvFilter::builder()
                .with_default_directive(invocation.verbosity.into())
                .from_env_lossy(),
        )
        .init();

    tracing::info!(
        "{} version {}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    );

    match run(invocation).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(ConcurError::MissingOutput) => {
            tracing::error!("No output path was specified");
            let _ = cli::command().print_help();
            ExitCode::from(ConcurError::MissingOutput.exit_code())
        }
        Err(err) => {
            tracing::error!("{}", err);
            ExitCode::from(err.exit_code())
        }
    }
}

async fn run(invocation: Invocation) -> Result<(), ConcurError> {
    let mut output = invocation.output;
    let mut jobs = invocation.jobs;
    let mut steps = Vec::new();

    if let Some(path) = &invocation.manifest {
        tracing::debug!("Loading manifest from {}", path.display());
        let metadata = IconMetadata::from_file(path).await?;

        steps.extend(metadata.steps());
        output = output.or(metadata.output);
        jobs = jobs.or(metadata.jobs);
    }

    steps.extend(invocation.steps);

    let generator = OutputGenerator::new(output.ok_or(ConcurError::MissingOutput)?);
    generator.check_destination().await?;

    let plan = BuildPlan::from_steps(steps)?;
    if plan.sources.is_empty() {
        tracing::warn!("No source images were added");
    }

    tracing::debug!("Loading {} source images...", plan.sources.len());
    let catalog = SourceCatalog::load(&plan.sources, &ImageDecoder).await?;

    let mut processor = IconProcessor::new(catalog, plan.requests);
    if let Some(jobs) = jobs {
        processor = processor.with_jobs(jobs);
    }

    let kind = processor.kind();
    let wanted = kind.extension();
    if generator
        .path()
        .extension()
        .map_or(true, |ext| !ext.eq_ignore_ascii_case(wanted))
    {
        tracing::info!(
            "Writing a {:?} to {}, which does not end in .{}",
            kind,
            generator.path().display(),
            wanted
        );
    }

    let assembly = processor.process().await?;
    if assembly.container.entries().is_empty() {
        tracing::warn!("No sizes could be produced, the output contains no images");
    }

    generator.write(&assembly.data).await?;
    tracing::info!(
        "Wrote {} entries ({} bytes) to {}",
        assembly.container.entries().len(),
        assembly.data.len(),
        generator.path().display()
    );

    let failed = assembly.failure_count();
    if failed > 0 {
        return Err(ConcurError::EntriesFailed(failed));
    }

    Ok(())
}
