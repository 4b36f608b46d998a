use anyhow::Context as _;
use cdq_controller::api::ComponentDetectionQuerySpec;
use cdq_controller::app::{handle_fatal_error, init_logging, ControllerConfig};
use cdq_controller::cluster::ClusterHandles;
use cdq_controller::controller::{self, Context, ReconcileSettings};
use cdq_controller::git::GitHubRepo;
use cdq_controller::metrics::DetectionMetrics;
use cdq_controller::resolver::build_components;
use cdq_controller::runner::{run_worker, AnalysisRunner, DetectionRequest};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

/// Detect components in Git repositories for ComponentDetectionQuery resources
#[derive(Parser)]
#[command(name = "cdq-controller", version)]
#[command(about = "ComponentDetectionQuery controller", long_about = None)]
struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace, -vvv for all)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to a YAML configuration file
    #[arg(short = 'c', long, global = true, env = "CDQ_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the controller
    Run {
        /// Analyse in-process instead of launching worker jobs
        #[arg(long)]
        run_analysis_locally: bool,

        /// Image for worker jobs
        #[arg(long)]
        analysis_image: Option<String>,

        /// Devfile registry used for stack matches
        #[arg(long)]
        registry_url: Option<String>,
    },
    /// Analyse one ComponentDetectionQuery and publish the result (worker job entry point)
    Analyze {
        #[arg(long)]
        namespace: String,

        #[arg(long)]
        name: String,
    },
    /// Run detection locally and print the detected components as JSON
    Detect {
        /// GitHub repository URL
        url: String,

        #[arg(long)]
        revision: Option<String>,

        /// Sub-path to start detection from
        #[arg(long)]
        context: Option<String>,

        /// Use this devfile instead of detecting one
        #[arg(long)]
        devfile_url: Option<String>,

        /// Git token for private repositories
        #[arg(long, env = "CDQ_GIT_TOKEN", hide_env_values = true)]
        token: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let verbose = cli.verbose;
    init_logging(verbose);

    if let Err(e) = run(cli).await {
        handle_fatal_error(e, verbose);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = ControllerConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Run {
            run_analysis_locally,
            analysis_image,
            registry_url,
        } => {
            if run_analysis_locally {
                config.run_analysis_locally = true;
            }
            if let Some(image) = analysis_image {
                config.analysis_image = image;
            }
            if let Some(registry) = registry_url {
                config.registry_url = registry;
            }
            debug!("Effective configuration: {:?}", config);

            let client = kube::Client::try_default()
                .await
                .context("Failed to create Kubernetes client")?;
            let cluster = ClusterHandles::kube(client.clone());
            let pipeline = Arc::new(cdq_controller::production_pipeline(&config)?);
            let metrics = DetectionMetrics::with_tracing(config.metrics_config()).await;
            let ctx = Context {
                runner: AnalysisRunner::new(
                    pipeline,
                    cluster.clone(),
                    config.run_analysis_locally,
                    config.job_settings(),
                ),
                cluster,
                metrics: metrics.clone(),
                settings: ReconcileSettings::from(&config),
            };
            controller::run(client, Arc::new(ctx), &config.side_object_label).await;
            metrics.flush().await;
        }
        Commands::Analyze { namespace, name } => {
            info!("Analysing ComponentDetectionQuery {}/{}", namespace, name);
            let client = kube::Client::try_default()
                .await
                .context("Failed to create Kubernetes client")?;
            let cluster = ClusterHandles::kube(client);
            let pipeline = cdq_controller::production_pipeline(&config)?;
            run_worker(&cluster, &pipeline, &namespace, &name)
                .await
                .with_context(|| format!("Analysis of {namespace}/{name} failed"))?;
        }
        Commands::Detect {
            url,
            revision,
            context,
            devfile_url,
            token,
        } => {
            let spec = ComponentDetectionQuerySpec {
                url,
                revision,
                context,
                devfile_url,
                ..Default::default()
            };
            let pipeline = cdq_controller::production_pipeline(&config)?;
            let request = DetectionRequest::from_spec(&spec, token);
            let output = pipeline.run(&request).await?;
            let repo = GitHubRepo::parse(&spec.url)?;
            let components = build_components(&output, &repo);
            println!("{}", serde_json::to_string_pretty(&components)?);
        }
    }

    Ok(())
}
