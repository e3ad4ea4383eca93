use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use sitegen_client::editor::FileTree;
use sitegen_client::materialize::write_files;
use sitegen_client::preview::{archive_name, download_name, preview_url, render_document};
use sitegen_client::relay::{self, RelayConfig};
use sitegen_client::{
    ClientConfig, GeneratedProject, GenerationRequest, GenerationResult, GenerationSession,
    GeneratorClient, PollPolicy, PollState, SubmitReply,
};

#[derive(Parser)]
#[command(
    name = "sitegen",
    about = "Generate, inspect and edit AI-generated web projects",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Backend base URL (defaults to $SITEGEN_BACKEND_URL or http://127.0.0.1:5000)
    #[arg(short, long, global = true)]
    backend: Option<String>,

    /// Debug-level logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Describe a project and wait for it to be generated
    Generate {
        /// Project description
        #[arg(required = true)]
        prompt: Vec<String>,

        /// Project name, sent as a "Project Name:" line ahead of the description
        #[arg(short, long)]
        name: Option<String>,

        /// Agent step/recursion limit
        #[arg(long)]
        recursion_limit: Option<u32>,

        /// Poll every 2 seconds instead of every 5
        #[arg(long)]
        rapid: bool,

        /// Seconds between status checks
        #[arg(long)]
        interval: Option<u64>,

        /// Status checks before giving up
        #[arg(long)]
        max_attempts: Option<u32>,

        /// Write the generated files into this directory
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Show the raw status of a job
    Status {
        job_id: String,
    },

    /// List the generated files as a tree
    Files,

    /// Print one file
    Show {
        path: String,
    },

    /// Overwrite one file from a local file (or stdin)
    Save {
        path: String,

        /// Read content from this file instead of stdin
        #[arg(short, long)]
        from: Option<PathBuf>,
    },

    /// Delete one file
    Delete {
        path: String,
    },

    /// List the files written for a job, with sizes
    ProjectFiles {
        job_id: String,
    },

    /// Download a job's project archive
    Download {
        job_id: String,

        /// Output path (defaults to generated_project_<id>.zip)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the preview URL of the project or one file
    Preview {
        path: Option<String>,
    },

    /// Run the HTTP relay in front of the backend
    Relay {
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        #[arg(short, long, default_value_t = 3000)]
        port: u16,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "sitegen_client=debug,sitegen=debug"
    } else {
        "sitegen_client=info,sitegen=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let client = match &cli.backend {
        Some(url) => GeneratorClient::new(url),
        None => GeneratorClient::with_config(ClientConfig::from_env()),
    };

    match cli.command {
        Commands::Generate {
            prompt,
            name,
            recursion_limit,
            rapid,
            interval,
            max_attempts,
            out,
        } => {
            let text = prompt.join(" ");
            let request = match name {
                Some(name) => {
                    let project = GenerationRequest::project(name, text);
                    project.validate()?;
                    project.into_prompt()
                }
                None => GenerationRequest::prompt(text),
            };
            let request = match recursion_limit {
                Some(limit) => request.with_recursion_limit(limit),
                None => request,
            };

            let mut policy = if rapid {
                PollPolicy::rapid()
            } else {
                PollPolicy::default()
            };
            if let Some(secs) = interval {
                policy = policy.with_interval(Duration::from_secs(secs));
            }
            if let Some(max) = max_attempts {
                policy = policy.with_max_attempts(max);
            }

            generate(client, request, policy, out).await?;
        }

        Commands::Status { job_id } => {
            let record = client.status(&job_id).await?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }

        Commands::Files => {
            let files = client.list_files().await?;
            let mut tree = FileTree::build(&files);
            let folders: Vec<String> = tree.folders.keys().cloned().collect();
            for folder in &folders {
                tree.toggle(folder);
            }
            for file in tree.visible_files() {
                println!("{}", file.path);
            }
            if tree.is_empty() {
                println!("(no files)");
            }
        }

        Commands::Show { path } => {
            print!("{}", client.file_content(&path).await?);
        }

        Commands::Save { path, from } => {
            let content = match from {
                Some(file) => std::fs::read_to_string(&file)
                    .with_context(|| format!("reading {}", file.display()))?,
                None => {
                    let mut buf = String::new();
                    std::io::stdin()
                        .read_to_string(&mut buf)
                        .context("reading stdin")?;
                    buf
                }
            };
            client.save_file(&path, &content).await?;
            println!("Saved {}", path);
        }

        Commands::Delete { path } => {
            client.delete_file(&path).await?;
            println!("Deleted {}", path);
        }

        Commands::ProjectFiles { job_id } => {
            for entry in client.project_files(&job_id).await? {
                println!("{:>10}  {}", entry.size_label(), entry.path);
            }
        }

        Commands::Download { job_id, output } => {
            let bytes = client.download(&job_id).await?;
            let path = output.unwrap_or_else(|| PathBuf::from(archive_name(&job_id)));
            std::fs::write(&path, &bytes).with_context(|| format!("writing {}", path.display()))?;
            println!("Wrote {} ({} bytes)", path.display(), bytes.len());
        }

        Commands::Preview { path } => {
            println!("{}", preview_url(client.endpoint(), path.as_deref()));
        }

        Commands::Relay { host, port } => {
            relay::start_server(client, &RelayConfig { host, port }).await?;
        }
    }

    Ok(())
}

async fn generate(
    client: GeneratorClient,
    request: GenerationRequest,
    policy: PollPolicy,
    out: Option<PathBuf>,
) -> Result<()> {
    let session = GenerationSession::new(Arc::new(client), policy);

    match session.submit(request).await? {
        SubmitReply::Mock(project) => {
            eprintln!("Backend unavailable; received a placeholder project.");
            return write_single_page(&project, out);
        }
        SubmitReply::Accepted(ack) => eprintln!("Job {} started", ack.job_id),
    }

    let mut progress = session.subscribe();
    let reporter = tokio::spawn(async move {
        while progress.changed().await.is_ok() {
            let p = progress.borrow_and_update().clone();
            if p.status == PollState::Processing {
                eprintln!("[{:>3}%] {}", p.progress, p.message);
            }
        }
    });

    let result = tokio::select! {
        result = session.wait() => result,
        _ = tokio::signal::ctrl_c() => {
            session.cancel();
            Some(GenerationResult::Cancelled)
        }
    };
    reporter.abort();

    match result {
        Some(GenerationResult::Completed { files, project, .. }) => {
            println!("Generated {} file(s):", files.len());
            for file in &files {
                let marker = if file.loaded { " " } else { "!" };
                println!(" {} {}", marker, file.descriptor.path);
            }
            if let Some(dir) = out {
                let written = write_files(&dir, &files)?;
                println!("Wrote {} file(s) to {}", written.len(), dir.display());
            } else if !project.html.is_empty() {
                println!("Preview: {}", preview_url(session.backend().endpoint(), None));
            }
            Ok(())
        }
        Some(GenerationResult::Failed { message, traceback }) => {
            if let Some(tb) = traceback {
                eprintln!("{}", tb);
            }
            bail!("Generation failed: {}", message)
        }
        Some(GenerationResult::TimedOut { message }) => bail!(message),
        Some(GenerationResult::Cancelled) | None => bail!("Generation cancelled"),
    }
}

fn write_single_page(project: &GeneratedProject, out: Option<PathBuf>) -> Result<()> {
    let document = render_document(project);
    let path = match out {
        Some(dir) => {
            std::fs::create_dir_all(&dir)?;
            dir.join(download_name(&project.name))
        }
        None => PathBuf::from(download_name(&project.name)),
    };
    std::fs::write(&path, document).with_context(|| format!("writing {}", path.display()))?;
    println!("Wrote {}", path.display());
    Ok(())
}
