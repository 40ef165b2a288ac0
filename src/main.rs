use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use env_logger::Env;
use log::debug;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use helm2oci::{HelmService, HttpHelmService, Notifier, OciHelmService, RegistryInformations};

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum Mode {
    /// OCI artifact pushed through the Distribution API
    Oci,
    /// Gzip tarball uploaded to a plain HTTP chart repository
    Http,
}

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[arg(
        short,
        long,
        global = true,
        action = clap::ArgAction::Count,
        help = "Verbose mode (-v info, -vv debug, -vvv trace); logs replace progress bars"
    )]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Package a chart archive and push it to a registry
    Push {
        #[arg(help = "Chart archive (.tar, .tgz, .tar.gz or .tar.bz2)")]
        archive: PathBuf,

        #[arg(short, long, help = "Target image (repository) name")]
        image: String,

        #[arg(short, long, help = "Tag; defaults to the chart version (oci) or 'latest' (http)")]
        tag: Option<String>,

        #[arg(short, long, value_enum, default_value = "oci")]
        mode: Mode,

        #[command(flatten)]
        registry: RegistryArgs,
    },
    /// Check that the registry is reachable and accepts the credentials
    Verify {
        #[arg(short, long, value_enum, default_value = "oci")]
        mode: Mode,

        #[command(flatten)]
        registry: RegistryArgs,
    },
    /// Print the manifest and config that would be pushed, without pushing
    Inspect {
        #[arg(help = "Chart archive (.tar, .tgz, .tar.gz or .tar.bz2)")]
        archive: PathBuf,
    },
}

#[derive(Args)]
struct RegistryArgs {
    #[arg(short, long, help = "YAML file with server, username and password")]
    config: Option<PathBuf>,

    #[arg(long, env = "HELM2OCI_SERVER", help = "Registry server address")]
    server: Option<String>,

    #[arg(long, env = "HELM2OCI_USERNAME")]
    username: Option<String>,

    #[arg(long, env = "HELM2OCI_PASSWORD", hide_env_values = true)]
    password: Option<String>,
}

impl RegistryArgs {
    fn resolve(self) -> Result<RegistryInformations> {
        let base = match &self.config {
            Some(path) => RegistryInformations::from_file(path)
                .with_context(|| format!("Failed to load registry config {}", path.display()))?,
            None => RegistryInformations::default(),
        };
        Ok(base.merge(self.server, self.username, self.password))
    }
}

fn service<'n>(mode: Mode, notifier: &'n Notifier) -> Box<dyn HelmService + 'n> {
    match mode {
        Mode::Oci => Box::new(OciHelmService::new(notifier)),
        Mode::Http => Box::new(HttpHelmService::new(notifier)),
    }
}

fn file_name(path: &Path) -> Result<&str> {
    path.file_name()
        .and_then(|name| name.to_str())
        .with_context(|| format!("Invalid archive path: {}", path.display()))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let notifier = Notifier::new(cli.verbose);
    env_logger::Builder::from_env(Env::default())
        .filter_level(notifier.verbosity_level().to_log_level())
        .init();

    match cli.command {
        Command::Push {
            archive,
            image,
            tag,
            mode,
            registry,
        } => {
            let registry = registry.resolve()?;
            debug!("Registry: {:?}", registry);
            let service = service(mode, &notifier);
            debug!("Connection type: {}", service.connection_type());

            let mut input = BufReader::new(
                File::open(&archive)
                    .with_context(|| format!("Failed to open {}", archive.display()))?,
            );
            service.send_to_registry(
                &mut input,
                file_name(&archive)?,
                &registry,
                &image,
                tag.as_deref(),
            )?;
        }
        Command::Verify { mode, registry } => {
            let registry = registry.resolve()?;
            let service = service(mode, &notifier);
            service.verify_connection(&registry)?;
            println!("{} registry {} is reachable", service.connection_type(), registry.server);
        }
        Command::Inspect { archive } => {
            let mut input = BufReader::new(
                File::open(&archive)
                    .with_context(|| format!("Failed to open {}", archive.display()))?,
            );
            let (_staged, artifact) = OciHelmService::new(&notifier)
                .package(&mut input, file_name(&archive)?)
                .with_context(|| format!("Failed to package {}", archive.display()))?;
            notifier.finish("Packaged chart");
            println!("{}", artifact.manifest().to_json_pretty()?);
            println!("{}", String::from_utf8_lossy(artifact.config()));
        }
    }

    Ok(())
}
