use clap::Parser;

/// qraction - installs the "Decode QR Code" Quick Action
///
/// Running with no flags performs the entire sequence: provision the
/// decoder's virtual environment, stage and patch the workflow bundle,
/// and install it into the per-user Services directory.
#[derive(Parser, Debug)]
#[command(name = "qraction")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Project root containing templates/, scripts/ and requirements.txt
    /// (default: current directory)
    #[arg(long, value_name = "DIR")]
    pub project_dir: Option<String>,

    /// Install destination (default: ~/Library/Services)
    #[arg(long, value_name = "DIR")]
    pub services_dir: Option<String>,

    /// Skip dependency installation into the virtual environment
    #[arg(long, default_value = "false")]
    pub skip_deps: bool,
}
