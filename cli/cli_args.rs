use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Generate a Markdown or JSON summary of a source tree.",
    long_about = "reposcribe walks a local directory or a freshly cloned repository, applies \ninclude/exclude rules from defaults, .reposcribe.yml, .gitignore and the command line, \nand writes one document with the directory tree, file contents and statistics.",
    help_template = "{about-section}\nUsage: {usage}\n\n{all-args}{after-help}",
    after_help = "EXAMPLES:\n  reposcribe init\n  reposcribe process --force\n  reposcribe process --repo https://github.com/user/repo.git --target ./repo\n  reposcribe process --format json --exclude-extra '**/*.lock'",
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[arg(short, long, action = clap::ArgAction::Count, global = true, help = "Increase message verbosity (-v, -vv, -vvv).")]
    pub verbose: u8,

    #[arg(
        short,
        long,
        global = true,
        help = "Silence informational messages and warnings."
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    #[command(about = "Write a default .reposcribe.yml configuration file.")]
    Init(InitArgs),

    #[command(
        visible_alias = "p",
        about = "Process a directory or repository into a summary document."
    )]
    Process(ProcessArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct InitArgs {
    #[arg(
        long,
        help = "Directory to write the configuration into (default: current dir).",
        value_name = "DIR"
    )]
    pub root_dir: Option<String>,

    #[arg(long, help = "Overwrite an existing configuration file.")]
    pub force: bool,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ProcessArgs {
    #[arg(
        long,
        help = "Clone this repository URL instead of using a local directory.",
        value_name = "URL",
        help_heading = "Source"
    )]
    pub repo: Option<String>,

    #[arg(
        long,
        help = "Directory to process, or clone destination with --repo. Takes precedence over --target.",
        value_name = "DIR",
        help_heading = "Source"
    )]
    pub root_dir: Option<String>,

    #[arg(
        long,
        help = "Branch to check out when cloning.",
        value_name = "BRANCH",
        help_heading = "Source"
    )]
    pub branch: Option<String>,

    #[arg(
        long,
        help = "Directory to process, or clone destination with --repo (default: current dir).",
        value_name = "DIR",
        help_heading = "Source"
    )]
    pub target: Option<String>,

    #[arg(
        long,
        help = "Process a directory that is not a Git repository.",
        help_heading = "Source"
    )]
    pub force: bool,

    #[arg(
        short,
        long,
        help = "Output file (default: project_summary.md or .json).",
        value_name = "FILE",
        help_heading = "Output"
    )]
    pub output: Option<String>,

    #[arg(
        short = 'f',
        long,
        help = "Output format.",
        value_name = "FORMAT",
        value_parser = ["markdown", "json"],
        help_heading = "Output"
    )]
    pub format: Option<String>,

    #[arg(
        short,
        long,
        help = "Configuration file (default: .reposcribe.yml in the working directory).",
        value_name = "FILE",
        help_heading = "Configuration"
    )]
    pub config: Option<String>,

    #[arg(
        long,
        help = "Abort the run after this long (e.g. '30s', '2m').",
        value_name = "DURATION",
        help_heading = "Configuration"
    )]
    pub timeout: Option<String>,

    #[command(flatten)]
    pub filters: FilterOpts,
}

#[derive(Args, Debug, Clone, Default)]
pub struct FilterOpts {
    #[arg(
        long,
        help = "Include files matching this pattern (repeatable).",
        value_name = "PATTERN",
        action = clap::ArgAction::Append,
        help_heading = "Filtering"
    )]
    pub include: Vec<String>,

    #[arg(
        long,
        help = "Exclude files matching this pattern (repeatable).",
        value_name = "PATTERN",
        action = clap::ArgAction::Append,
        help_heading = "Filtering"
    )]
    pub exclude: Vec<String>,

    #[arg(
        long,
        help = "Add an include pattern on top of the configured ones (repeatable).",
        value_name = "PATTERN",
        action = clap::ArgAction::Append,
        help_heading = "Filtering"
    )]
    pub include_extra: Vec<String>,

    #[arg(
        long,
        help = "Add an exclude pattern on top of the configured ones (repeatable).",
        value_name = "PATTERN",
        action = clap::ArgAction::Append,
        help_heading = "Filtering"
    )]
    pub exclude_extra: Vec<String>,
}
