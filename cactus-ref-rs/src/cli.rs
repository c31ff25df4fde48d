use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "cactus-ref-rs",
    about = "Anneal pairwise alignments (pinches) into blocks over a set of threads",
    version
)]
pub struct Args {
    /// Pinch table: name1, start1, name2, start2, length, strand (+/-)
    pub pinches: PathBuf,

    /// Thread table: name, start, length
    #[arg(short = 't', long = "threads", value_name = "TSV")]
    pub threads: PathBuf,

    /// Output block table (default: stdout)
    #[arg(short = 'o', long = "out", value_name = "TSV")]
    pub out: Option<PathBuf>,

    /// Only merge aligned bases lying in the same adjacency component
    #[arg(long)]
    pub restrict_to_components: bool,

    /// Set logging level to WARN
    #[arg(short = 'q', long)]
    pub quiet: bool,
}
