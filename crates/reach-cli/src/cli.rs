use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use reach_oid::OidKind;

#[derive(Parser)]
#[command(
    name = "reach",
    about = "Object identities and persistence by reachability",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum KindArg {
    Root,
    Aggregated,
    Collection,
}

impl From<KindArg> for OidKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Root => OidKind::Root,
            KindArg::Aggregated => OidKind::Aggregated,
            KindArg::Collection => OidKind::Collection,
        }
    }
}

#[derive(Subcommand)]
pub enum Command {
    /// Parse an encoded identity and show its parts
    Decode(DecodeArgs),
    /// Build an encoded identity from its parts
    Encode(EncodeArgs),
    /// Compare two observations of an object
    Compare(CompareArgs),
    /// Show the create commands that persisting a graph would issue
    Plan(PlanArgs),
}

#[derive(Args)]
pub struct DecodeArgs {
    pub oid: String,
    /// Fail unless the identity is of this kind
    #[arg(long)]
    pub kind: Option<KindArg>,
}

#[derive(Args)]
pub struct EncodeArgs {
    #[arg(long = "type")]
    pub object_type: String,
    #[arg(long)]
    pub id: String,
    #[arg(long)]
    pub transient: bool,
    #[arg(long)]
    pub sequence: Option<i64>,
    #[arg(long, requires = "sequence")]
    pub user: Option<String>,
    #[arg(long, requires = "sequence")]
    pub utc: Option<i64>,
    /// Aggregated segment `TYPE:LOCAL_ID`, outermost first
    #[arg(long = "aggregate", value_name = "TYPE:ID")]
    pub aggregates: Vec<String>,
    #[arg(long)]
    pub collection: Option<String>,
}

#[derive(Args)]
pub struct CompareArgs {
    pub left: String,
    pub right: String,
}

#[derive(Args)]
pub struct PlanArgs {
    /// JSON graph description
    pub graph: PathBuf,
    /// Store configuration (TOML)
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Commit the planned commands and show the stored versions
    #[arg(long)]
    pub commit: bool,
}
