use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use log::{error, info};

use cafekit::config::RemoveTaxaConfig;
use cafekit::errors::Result;
use cafekit::pipeline::{self, ExtractConfig, SignificanceConfig};
use cafekit::{ColumnMatch, LabelMatch, Mode, Op, RemoveTaxaOp};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliMode {
    /// Only the most expanded families
    Expand,
    /// Only the most contracted families
    Contract,
    /// Both, expansions first
    Both,
}

impl From<CliMode> for Mode {
    fn from(mode: CliMode) -> Self {
        match mode {
            CliMode::Expand => Mode::Expand,
            CliMode::Contract => Mode::Contract,
            CliMode::Both => Mode::Both,
        }
    }
}

#[derive(Parser)]
#[command(name = "cafekit")]
#[command(version, about = "Summaries of CAFE gene family results and locus taxon filtering", long_about = None)]
struct Cli {
    /// Log debug messages
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract the top expanded/contracted families of a taxon with genes and annotations
    TopFamilies {
        /// CAFE change table (e.g. Base_change.tab)
        #[arg(short = 'b', long = "base_change")]
        base_change: PathBuf,

        /// Family copy number matrix (e.g. Orthogroups.GeneCount.tsv)
        #[arg(short, long)]
        matrix: PathBuf,

        /// Orthogroups.tsv (family -> gene lists)
        #[arg(short, long)]
        orthogroups: PathBuf,

        /// Annotation table, protein FASTA or GFF3
        #[arg(short, long)]
        annotation: Option<PathBuf>,

        /// Directory of per-species annotation files, used when --annotation yields nothing
        #[arg(short, long)]
        gffdir: Option<PathBuf>,

        /// Target taxon, matched against column names ignoring case (e.g. Siler_cupreus)
        #[arg(short, long)]
        taxon: String,

        /// Number of families per direction
        #[arg(short = 'n', long, default_value_t = 20)]
        topn: usize,

        #[arg(long, value_enum, default_value_t = CliMode::Both)]
        mode: CliMode,

        /// Output directory
        #[arg(short = 'd', long)]
        outdir: PathBuf,

        /// Fail when several columns match the taxon instead of using the first
        #[arg(long)]
        strict_columns: bool,
    },

    /// Append significant expansion/contraction counts to tree node labels
    SigTree {
        #[arg(long, default_value = "Gamma_family_results.txt")]
        results: PathBuf,

        #[arg(long, default_value = "Gamma_change.tab")]
        change: PathBuf,

        #[arg(long, default_value = "cleaned_tree.txt")]
        tree: PathBuf,

        #[arg(short, long, default_value = "cleaned_tree_sig0.05_only.txt")]
        output: PathBuf,

        /// Replace every literal occurrence of a node name, even inside longer names
        #[arg(long)]
        substring_labels: bool,
    },

    /// Restrict the change matrix to significant families
    SigFilter {
        #[arg(long, default_value = "Gamma_family_results.txt")]
        results: PathBuf,

        #[arg(long, default_value = "Gamma_change.tab")]
        change: PathBuf,

        #[arg(short, long, default_value = "Gamma_change_sig0.05.tsv")]
        output: PathBuf,
    },

    /// Remove records of the given taxa from every locus FASTA file in a directory
    RemoveTaxa {
        /// YAML config with input_dir, output_dir and remove_taxa
        #[arg(short, long)]
        config: Option<PathBuf>,

        #[arg(short, long)]
        input_dir: Option<PathBuf>,

        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Taxon to remove (repeatable); replaces the configured list
        #[arg(short, long = "remove")]
        remove: Vec<String>,
    },
}

fn run(command: Commands) -> Result<()> {
    match command {
        Commands::TopFamilies {
            base_change,
            matrix,
            orthogroups,
            annotation,
            gffdir,
            taxon,
            topn,
            mode,
            outdir,
            strict_columns,
        } => {
            let config = ExtractConfig {
                base_change,
                matrix,
                orthogroups,
                annotation,
                gffdir,
                taxon,
                topn,
                mode: mode.into(),
                outdir,
                column_match: if strict_columns {
                    ColumnMatch::Strict
                } else {
                    ColumnMatch::Lenient
                },
            };
            let report = pipeline::extract_top_families(&config)?;
            info!(
                "Done: {} families, {} genes, {} annotations, {} files written",
                report.families_selected,
                report.genes,
                report.annotations,
                report.written.len()
            );
        }
        Commands::SigTree {
            results,
            change,
            tree,
            output,
            substring_labels,
        } => {
            let config = SignificanceConfig { results, change };
            let label_match = if substring_labels {
                LabelMatch::Substring
            } else {
                LabelMatch::Bounded
            };
            pipeline::label_tree(&config, tree, output, label_match)?;
        }
        Commands::SigFilter {
            results,
            change,
            output,
        } => {
            let config = SignificanceConfig { results, change };
            pipeline::filter_significant(&config, output)?;
        }
        Commands::RemoveTaxa {
            config,
            input_dir,
            output_dir,
            remove,
        } => {
            let mut config = match config {
                Some(path) => RemoveTaxaConfig::from_file(path)?,
                None => RemoveTaxaConfig::default(),
            };
            if let Some(dir) = input_dir {
                config.input_dir = dir;
            }
            if let Some(dir) = output_dir {
                config.output_dir = dir;
            }
            if !remove.is_empty() {
                config.remove_taxa = remove;
            }

            info!("Removing taxa: {}", config.remove_taxa.join(", "));
            RemoveTaxaOp::new(&config.input_dir, &config.output_dir, &config.remove_taxa).run()?;
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    cafekit::logging::init(cli.verbose);

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            let mut source = std::error::Error::source(&e);
            while let Some(cause) = source {
                error!("  caused by: {cause}");
                source = cause.source();
            }
            ExitCode::FAILURE
        }
    }
}
