use clap::Args;
use lentil::{Estimator, LdaOptions};
use log::info;
use rayon::ThreadPoolBuilder;

#[derive(Args, Debug)]
pub struct TrainArgs {
    #[arg(
        short = 'f',
        long = "data-file",
        required = true,
        help = "Bag-of-words data file",
        long_help = "Bag-of-words data file (plain or gzipped). \n\
		     One document per line, words separated by whitespace. \n\
		     Every word must appear in the vocabulary file."
    )]
    data_file: Box<str>,

    #[arg(
        short = 'v',
        long = "vocab-file",
        required = true,
        help = "Vocabulary file",
        long_help = "Vocabulary file, one word per line. \n\
		     The (0-based) line number is the word id."
    )]
    vocab_file: Box<str>,

    #[arg(
        short = 'c',
        long = "cluster-file",
        required = true,
        help = "Word cluster file",
        long_help = "Word clusters, one cluster per line. \n\
		     Words are separated by commas; blank entries are ignored. \n\
		     A word may belong to at most one cluster."
    )]
    cluster_file: Box<str>,

    #[arg(
        short = 'z',
        long = "z-file",
        required = true,
        help = "Initial topic assignments",
        long_help = "Initial topic assignments aligned with the data file: \n\
		     one line per document, one topic id per token. \n\
		     See the `random-init` subcommand."
    )]
    z_file: Box<str>,

    #[arg(short = 't', long = "num-topics", required = true, help = "Number of topics")]
    num_topics: usize,

    #[arg(
        short = 'w',
        long = "num-words",
        required = true,
        help = "Vocabulary size",
        long_help = "Vocabulary size. Must match the number of lines in the vocabulary file."
    )]
    num_words: usize,

    #[arg(
        short = 'a',
        long,
        required = true,
        help = "Document-topic smoothing (alpha > 0)"
    )]
    alpha: f64,

    #[arg(
        short = 'b',
        long,
        required = true,
        help = "Word smoothing (beta > 0)",
        long_help = "Prior weight of each leaf (individual word) in the correlation tree."
    )]
    beta: f64,

    #[arg(
        short = 'e',
        long,
        required = true,
        help = "Cluster smoothing (eta > 0)",
        long_help = "Prior weight of each cluster node in the correlation tree. \n\
		     Larger values tie the words of a cluster together more strongly."
    )]
    eta: f64,

    #[arg(short = 'n', long, required = true, help = "Number of Gibbs sweeps")]
    epochs: usize,

    #[arg(short = 'r', long, required = true, help = "Random seed")]
    seed: u64,

    #[arg(
        short = 'o',
        long,
        required = true,
        help = "Output directory",
        long_help = "Output directory, created if missing. \n\
		     Receives phi.dat, theta.dat, z.dat, path.dat, \n\
		     top_words.txt, llik.dat and options.json."
    )]
    out: Box<str>,

    #[arg(
        long,
        default_value_t = false,
        help = "Parallel sweeps",
        long_help = "Compute proposals for all tokens in parallel against \n\
		     the counts at the start of each sweep. \n\
		     Reproducible for a fixed seed, but a different chain \n\
		     from the default sequential sampler."
    )]
    parallel: bool,

    #[arg(
        long,
        default_value_t = 16,
        help = "Maximum number of threads",
        long_help = "Maximum number of threads (only used with --parallel)."
    )]
    threads: usize,

    #[arg(long = "log-every", default_value_t = 10, help = "Sweeps between log-likelihood reports")]
    log_every: usize,

    #[arg(long = "top-words", default_value_t = 20, help = "Words per topic in top_words.txt")]
    top_words: usize,

    #[arg(
        long,
        help = "verbosity",
        long_help = "Enable verbose output `RUST_LOG=info`"
    )]
    verbose: bool,
}

impl TrainArgs {
    fn options(&self) -> LdaOptions {
        LdaOptions {
            num_topics: self.num_topics,
            num_words: self.num_words,
            alpha: self.alpha,
            beta: self.beta,
            eta: self.eta,
            epochs: self.epochs,
            seed: self.seed,
            parallel: self.parallel,
            log_every: self.log_every,
            num_top_words: self.top_words,
        }
    }
}

/// Fit the model and write all results under `--out`
///
pub fn run_train(args: &TrainArgs) -> anyhow::Result<()> {
    if args.verbose {
        std::env::set_var("RUST_LOG", "info");
    }
    env_logger::init();

    if args.parallel {
        let max_threads = num_cpus::get().min(args.threads).max(1);
        ThreadPoolBuilder::new()
            .num_threads(max_threads)
            .build_global()?;
        info!("will use {} threads", rayon::current_num_threads());
    }

    let mut estimator = Estimator::new(args.options())?;
    estimator.load(&args.data_file, &args.vocab_file, &args.cluster_file, &args.z_file)?;
    estimator.estimate()?;
    estimator.save(&args.out)?;
    Ok(())
}
