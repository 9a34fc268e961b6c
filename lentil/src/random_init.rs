use clap::Args;
use lentil::corpus::{random_topics, read_bag_of_words};
use lentil::io::write_topic_assignments;
use lentil::Vocabulary;
use log::info;
use rand::rngs::SmallRng;
use rand::SeedableRng;

#[derive(Args, Debug)]
pub struct RandomInitArgs {
    #[arg(
        short = 'f',
        long = "data-file",
        required = true,
        help = "Bag-of-words data file"
    )]
    data_file: Box<str>,

    #[arg(short = 'v', long = "vocab-file", required = true, help = "Vocabulary file")]
    vocab_file: Box<str>,

    #[arg(short = 't', long = "num-topics", required = true, help = "Number of topics")]
    num_topics: usize,

    #[arg(short = 'w', long = "num-words", required = true, help = "Vocabulary size")]
    num_words: usize,

    #[arg(short = 'r', long, default_value_t = 42, help = "Random seed")]
    seed: u64,

    #[arg(
        short = 'o',
        long,
        required = true,
        help = "Output z file",
        long_help = "Output assignment file (append .gz to compress): \n\
		     one line per document, one topic id per token."
    )]
    out: Box<str>,

    #[arg(
        long,
        help = "verbosity",
        long_help = "Enable verbose output `RUST_LOG=info`"
    )]
    verbose: bool,
}

/// Uniformly random topic per token, aligned with the data file
///
pub fn run_random_init(args: &RandomInitArgs) -> anyhow::Result<()> {
    if args.verbose {
        std::env::set_var("RUST_LOG", "info");
    }
    env_logger::init();

    if args.num_topics == 0 {
        return Err(anyhow::anyhow!("number of topics must be positive"));
    }

    let vocab = Vocabulary::from_file(&args.vocab_file, args.num_words)?;
    let words = read_bag_of_words(&args.data_file, &vocab)?;

    let mut rng = SmallRng::seed_from_u64(args.seed);
    let topics = random_topics(&words, args.num_topics, &mut rng);
    write_topic_assignments(&topics, &args.out)?;

    info!("wrote {} rows of random topics to {}", topics.len(), args.out);
    Ok(())
}
