use lentil::io::*;
use lentil::{Cluster, Estimator, LdaOptions, SamplerState, Vocabulary};
use std::path::Path;

fn toy_options(seed: u64, epochs: usize) -> LdaOptions {
    LdaOptions {
        num_topics: 2,
        num_words: 4,
        alpha: 0.1,
        beta: 0.1,
        eta: 0.5,
        epochs,
        seed,
        log_every: 10,
        num_top_words: 3,
        ..Default::default()
    }
}

/// vocabulary {a,b,c,d}, cluster {a,b}, documents "a c" and "b d"
fn write_toy_inputs(dir: &Path, cluster_line: &str) -> anyhow::Result<[String; 4]> {
    let data = dir.join("docs.bow");
    let vocab = dir.join("vocab.txt");
    let cluster = dir.join("clusters.txt");
    let z = dir.join("z0.dat");
    std::fs::write(&data, "a c\nb d\n")?;
    std::fs::write(&vocab, "a\nb\nc\nd\n")?;
    std::fs::write(&cluster, format!("{}\n", cluster_line))?;
    std::fs::write(&z, "0 1\n1 0\n")?;
    Ok([data, vocab, cluster, z].map(|p| p.to_string_lossy().into_owned()))
}

fn train(options: LdaOptions, inputs: &[String; 4], out: &str) -> lentil::Result<Estimator> {
    let mut est = Estimator::new(options)?;
    est.load(&inputs[0], &inputs[1], &inputs[2], &inputs[3])?;
    est.estimate()?;
    est.save(out)?;
    Ok(est)
}

#[test]
fn toy_corpus_end_to_end() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let inputs = write_toy_inputs(dir.path(), "a,b,")?;
    let out = dir.path().join("out");
    let out = out.to_str().unwrap();

    let est = train(toy_options(42, 50), &inputs, out)?;
    assert_eq!(est.state(), SamplerState::Converged);

    let phi = read_matrix(&format!("{}/{}", out, PHI_FILE))?;
    assert_eq!(phi.shape(), (2, 4));
    for k in 0..2 {
        approx::assert_abs_diff_eq!(phi.row(k).sum(), 1.0, epsilon = 1e-6);
    }

    let theta = read_matrix(&format!("{}/{}", out, THETA_FILE))?;
    assert_eq!(theta.shape(), (2, 2));
    for d in 0..2 {
        approx::assert_abs_diff_eq!(theta.row(d).sum(), 1.0, epsilon = 1e-6);
    }

    let z = read_lines(&format!("{}/{}", out, Z_FILE))?;
    assert_eq!(z.len(), 2);
    for line in z.iter() {
        let topics: Vec<usize> = line.split_whitespace().map(|x| x.parse()).collect::<Result<_, _>>()?;
        assert_eq!(topics.len(), 2);
        assert!(topics.iter().all(|&k| k < 2));
    }

    // the final z file is a valid initial z file
    let words = lentil::corpus::read_bag_of_words(&inputs[0], est.vocabulary().unwrap())?;
    lentil::corpus::read_topic_assignments(&format!("{}/{}", out, Z_FILE), &words, 2)?;

    let tree = est.tree().unwrap();
    let paths = read_lines(&format!("{}/{}", out, PATH_FILE))?;
    for (line, doc) in paths.iter().zip(words.iter()) {
        let nodes: Vec<usize> = line.split_whitespace().map(|x| x.parse()).collect::<Result<_, _>>()?;
        for (n, &w) in nodes.iter().zip(doc.iter()) {
            assert!(tree.nodes_above(w).contains(n));
        }
    }

    let top = read_lines(&format!("{}/{}", out, TOP_WORDS_FILE))?;
    assert_eq!(top.len(), 2);
    assert!(top.iter().all(|x| x.split_whitespace().count() == 3));

    let llik = read_lines(&format!("{}/{}", out, LLIK_FILE))?;
    assert_eq!(llik.len(), 1 + 5);

    let options: LdaOptions =
        serde_json::from_str(&std::fs::read_to_string(format!("{}/{}", out, OPTIONS_FILE))?)?;
    assert_eq!(options, toy_options(42, 50));
    Ok(())
}

#[test]
fn same_seed_gives_identical_files() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let inputs = write_toy_inputs(dir.path(), "a,b")?;

    for parallel in [false, true] {
        let tag = if parallel { "par" } else { "seq" };
        let out1 = dir.path().join(format!("{}_1", tag));
        let out2 = dir.path().join(format!("{}_2", tag));
        let options = LdaOptions {
            parallel,
            ..toy_options(7, 30)
        };
        train(options.clone(), &inputs, out1.to_str().unwrap())?;
        train(options, &inputs, out2.to_str().unwrap())?;

        for name in [PHI_FILE, THETA_FILE, Z_FILE, PATH_FILE, TOP_WORDS_FILE, LLIK_FILE, OPTIONS_FILE] {
            let x = std::fs::read(out1.join(name))?;
            let y = std::fs::read(out2.join(name))?;
            assert_eq!(x, y, "{} differs ({})", name, tag);
        }
    }
    Ok(())
}

#[test]
fn unknown_cluster_word_is_rejected_before_sampling() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let inputs = write_toy_inputs(dir.path(), "a,zebra")?;
    let out = dir.path().join("out");

    let mut est = Estimator::new(toy_options(42, 10))?;
    let err = est
        .load(&inputs[0], &inputs[1], &inputs[2], &inputs[3])
        .unwrap_err();
    assert!(err.is_constraint(), "{}", err);
    assert!(err.to_string().contains("zebra"));

    assert_eq!(est.state(), SamplerState::Uninitialized);
    assert!(est.counts().is_none());
    assert!(est.estimate().is_err());
    assert!(est.save(out.to_str().unwrap()).is_err());
    assert!(!out.exists());
    Ok(())
}

#[test]
fn overlapping_clusters_are_rejected() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let inputs = write_toy_inputs(dir.path(), "a,b\nb,c")?;
    let out = dir.path().join("out");

    let err = train(toy_options(42, 10), &inputs, out.to_str().unwrap()).err().unwrap();
    assert!(err.is_constraint(), "{}", err);
    assert!(!out.exists());
    Ok(())
}

#[test]
fn bad_hyperparameters_are_config_errors() {
    for options in [
        LdaOptions { alpha: 0.0, ..toy_options(1, 1) },
        LdaOptions { beta: -1.0, ..toy_options(1, 1) },
        LdaOptions { eta: f64::INFINITY, ..toy_options(1, 1) },
        LdaOptions { num_topics: 0, ..toy_options(1, 1) },
    ] {
        assert!(Estimator::new(options).err().unwrap().is_config());
    }
}

#[test]
fn vocabulary_size_must_match() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let inputs = write_toy_inputs(dir.path(), "a,b")?;
    let mut est = Estimator::new(LdaOptions {
        num_words: 5,
        ..toy_options(1, 1)
    })?;
    let err = est.load(&inputs[0], &inputs[1], &inputs[2], &inputs[3]).unwrap_err();
    assert!(err.is_data());
    Ok(())
}

/// Words tied by a cluster end up with closer per-topic probabilities than
/// an unclustered pair in the same position. Averaged over a block of seeds
/// since a single short chain is noisy.
#[test]
fn clustered_words_stay_together() -> anyhow::Result<()> {
    let mut gap_clustered = 0.0;
    let mut gap_free = 0.0;

    for seed in 42..74 {
        let vocab = Vocabulary::from_words(["a", "b", "c", "d"])?;
        let mut est = Estimator::from_parts(
            toy_options(seed, 50),
            vocab,
            &[Cluster::new("ab", vec![0, 1])],
            vec![vec![0, 2], vec![1, 3]],
            vec![vec![0, 1], vec![1, 0]],
        )?;
        est.estimate()?;
        let phi = est.topic_word_distribution()?;

        let max_gap = |x: usize, y: usize| {
            (0..phi.nrows())
                .map(|k| (phi[(k, x)] - phi[(k, y)]).abs())
                .fold(0.0, f64::max)
        };
        gap_clustered += max_gap(0, 1);
        gap_free += max_gap(2, 3);
    }

    assert!(
        gap_clustered < gap_free,
        "clustered gap {} >= unclustered gap {}",
        gap_clustered,
        gap_free
    );
    Ok(())
}
