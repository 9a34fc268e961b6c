//! Plain-text readers and writers.
//!
//! Inputs may be gzipped (`.gz`). Outputs are whitespace-delimited text, one
//! row per line, so downstream tooling can read them without knowing about
//! the correlation tree.

use crate::common::*;
use crate::corpus::Corpus;

use flate2::read::GzDecoder;
use serde::Serialize;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

///
/// Open a file for reading, and return a buffered reader
/// * `input_file` - file name--either gzipped or not
///
pub fn open_buf_reader(input_file: &str) -> Result<Box<dyn BufRead>> {
    let file = File::open(input_file).map_err(|e| LdaError::io(input_file, e))?;
    let ext = Path::new(input_file).extension().and_then(|x| x.to_str());
    match ext {
        Some("gz") => Ok(Box::new(BufReader::new(GzDecoder::new(file)))),
        _ => Ok(Box::new(BufReader::new(file))),
    }
}

///
/// Open a file for writing, and return a buffered writer
/// * `output_file` - file name--either gzipped or not
///
pub fn open_buf_writer(output_file: &str) -> Result<Box<dyn Write>> {
    let file = File::create(output_file).map_err(|e| LdaError::io(output_file, e))?;
    let ext = Path::new(output_file).extension().and_then(|x| x.to_str());
    match ext {
        Some("gz") => {
            let encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
            Ok(Box::new(BufWriter::new(encoder)))
        }
        _ => Ok(Box::new(BufWriter::new(file))),
    }
}

///
/// Read every line of the input_file into memory, keeping empty lines so
/// that line numbers stay aligned with document indices.
///
pub fn read_lines(input_file: &str) -> Result<Vec<Box<str>>> {
    let buf = open_buf_reader(input_file)?;
    let mut lines = vec![];
    for x in buf.lines() {
        let x = x.map_err(|e| LdaError::io(input_file, e))?;
        lines.push(x.trim_end_matches('\r').to_string().into_boxed_str());
    }
    Ok(lines)
}

///
/// Write every item on its own line
///
pub fn write_types<T>(lines: &[T], output_file: &str) -> Result<()>
where
    T: std::fmt::Display,
{
    let mut buf = open_buf_writer(output_file)?;
    for line in lines {
        writeln!(buf, "{}", line).map_err(|e| LdaError::io(output_file, e))?;
    }
    buf.flush().map_err(|e| LdaError::io(output_file, e))?;
    Ok(())
}

///
/// Write a dense matrix, one space-separated row per line
///
pub fn write_matrix(mat: &Mat, output_file: &str) -> Result<()> {
    let mut buf = open_buf_writer(output_file)?;
    for row in mat.row_iter() {
        let line = row
            .iter()
            .map(|x| x.to_string())
            .collect::<Vec<_>>()
            .join(" ");
        writeln!(buf, "{}", line).map_err(|e| LdaError::io(output_file, e))?;
    }
    buf.flush().map_err(|e| LdaError::io(output_file, e))?;
    Ok(())
}

///
/// Read a dense matrix written by [`write_matrix`]
///
pub fn read_matrix(input_file: &str) -> Result<Mat> {
    let lines = read_lines(input_file)?;
    let mut rows: Vec<Vec<f64>> = Vec::with_capacity(lines.len());
    for (i, line) in lines.iter().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let row = line
            .split_whitespace()
            .map(|x| {
                x.parse::<f64>()
                    .map_err(|_| LdaError::data_at(input_file, i + 1, format!("bad number `{}`", x)))
            })
            .collect::<Result<Vec<_>>>()?;
        if let Some(first) = rows.first() {
            if first.len() != row.len() {
                return Err(LdaError::data_at(
                    input_file,
                    i + 1,
                    format!("expected {} columns, found {}", first.len(), row.len()),
                ));
            }
        }
        rows.push(row);
    }
    let nrow = rows.len();
    let ncol = rows.first().map(|r| r.len()).unwrap_or(0);
    Ok(Mat::from_row_iterator(
        nrow,
        ncol,
        rows.into_iter().flatten(),
    ))
}

/// Space-separated integer rows, one per document
fn rows_to_lines<I, R>(rows: I) -> Vec<Box<str>>
where
    I: IntoIterator<Item = R>,
    R: IntoIterator<Item = usize>,
{
    rows.into_iter()
        .map(|r| {
            r.into_iter()
                .map(|x| x.to_string())
                .collect::<Vec<_>>()
                .join(" ")
                .into_boxed_str()
        })
        .collect()
}

/// Output file names inside the output directory
pub const PHI_FILE: &str = "phi.dat";
pub const THETA_FILE: &str = "theta.dat";
pub const Z_FILE: &str = "z.dat";
pub const PATH_FILE: &str = "path.dat";
pub const TOP_WORDS_FILE: &str = "top_words.txt";
pub const LLIK_FILE: &str = "llik.dat";
pub const OPTIONS_FILE: &str = "options.json";

/// Persists distributions and final token assignments under one directory.
pub struct ResultWriter {
    out_dir: PathBuf,
}

impl ResultWriter {
    /// Create the output directory if needed
    pub fn new(out_dir: &str) -> Result<Self> {
        std::fs::create_dir_all(out_dir).map_err(|e| LdaError::io(out_dir, e))?;
        Ok(Self {
            out_dir: PathBuf::from(out_dir),
        })
    }

    pub fn path(&self, name: &str) -> Box<str> {
        self.out_dir.join(name).to_string_lossy().into()
    }

    /// topic x word
    pub fn write_topic_word(&self, phi: &Mat) -> Result<()> {
        write_matrix(phi, &self.path(PHI_FILE))
    }

    /// document x topic
    pub fn write_doc_topic(&self, theta: &Mat) -> Result<()> {
        write_matrix(theta, &self.path(THETA_FILE))
    }

    /// Final topics (same layout as the input z file) and tree nodes per token
    pub fn write_assignments(&self, corpus: &Corpus) -> Result<()> {
        let topics = rows_to_lines(
            corpus
                .documents()
                .iter()
                .map(|doc| doc.tokens.iter().map(|t| t.topic).collect::<Vec<_>>()),
        );
        write_types(&topics, &self.path(Z_FILE))?;

        let nodes = rows_to_lines(
            corpus
                .documents()
                .iter()
                .map(|doc| doc.tokens.iter().map(|t| t.node).collect::<Vec<_>>()),
        );
        write_types(&nodes, &self.path(PATH_FILE))
    }

    pub fn write_top_words(&self, top_words: &[Vec<Box<str>>]) -> Result<()> {
        let lines: Vec<Box<str>> = top_words
            .iter()
            .map(|words| words.join(" ").into_boxed_str())
            .collect();
        write_types(&lines, &self.path(TOP_WORDS_FILE))
    }

    pub fn write_trace(&self, trace: &mcmc_util::McmcTrace) -> Result<()> {
        write_types(&trace.to_lines(), &self.path(LLIK_FILE))
    }

    pub fn write_json<T: Serialize>(&self, name: &str, value: &T) -> Result<()> {
        let path = self.path(name);
        let json = serde_json::to_string_pretty(value)
            .map_err(|e| LdaError::Data(format!("failed to serialize {}: {}", path, e)))?;
        write_types(&[json], &path)
    }
}

/// Write one line per document with a topic per token (the z file layout)
pub fn write_topic_assignments(topics: &[Vec<usize>], output_file: &str) -> Result<()> {
    let lines = rows_to_lines(topics.iter().map(|r| r.iter().copied()));
    write_types(&lines, output_file)
}
