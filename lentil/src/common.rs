#![allow(dead_code)]

pub use log::{debug, info, warn};

pub use crate::error::{LdaError, Result};

pub type Mat = nalgebra::DMatrix<f64>;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Progress bar drawn on stderr; hidden when `visible` is false
pub fn new_progress_bar(len: u64, template: &str, visible: bool) -> ProgressBar {
    let pb = ProgressBar::new(len);
    if !visible {
        pb.set_draw_target(ProgressDrawTarget::hidden());
    }
    let style = ProgressStyle::default_bar()
        .template(template)
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style);
    pb
}
