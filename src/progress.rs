//! Progress bars shared by the hashing and thumbnail stages

use indicatif::{ProgressBar, ProgressStyle};

/// A bar for `len` items, or a hidden one when progress is off or there is
/// at most one item.
pub fn bar(len: usize, label: &str, show: bool) -> ProgressBar {
    if !show || len <= 1 {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new(len as u64);
    let template = format!("{{spinner:.green}} [{{bar:40.cyan/blue}}] {{pos}}/{{len}} {label} {{msg}}");
    let style = ProgressStyle::default_bar()
        .template(&template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=>-");
    pb.set_style(style);
    pb
}
