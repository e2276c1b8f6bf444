use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

const BAR_TEMPLATE: &str = "{prefix:>10.cyan.bold} [{bar:30.green/white.dim}] {pos}/{len} {wide_msg}";
const BAR_CHARS: &str = "=> ";

/// A stderr progress bar for `total` files; hidden when `hidden` is set
/// (single-file runs and `--quiet`).
pub fn file_progress(total: u64, hidden: bool) -> ProgressBar {
    if hidden {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::with_draw_target(Some(total), ProgressDrawTarget::stderr());
    match ProgressStyle::with_template(BAR_TEMPLATE) {
        Ok(style) => pb.set_style(style.progress_chars(BAR_CHARS)),
        Err(_) => pb.set_style(ProgressStyle::default_bar()),
    }
    pb.set_prefix("Converting");
    pb
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bar_template_is_valid() {
        assert!(ProgressStyle::with_template(BAR_TEMPLATE).is_ok());
    }

    #[test]
    fn hidden_bar_still_counts() {
        let pb = file_progress(3, true);
        pb.inc(2);
        assert_eq!(pb.position(), 2);
        assert!(pb.is_hidden());
    }
}
