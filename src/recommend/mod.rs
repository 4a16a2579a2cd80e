use indicatif::{ProgressBar, ProgressStyle};

pub mod item_based;
pub mod popularity;
pub mod user_based;

pub use item_based::item_based;
pub use popularity::popularity;
pub use user_based::user_based;

fn progress_bar(len: usize, message: &'static str, show_progress: bool) -> ProgressBar {
    if !show_progress {
        return ProgressBar::hidden();
    }
    let progress = ProgressBar::new(len as u64);
    progress.set_style(
        ProgressStyle::default_bar().template("{msg} [{elapsed_precise}] {bar:40} {pos}/{len}"),
    );
    progress.set_message(message);
    progress
}
