pub mod gemini;
pub mod news;
pub mod signal;
pub mod vision;

pub use gemini::GeminiService;
pub use news::NewsAggregator;
pub use signal::{GeminiSignalGenerator, SignalGenerator};
pub use vision::{GeminiVision, VisionSummarizer};

/// Language name the model is asked to answer in.
pub(crate) fn language_name(locale: &str) -> &'static str {
    match locale {
        "fa" => "Persian",
        _ => "English",
    }
}
