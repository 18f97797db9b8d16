mod chat;
mod config;
mod media;
mod summarize;
mod transcribe;

pub use chat::HttpChatModel;
pub use config::HttpAdapterConfig;
pub use media::HttpMediaAcquirer;
pub use summarize::HttpSummarizer;
pub use transcribe::HttpTranscriber;
