/// Posted to the error channel by any stage whose per-job work panicked or
/// returned an error; consumed by the dedicated error-consumer task that
/// transitions the job to `failed` (§4.3 "Failure semantics").
#[derive(Debug, Clone)]
pub struct StageError {
    pub stage: &'static str,
    pub video_id: String,
    pub cause: String,
}

impl std::fmt::Display for StageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} failed for {}: {}", self.stage, self.video_id, self.cause)
    }
}
