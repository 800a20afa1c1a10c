use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoadError {
  #[error("Failed to read project: {0}")]
  Io(#[from] std::io::Error),
  #[error("Failed to parse project: {0}")]
  Json(#[from] serde_json::Error),
  #[error("Project has no targets")]
  NoTargets,
  #[error("Bad input {input} on block {block}: {reason}")]
  BadInput {
    block: String,
    input: String,
    reason: String,
  },
}
