use thiserror::Error;

#[derive(Error, Debug)]
pub enum VdkError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid data: {0}")]
    InvalidData(String),

    #[error("{kind} {id} not found")]
    MissingParameterSet { kind: &'static str, id: u32 },

    #[error("precondition violated: {0}")]
    Precondition(String),

    #[error("end of stream")]
    EndOfStream,
}

pub type Result<T> = std::result::Result<T, VdkError>;
