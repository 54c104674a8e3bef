use thiserror::Error;

/// Why a model response could not be read as a JSON object.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("response is not valid JSON: {0}")]
    Syntax(#[from] serde_json::Error),

    #[error("response JSON is {found}, expected an object")]
    NotAnObject { found: &'static str },
}
