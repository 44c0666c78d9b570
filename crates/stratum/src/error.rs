use super::*;

pub type Result<T = (), E = InternalError> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum InternalError {
    #[snafu(display("Failed to parse: {message}"))]
    Parse { message: String },
}

/// Share rejection reasons. Every variant is recoverable, the connection stays open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum StratumError {
    #[display("Malformed job id")]
    MalformedJobId,
    #[display("Malformed time")]
    MalformedTime,
    #[display("Malformed nonce")]
    MalformedNonce,
    #[display("Malformed extranonce2")]
    MalformedExtranonce2,
    #[display("Malformed MTP hash root")]
    MalformedMtpHashRoot,
    #[display("Malformed MTP block")]
    MalformedMtpBlock,
    #[display("Malformed MTP proof")]
    MalformedMtpProof,
    #[display("Incorrect size of nonce")]
    IncorrectNonceSize,
    #[display("Incorrect size of extranonce2")]
    IncorrectExtranonce2Size,
    #[display("Incorrect size of ntime")]
    IncorrectTimeSize,
    #[display("Incorrect size of MTP hash root")]
    IncorrectMtpHashRootSize,
    #[display("Incorrect size of MTP block size")]
    IncorrectMtpBlockSize,
    #[display("ntime out of range")]
    TimeOutOfRange,
    #[display("MTP verify failed")]
    MtpVerifyFailed,
    #[display("Stale share - Job not found")]
    Stale,
    #[display("Duplicate share")]
    Duplicate,
    #[display("Low difficulty")]
    LowDifficulty,
    #[display("Unauthorized worker")]
    UnauthorizedWorker,
}

impl StratumError {
    pub fn code(self) -> i32 {
        match self {
            Self::Stale => 21,
            Self::Duplicate => 22,
            Self::LowDifficulty => 23,
            Self::UnauthorizedWorker => 24,
            _ => 20,
        }
    }

    pub fn into_response(self) -> JsonRpcError {
        JsonRpcError {
            error_code: self.code(),
            message: self.to_string(),
            traceback: None,
        }
    }
}

impl std::error::Error for StratumError {}

impl From<StratumError> for JsonRpcError {
    fn from(error: StratumError) -> Self {
        error.into_response()
    }
}

/// Error triple `[code, message, traceback]`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct JsonRpcError {
    pub error_code: i32,
    pub message: String,
    pub traceback: Option<Value>,
}

impl Serialize for JsonRpcError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (&self.error_code, &self.message, &self.traceback).serialize(serializer)
    }
}

impl fmt::Display for JsonRpcError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Stratum error {}: {}", self.error_code, self.message)
    }
}
