use {
    byteorder::{ByteOrder, LittleEndian},
    derive_more::Display,
    serde::{
        Deserialize, Serialize, Serializer,
        de::{self, Deserializer},
        ser::SerializeSeq,
    },
    serde_json::Value,
    serde_with::{DeserializeFromStr, SerializeDisplay},
    snafu::Snafu,
    std::{
        fmt::{self, Formatter},
        str::FromStr,
    },
};

#[cfg(test)]
use serde_json::json;

pub use {
    authorize::Authorize,
    error::{InternalError, JsonRpcError, Result, StratumError},
    extranonce::Extranonce,
    hex_bytes::HexBytes,
    job_id::JobId,
    message::{Id, Message},
    notify::Notify,
    set_target::SetTarget,
    submit::Submit,
    subscribe::{Subscribe, SubscribeResult},
    username::Username,
};

#[cfg(feature = "client")]
pub use client::{Client, ClientError};

/// Longest newline-delimited message either side accepts. MTP submissions carry a 128 KiB block
/// and a proof of similar size, both hex encoded.
pub const MAX_MESSAGE_SIZE: usize = 1024 * 1024;

mod authorize;
mod error;
mod extranonce;
mod hex_bytes;
mod job_id;
mod message;
mod notify;
mod set_target;
mod submit;
mod subscribe;
mod username;

#[cfg(feature = "client")]
mod client;
