use {
    anyhow::{Context, Error, anyhow, bail, ensure},
    arguments::Arguments,
    async_trait::async_trait,
    bitcoin::{
        Target, base58,
        hashes::{Hash, sha256d},
    },
    broadcast_timer::BroadcastTimer,
    byteorder::{BigEndian, ByteOrder, LittleEndian, WriteBytesExt},
    clap::Parser,
    coinbase::Coinbase,
    coinbase_builder::CoinbaseBuilder,
    connection::Connection,
    counters::{ExtraNonceCounter, JobCounter, SubscriptionCounter},
    dashmap::DashMap,
    difficulty::{
        DIFF1, POOL_MULTIPLIER, difficulty, round_to, target_from_bits, target_from_difficulty,
    },
    encoding::{
        address_to_script, hex_to_le, le_to_hex, pack_var_int, serialize_number, serialize_string,
        sha256d,
    },
    founders::Founders,
    futures::{SinkExt, StreamExt},
    job::{Job, JobConfig},
    job_manager::{JobManager, Transition},
    merkle_tree::MerkleTree,
    parking_lot::Mutex,
    primitive_types::U256,
    serde::{Deserialize, Serialize},
    serde_json::{Value, json},
    server::{Command, Server, ServerContext},
    settings::Settings,
    share_processor::{ShareProcessor, Submitter},
    snafu::Snafu,
    std::{
        collections::{BTreeMap, HashMap, HashSet},
        env,
        fs,
        net::{IpAddr, SocketAddr},
        path::PathBuf,
        process,
        sync::{
            Arc, LazyLock,
            atomic::{AtomicBool, AtomicU64, Ordering},
        },
        time::{Duration, SystemTime, UNIX_EPOCH},
    },
    stratum::{
        Authorize, Extranonce, HexBytes, Id, JobId, JsonRpcError, MAX_MESSAGE_SIZE, Message,
        Notify, SetTarget, StratumError, Submit, Subscribe, SubscribeResult, Username,
    },
    tokio::{
        io::{AsyncRead, AsyncWrite},
        net::{TcpListener, TcpStream},
        runtime::Runtime,
        sync::{broadcast, mpsc},
        task::JoinSet,
        time::Instant,
    },
    tokio_util::{
        codec::{FramedRead, FramedWrite, LinesCodec, LinesCodecError},
        sync::CancellationToken,
    },
    tracing::{debug, error, info, warn},
    tracing_appender::non_blocking,
    tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt},
};

#[cfg(test)]
use std::thread;

pub use {
    authorizer::{AllowAll, Authorizer},
    block_template::{BlockTemplate, CoinbaseAux, TemplateTransaction, Znode},
    daemon::{BlockInfo, Daemon, DaemonError, DaemonInfo, RpcClient},
    event::Event,
    mtp::{HEADER_SIZE, MTP_BLOCK_SIZE, MTP_HASH_ROOT_SIZE, MTP_L, MTP_VERSION, MtpVerifier, Unlinked},
    pool::{Pool, PoolConfig, PoolHandle},
    share::Share,
    worker::StratumWorker,
};

mod arguments;
mod authorizer;
mod block_template;
mod broadcast_timer;
mod coinbase;
mod coinbase_builder;
mod connection;
mod counters;
mod daemon;
mod difficulty;
mod encoding;
mod event;
mod founders;
mod job;
mod job_manager;
mod logs;
mod merkle_tree;
mod mtp;
mod options;
mod pool;
mod server;
pub mod settings;
mod share;
mod share_processor;
mod signal;
mod subcommand;
mod worker;

/// Miner-chosen extranonce bytes in every coinbase.
pub const EXTRANONCE2_SIZE: usize = 8;
pub const DEFAULT_COINBASE_SIGNATURE: &str = "/MintPond MTP Ref/";

type Result<T = (), E = Error> = std::result::Result<T, E>;

pub fn main() {
    let _guard = logs::init();

    let args = Arguments::parse();

    let runtime = match Runtime::new() {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("error: failed to create tokio runtime: {err}");
            process::exit(1);
        }
    };

    runtime.block_on(async {
        let cancel_token = signal::setup_signal_handler();

        match args.run(cancel_token).await {
            Err(err) => {
                eprintln!("error: {err}");

                for (i, cause) in err.chain().skip(1).enumerate() {
                    if i == 0 {
                        eprintln!();
                        eprintln!("because:");
                    }
                    eprintln!("- {cause}");
                }

                if env::var_os("RUST_BACKTRACE")
                    .map(|val| val == "1")
                    .unwrap_or_default()
                {
                    eprintln!();
                    eprintln!("{}", err.backtrace());
                }
                process::exit(1);
            }
            Ok(_) => {
                process::exit(0);
            }
        }
    });
}
