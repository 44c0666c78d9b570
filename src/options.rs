use super::*;

#[derive(Clone, Default, Debug, Parser)]
pub struct Options {
    #[arg(long, help = "Load configuration from <CONFIG>.")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Connect to daemon RPC on <RPC_HOST>. [default: 127.0.0.1]")]
    pub rpc_host: Option<String>,

    #[arg(long, help = "Connect to daemon RPC at <RPC_PORT>. [default: 18888]")]
    pub rpc_port: Option<u16>,

    #[arg(long, help = "Authenticate to daemon RPC as <RPC_USERNAME>.")]
    pub rpc_username: Option<String>,

    #[arg(long, help = "Authenticate to daemon RPC with <RPC_PASSWORD>.")]
    pub rpc_password: Option<String>,

    #[arg(long, help = "Pay block rewards to <ADDRESS>.")]
    pub address: Option<String>,

    #[arg(long, help = "Listen for miners on <LISTEN>. [default: 0.0.0.0]")]
    pub listen: Option<String>,

    #[arg(long, help = "Listen for miners on <PORT>. [default: 3000]")]
    pub port: Option<u16>,

    #[arg(long, help = "Give <START_DIFF> to new clients. [default: 1]")]
    pub start_diff: Option<f64>,

    #[arg(
        long,
        help = "Disconnect clients idle for <CONNECTION_TIMEOUT> seconds. [default: 600]"
    )]
    pub connection_timeout: Option<u64>,

    #[arg(long, help = "Put <COINBASE_SIGNATURE> in the coinbase script.")]
    pub coinbase_signature: Option<String>,
}
