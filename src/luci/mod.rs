pub mod fetcher;
pub mod rpc;
pub mod transport;

pub use fetcher::RuleListFetcher;
pub use rpc::{Credentials, LuciClient};
pub use transport::{HttpTransport, RpcTransport};
