//! Blockchain connection collaborator
//!
//! The client only needs to read the active chain id; submitting contract
//! calls with handles and proofs is left to the caller's own stack.

use alloy_primitives::U64;
use alloy_rpc_client::{ClientBuilder, RpcClient};
use alloy_transport::TransportError;
use futures::future::BoxFuture;

use crate::error::{ClientError, Result};

/// Source of the active chain id
pub trait ChainConnection: Send + Sync {
    fn chain_id(&self) -> BoxFuture<'_, Result<u64>>;
}

/// JSON-RPC connection to an EVM node
#[derive(Clone)]
pub struct RpcConnection {
    rpc: RpcClient,
    url: String,
}

impl RpcConnection {
    pub async fn connect(url: &str) -> Result<Self> {
        let rpc = ClientBuilder::default()
            .connect(url)
            .await
            .map_err(chain_error)?;
        Ok(Self {
            rpc,
            url: url.to_string(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl ChainConnection for RpcConnection {
    fn chain_id(&self) -> BoxFuture<'_, Result<u64>> {
        Box::pin(async move {
            let id: U64 = self
                .rpc
                .request_noparams("eth_chainId")
                .await
                .map_err(chain_error)?;
            Ok(id.to::<u64>())
        })
    }
}

fn chain_error(e: TransportError) -> ClientError {
    ClientError::Chain(e.to_string())
}

/// Connection that always reports a fixed chain id
#[derive(Debug, Clone, Copy)]
pub struct StaticChain(pub u64);

impl ChainConnection for StaticChain {
    fn chain_id(&self) -> BoxFuture<'_, Result<u64>> {
        Box::pin(futures::future::ready(Ok(self.0)))
    }
}
