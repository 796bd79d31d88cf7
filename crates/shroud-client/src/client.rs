//! FHE client: lazy engine lifecycle, typed encryption and decryption

use std::sync::Arc;
use std::time::{Duration, Instant};

use alloy_primitives::{Address, Bytes};
use tokio::sync::OnceCell;
use tracing::{debug, info};

use shroud_core::{ClientSettings, NetworkProfile, Plaintext, RawValue, TypeTag, TypedValue};

use crate::chain::ChainConnection;
use crate::codec;
use crate::decrypt::{self, DecryptionRequest, LocalRequestIds, PollOptions, RequestIdSource};
use crate::engine::{EncryptedScalar, EngineFactory, EngineParams};
use crate::error::{ClientError, Result};
use crate::gateway::GatewayClient;
use crate::input::InputBuilder;
use crate::metrics;

/// Per-client configuration, read-only once the client exists
#[derive(Clone)]
pub struct ClientConfig {
    pub profile: NetworkProfile,
    /// Optional chain connection used to confirm the chain id
    pub connection: Option<Arc<dyn ChainConnection>>,
    pub gateway_override: Option<String>,
    pub acl_override: Option<Address>,
    pub verifier_override: Option<Address>,
    /// Timeout for each individual gateway HTTP call
    pub http_timeout: Duration,
    /// Poll timing used by [`Client::decrypt`]
    pub poll: PollOptions,
}

impl ClientConfig {
    pub fn new(profile: NetworkProfile) -> Self {
        Self {
            profile,
            connection: None,
            gateway_override: None,
            acl_override: None,
            verifier_override: None,
            http_timeout: Duration::from_secs(10),
            poll: PollOptions::default(),
        }
    }

    /// Build from persisted settings, resolving the network key
    pub fn from_settings(settings: &ClientSettings) -> Result<Self> {
        let mut config = Self::new(settings.profile()?);
        config.gateway_override = settings.gateway_url.clone();
        config.acl_override = settings.acl_address;
        config.verifier_override = settings.verifier_address;
        config.http_timeout = Duration::from_millis(settings.http_timeout_ms);
        config.poll = PollOptions::new(
            Duration::from_millis(settings.decrypt_timeout_ms),
            Duration::from_millis(settings.poll_interval_ms),
        );
        Ok(config)
    }

    pub fn with_gateway(mut self, url: impl Into<String>) -> Self {
        self.gateway_override = Some(url.into());
        self
    }

    pub fn with_acl(mut self, acl: Address) -> Self {
        self.acl_override = Some(acl);
        self
    }

    pub fn with_verifier(mut self, verifier: Address) -> Self {
        self.verifier_override = Some(verifier);
        self
    }

    pub fn with_connection(mut self, connection: impl ChainConnection + 'static) -> Self {
        self.connection = Some(Arc::new(connection));
        self
    }

    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }

    pub fn with_poll_options(mut self, poll: PollOptions) -> Self {
        self.poll = poll;
        self
    }

    /// Effective gateway endpoint: override first, then the profile's
    pub fn gateway_url(&self) -> Option<&str> {
        self.gateway_override
            .as_deref()
            .or(self.profile.gateway_url.as_deref())
    }

    pub fn acl_address(&self) -> Option<Address> {
        self.acl_override.or(self.profile.acl_address)
    }

    pub fn verifier_address(&self) -> Option<Address> {
        self.verifier_override.or(self.profile.verifier_address)
    }
}

/// Engine handle plus the gateway it was initialized against
struct EngineState<E> {
    engine: Arc<E>,
    gateway: GatewayClient,
}

/// Client over one network, owning at most one engine handle
///
/// The engine is created on the first operation that needs it. Concurrent
/// first calls share a single in-flight initialization; a failed attempt
/// leaves the client uninitialized so a later call can retry.
pub struct Client<F: EngineFactory> {
    config: ClientConfig,
    factory: Arc<F>,
    state: OnceCell<EngineState<F::Engine>>,
    request_ids: Arc<dyn RequestIdSource>,
}

impl<F: EngineFactory> Client<F> {
    pub fn new(config: ClientConfig, factory: F) -> Self {
        Self {
            config,
            factory: Arc::new(factory),
            state: OnceCell::new(),
            request_ids: Arc::new(LocalRequestIds::new()),
        }
    }

    /// Replace the request id source
    pub fn with_request_ids(mut self, source: impl RequestIdSource + 'static) -> Self {
        self.request_ids = Arc::new(source);
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn is_initialized(&self) -> bool {
        self.state.initialized()
    }

    /// Initialize the engine now instead of on first use
    pub async fn init(&self) -> Result<()> {
        self.state().await.map(|_| ())
    }

    async fn state(&self) -> Result<&EngineState<F::Engine>> {
        self.state.get_or_try_init(|| self.init_engine()).await
    }

    pub(crate) async fn engine(&self) -> Result<Arc<F::Engine>> {
        Ok(Arc::clone(&self.state().await?.engine))
    }

    async fn init_engine(&self) -> Result<EngineState<F::Engine>> {
        let profile = &self.config.profile;
        let gateway_url = self
            .config
            .gateway_url()
            .ok_or_else(|| ClientError::MissingGatewayEndpoint {
                network: profile.name.clone(),
            })?;

        if let Some(connection) = &self.config.connection {
            let actual = connection.chain_id().await?;
            if actual != profile.chain_id {
                return Err(ClientError::ChainMismatch {
                    expected: profile.chain_id,
                    actual,
                });
            }
        }

        let gateway = GatewayClient::new(gateway_url, self.config.http_timeout)?;

        info!(
            network = %profile,
            gateway = gateway.base_url(),
            "Fetching FHE public key"
        );
        let key = gateway.fetch_public_key().await?;

        let params = EngineParams {
            chain_id: profile.chain_id,
            public_key: key.public_key,
            gateway_url: gateway.base_url().to_string(),
            acl_address: self.config.acl_address(),
            verifier_address: self.config.verifier_address(),
        };

        let started = Instant::now();
        let factory = Arc::clone(&self.factory);
        let engine = tokio::task::spawn_blocking(move || factory.create(params))
            .await?
            .map_err(ClientError::EngineInitFailed)?;
        metrics::record_engine_init(started.elapsed());

        info!(
            chain_id = profile.chain_id,
            key_id = key.public_key_id.as_deref().unwrap_or("-"),
            "FHE engine initialized"
        );

        Ok(EngineState {
            engine: Arc::new(engine),
            gateway,
        })
    }

    /// Validate `value` for `tag` and encrypt it with the matching primitive
    pub async fn encrypt(&self, tag: TypeTag, value: impl Into<RawValue>) -> Result<EncryptedScalar> {
        let value = TypedValue::parse(tag, value)?;
        let engine = self.engine().await?;

        let result = tokio::task::spawn_blocking(move || codec::encrypt_value(&*engine, value)).await?;
        metrics::record_encrypt(tag, result.is_ok());

        let ciphertext = result.map_err(ClientError::EncryptionFailed)?;
        debug!(tag = %tag, bytes = ciphertext.len(), "Encrypted value");

        Ok(EncryptedScalar {
            tag,
            ciphertext: Bytes::from(ciphertext),
        })
    }

    pub async fn encrypt_u8(&self, value: impl Into<RawValue>) -> Result<EncryptedScalar> {
        self.encrypt(TypeTag::U8, value).await
    }

    pub async fn encrypt_u16(&self, value: impl Into<RawValue>) -> Result<EncryptedScalar> {
        self.encrypt(TypeTag::U16, value).await
    }

    pub async fn encrypt_u32(&self, value: impl Into<RawValue>) -> Result<EncryptedScalar> {
        self.encrypt(TypeTag::U32, value).await
    }

    pub async fn encrypt_u64(&self, value: impl Into<RawValue>) -> Result<EncryptedScalar> {
        self.encrypt(TypeTag::U64, value).await
    }

    pub async fn encrypt_bool(&self, value: impl Into<RawValue>) -> Result<EncryptedScalar> {
        self.encrypt(TypeTag::Bool, value).await
    }

    pub async fn encrypt_address(&self, value: impl Into<RawValue>) -> Result<EncryptedScalar> {
        self.encrypt(TypeTag::Address, value).await
    }

    /// Start an input batch bound to `contract` and `user`
    pub fn input(&self, contract: Address, user: Address) -> InputBuilder<'_, F> {
        InputBuilder::new(self, contract, user)
    }

    /// Create a decryption request with a locally generated id
    pub fn request_decryption(
        &self,
        ciphertext: impl Into<Bytes>,
        contract: Address,
        tag: Option<TypeTag>,
    ) -> DecryptionRequest {
        self.request_decryption_with_id(self.request_ids.next_id(), ciphertext, contract, tag)
    }

    /// Create a decryption request for an id obtained elsewhere
    pub fn request_decryption_with_id(
        &self,
        request_id: impl Into<String>,
        ciphertext: impl Into<Bytes>,
        contract: Address,
        tag: Option<TypeTag>,
    ) -> DecryptionRequest {
        let request = DecryptionRequest::new(request_id, ciphertext, contract, tag);
        debug!(request_id = %request.request_id, contract = %contract, "Decryption requested");
        request
    }

    /// Poll the gateway until `request` resolves, is rejected, or times out
    pub async fn await_decryption(
        &self,
        request: &DecryptionRequest,
        opts: PollOptions,
    ) -> Result<Plaintext> {
        let state = self.state().await?;
        decrypt::await_decryption(&state.gateway, request, opts).await
    }

    /// Request and await a decryption with the configured poll timing
    pub async fn decrypt(
        &self,
        ciphertext: impl Into<Bytes>,
        contract: Address,
        tag: Option<TypeTag>,
    ) -> Result<Plaintext> {
        let request = self.request_decryption(ciphertext, contract, tag);
        self.await_decryption(&request, self.config.poll).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::StaticChain;
    use crate::engine::{EncryptedInput, EngineError, EngineInputBuilder, FheEngine};
    use shroud_core::network;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct NullBuilder;

    impl EngineInputBuilder for NullBuilder {
        fn add_u8(&mut self, _: u8) {}
        fn add_u16(&mut self, _: u16) {}
        fn add_u32(&mut self, _: u32) {}
        fn add_u64(&mut self, _: u64) {}
        fn add_bool(&mut self, _: bool) {}
        fn add_address(&mut self, _: Address) {}
        fn finalize(self) -> std::result::Result<EncryptedInput, EngineError> {
            Err(EngineError::Rejected("unused".into()))
        }
    }

    struct NullEngine;

    impl FheEngine for NullEngine {
        type InputBuilder = NullBuilder;

        fn encrypt_u8(&self, _: u8) -> std::result::Result<Vec<u8>, EngineError> {
            Ok(vec![8])
        }
        fn encrypt_u16(&self, _: u16) -> std::result::Result<Vec<u8>, EngineError> {
            Ok(vec![16])
        }
        fn encrypt_u32(&self, _: u32) -> std::result::Result<Vec<u8>, EngineError> {
            Ok(vec![32])
        }
        fn encrypt_u64(&self, _: u64) -> std::result::Result<Vec<u8>, EngineError> {
            Ok(vec![64])
        }
        fn encrypt_bool(&self, _: bool) -> std::result::Result<Vec<u8>, EngineError> {
            Ok(vec![1])
        }
        fn encrypt_address(&self, _: Address) -> std::result::Result<Vec<u8>, EngineError> {
            Ok(vec![20])
        }
        fn input_builder(&self, _: Address, _: Address) -> NullBuilder {
            NullBuilder
        }
    }

    #[derive(Default)]
    struct CountingFactory {
        created: AtomicUsize,
    }

    impl EngineFactory for CountingFactory {
        type Engine = NullEngine;

        fn create(&self, _: EngineParams) -> std::result::Result<NullEngine, EngineError> {
            self.created.fetch_add(1, Ordering::SeqCst);
            Ok(NullEngine)
        }
    }

    fn localhost() -> NetworkProfile {
        network::lookup(network::LOCALHOST).unwrap()
    }

    #[test]
    fn test_override_precedence() {
        let profile = network::lookup(network::SEPOLIA).unwrap();
        let acl = Address::repeat_byte(0xaa);

        let config = ClientConfig::new(profile.clone());
        assert_eq!(config.gateway_url(), profile.gateway_url.as_deref());
        assert_eq!(config.acl_address(), profile.acl_address);

        let config = config.with_gateway("http://127.0.0.1:1").with_acl(acl);
        assert_eq!(config.gateway_url(), Some("http://127.0.0.1:1"));
        assert_eq!(config.acl_address(), Some(acl));
        assert_eq!(config.verifier_address(), profile.verifier_address);
    }

    #[test]
    fn test_config_from_settings() {
        let settings = ClientSettings::for_network("zamaDevnet").with_gateway("http://gw.local");
        let config = ClientConfig::from_settings(&settings).unwrap();
        assert_eq!(config.profile.chain_id, 9_000);
        assert_eq!(config.gateway_url(), Some("http://gw.local"));
        assert_eq!(config.poll.poll_interval, Duration::from_secs(2));

        let bad = ClientSettings::for_network("nowhere");
        assert!(matches!(
            ClientConfig::from_settings(&bad),
            Err(ClientError::Core(shroud_core::Error::UnknownNetwork(_)))
        ));
    }

    #[tokio::test]
    async fn test_missing_gateway_endpoint() {
        let client = Client::new(ClientConfig::new(localhost()), CountingFactory::default());

        let err = client.encrypt_u8(1u8).await.unwrap_err();
        assert!(matches!(err, ClientError::MissingGatewayEndpoint { .. }));
        assert!(!client.is_initialized());
        assert_eq!(client.factory.created.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_validation_precedes_initialization() {
        let client = Client::new(ClientConfig::new(localhost()), CountingFactory::default());

        // Out-of-range input fails on validation, not on the missing gateway
        let err = client.encrypt_u8(256u16).await.unwrap_err();
        assert!(matches!(
            err,
            ClientError::Core(shroud_core::Error::ValueOutOfRange { .. })
        ));

        let err = client.encrypt_address("0x1234").await.unwrap_err();
        assert!(matches!(
            err,
            ClientError::Core(shroud_core::Error::InvalidAddressFormat(_))
        ));
    }

    #[tokio::test]
    async fn test_chain_mismatch_stops_initialization() {
        let config = ClientConfig::new(localhost())
            .with_gateway("http://127.0.0.1:9")
            .with_connection(StaticChain(1));
        let client = Client::new(config, CountingFactory::default());

        let err = client.init().await.unwrap_err();
        assert!(matches!(
            err,
            ClientError::ChainMismatch { expected: 31_337, actual: 1 }
        ));
    }

    #[test]
    fn test_request_ids_are_unique() {
        let client = Client::new(ClientConfig::new(localhost()), CountingFactory::default());
        let a = client.request_decryption(vec![1u8; 32], Address::ZERO, Some(TypeTag::U8));
        let b = client.request_decryption(vec![1u8; 32], Address::ZERO, Some(TypeTag::U8));
        assert_ne!(a.request_id, b.request_id);
        assert_eq!(a.tag, Some(TypeTag::U8));
    }

    #[test]
    fn test_request_with_external_id() {
        let client = Client::new(ClientConfig::new(localhost()), CountingFactory::default());
        let request = client.request_decryption_with_id("event-7", vec![0u8; 32], Address::ZERO, None);
        assert_eq!(request.request_id, "event-7");
    }
}
