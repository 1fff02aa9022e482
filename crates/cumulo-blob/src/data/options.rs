use std::fmt;
use std::sync::Arc;

use cumulo_http::{ByteRange, Policy, RequestSigner, RetryOptions, TokenCredential, Transport};
use cumulo_transfer::TransferOptions;

/// Service version sent as `x-ms-version` unless overridden.
pub const DEFAULT_API_VERSION: &str = "2019-12-12";

/// How requests are authenticated.
#[derive(Clone, Default)]
pub enum StorageCredential {
    /// Public containers only.
    #[default]
    Anonymous,
    /// Shared access signature query string, with or without the leading `?`.
    Sas(String),
    /// OAuth bearer tokens. Requires an https endpoint.
    Bearer(Arc<dyn TokenCredential>),
    /// Caller-supplied signer, for example a shared-key implementation.
    Signer(Arc<dyn RequestSigner>),
}

impl fmt::Debug for StorageCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Anonymous => f.write_str("Anonymous"),
            Self::Sas(_) => f.write_str("Sas(REDACTED)"),
            Self::Bearer(_) => f.write_str("Bearer { ... }"),
            Self::Signer(_) => f.write_str("Signer { ... }"),
        }
    }
}

/// Pipeline configuration shared by every client built from it.
///
/// # Examples
///
/// ```
/// use cumulo_blob::ClientOptions;
/// use cumulo_http::RetryOptions;
///
/// let options = ClientOptions::default()
///     .retry(RetryOptions::default().max_retries(5))
///     .api_version("2020-02-10");
/// assert_eq!(options.api_version, "2020-02-10");
/// ```
#[derive(Clone)]
pub struct ClientOptions {
    /// Default: 3 retries, 800ms base delay
    pub retry: RetryOptions,

    /// Default: [`DEFAULT_API_VERSION`]
    pub api_version: String,

    /// Run once per logical call, outside the retry loop.
    pub per_call_policies: Vec<Arc<dyn Policy>>,

    /// Run on every attempt, before authentication.
    pub per_retry_policies: Vec<Arc<dyn Policy>>,

    /// Default: reqwest, when the `reqwest` feature is enabled
    pub transport: Option<Arc<dyn Transport>>,

    /// Chunking used by parallel downloads and uploads.
    pub transfer: TransferOptions,
}

impl fmt::Debug for ClientOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientOptions")
            .field("retry", &self.retry)
            .field("api_version", &self.api_version)
            .field("per_call_policies", &self.per_call_policies.len())
            .field("per_retry_policies", &self.per_retry_policies.len())
            .field("transport", &self.transport.as_ref().map(|_| "{ ... }"))
            .field("transfer", &self.transfer)
            .finish()
    }
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            retry:              RetryOptions::default(),
            api_version:        DEFAULT_API_VERSION.to_owned(),
            per_call_policies:  Vec::new(),
            per_retry_policies: Vec::new(),
            transport:          None,
            transfer:           TransferOptions::default(),
        }
    }
}

impl ClientOptions {
    #[must_use]
    pub fn retry(mut self, retry: RetryOptions) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub fn api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    #[must_use]
    pub fn per_call_policy(mut self, policy: Arc<dyn Policy>) -> Self {
        self.per_call_policies.push(policy);
        self
    }

    #[must_use]
    pub fn per_retry_policy(mut self, policy: Arc<dyn Policy>) -> Self {
        self.per_retry_policies.push(policy);
        self
    }

    #[must_use]
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    #[must_use]
    pub fn transfer(mut self, transfer: TransferOptions) -> Self {
        self.transfer = transfer;
        self
    }
}

/// Options for the download family of calls.
#[derive(Debug, Clone, Default)]
pub struct DownloadOptions {
    /// Part of the blob to fetch. Default: the whole blob
    pub range: Option<ByteRange>,

    /// Overrides the client's chunking for this call.
    pub transfer: Option<TransferOptions>,
}

impl DownloadOptions {
    #[must_use]
    pub fn range(mut self, range: ByteRange) -> Self {
        self.range = Some(range);
        self
    }

    #[must_use]
    pub fn transfer(mut self, transfer: TransferOptions) -> Self {
        self.transfer = Some(transfer);
        self
    }
}

/// Snapshot handling for `delete`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteSnapshots {
    /// Delete the blob and all of its snapshots.
    Include,
    /// Delete only the snapshots.
    Only,
}

impl DeleteSnapshots {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Include => "include",
            Self::Only => "only",
        }
    }
}
