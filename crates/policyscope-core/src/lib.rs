pub mod config;
pub mod error;
pub mod fetch;
pub mod http;
pub mod model;
pub mod report;
pub mod retriever;
pub mod secret;
pub mod token;

pub use config::{Endpoints, HttpConfig, RetrieverConfig, TenantSettings};
pub use error::{Result, RetrieverError};
pub use fetch::PolicyFetcher;
pub use model::{FieldMap, PolicyRecord, RetrievalResult, Service};
pub use report::{Reporter, Summary};
pub use retriever::{RunReport, Retriever};
pub use secret::{SecretSource, TerminalPrompt, TerminalState};
pub use token::{BearerToken, TokenAcquirer};
