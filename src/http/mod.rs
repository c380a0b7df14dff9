mod client;
mod csrf;
mod error;
mod request;
mod transport;

pub use client::HttpClient;
pub use csrf::CsrfAttacher;
pub use error::{BoxError, ClientError, RenewalError};
pub use request::{ApiRequest, ApiResponse, RenewalPolicy, RetryableRequest};
pub use transport::{HttpTransport, Transport};
