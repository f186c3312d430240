pub mod client;
pub mod connection;
pub mod error;
pub mod pagination;

pub use client::{ApiRequest, ControllerClient, RawResponse, Transport};
pub use connection::{Credential, RemoteConnection};
pub use error::TransportError;
pub use pagination::{collect_pages, Collected};
