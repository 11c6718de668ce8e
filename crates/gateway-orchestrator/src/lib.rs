//! # Gateway Orchestrator
//!
//! The single call surface of the document generation gateway.
//!
//! A [`Gateway`] owns the ordered candidate providers, the retry policy and the
//! shared metrics recorder. Each `submit` walks the candidates in order,
//! retrying transient failures on the current provider before falling back to
//! the next one.
//!
//! ```no_run
//! use gateway_config::GatewayConfig;
//! use gateway_core::{message_pair, RequestOptions};
//! use gateway_orchestrator::Gateway;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let gateway = Gateway::from_config(&GatewayConfig::from_env()?)?;
//! let response = gateway
//!     .submit(
//!         message_pair("You are a project manager", "Draft a project charter"),
//!         RequestOptions::new().with_operation("charter"),
//!     )
//!     .await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod builder;
pub mod gateway;

pub use builder::GatewayBuilder;
pub use gateway::Gateway;
pub use tokio_util::sync::CancellationToken;
