// # Task Source Trait
//
// Defines the interface for listing the private IPs of live cluster tasks.
//
// ## Implementations
//
// - ECS: `taskdns-source-ecs` crate
//
// ## Usage
//
// ```rust,ignore
// use taskdns_core::TaskSource;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let source = /* TaskSource implementation */;
//
//     let ips = source.list_task_ips("my-cluster").await?;
//     println!("{} live task(s)", ips.len());
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use std::net::Ipv4Addr;

/// Trait for task inventory implementations
///
/// # Contract
///
/// - Returns one private IPv4 address per live task, in the order the
///   inventory service reports them. Duplicates are passed through.
/// - Fails loudly when a task's network attachment lacks an address;
///   an empty list must only ever mean "no tasks are running".
/// - Single-shot: no retries, no background tasks, no caching between
///   calls. A failed pass is corrected by the next invocation.
#[async_trait]
pub trait TaskSource: Send + Sync {
    /// List the private IPv4 address of every live task in `cluster_id`
    ///
    /// # Returns
    ///
    /// - `Ok(Vec<Ipv4Addr>)`: Addresses in inventory order
    /// - `Err(Error)`: If listing or describing tasks failed, or a task
    ///   has no usable address
    async fn list_task_ips(&self, cluster_id: &str) -> Result<Vec<Ipv4Addr>, crate::Error>;

    /// Get the source name (for logging/debugging)
    fn source_name(&self) -> &'static str;
}
