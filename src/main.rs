use quorum_kv::cluster::types::{Membership, NodeId};
use quorum_kv::node::{self, NodeConfig};
use quorum_kv::replica::types::SweepConfig;

use std::net::SocketAddr;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 3 {
        eprintln!(
            "Usage: {} --bind <addr:port> [--primary <addr:port>]... [--replica <addr:port>]... [--w <n>]",
            args[0]
        );
        eprintln!("Example: {} --bind 127.0.0.1:6000", args[0]);
        eprintln!(
            "Example: {} --bind 127.0.0.1:6001 --primary 127.0.0.1:6000 --primary 127.0.0.1:6001 --w 2",
            args[0]
        );

        std::process::exit(1);
    }

    let mut bind_addr: Option<SocketAddr> = None;
    let mut primaries: Vec<NodeId> = vec![];
    let mut replicas: Vec<NodeId> = vec![];
    let mut w: Option<usize> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--bind" => {
                bind_addr = Some(args[i + 1].parse()?);
                i += 2;
            }
            "--primary" => {
                primaries.push(NodeId(args[i + 1].clone()));
                i += 2;
            }
            "--replica" => {
                replicas.push(NodeId(args[i + 1].clone()));
                i += 2;
            }
            "--w" => {
                w = Some(args[i + 1].parse()?);
                i += 2;
            }
            _ => {
                i += 1;
            }
        }
    }

    let bind_addr = bind_addr.expect("--bind is required");

    // With no --primary flags the node boots as a lone primary and waits
    // for an administrative set_nodes.
    let membership = if primaries.is_empty() {
        None
    } else {
        Some(Membership {
            primaries,
            replicas,
            w: w.unwrap_or(1).max(1),
        })
    };

    tracing::info!("Starting node on {}", bind_addr);

    let node = node::start(NodeConfig {
        bind: bind_addr,
        membership,
        sweep: SweepConfig::default(),
    })
    .await?;

    // Periodic stats reporter.
    let replica = node.replica.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(30));

        loop {
            interval.tick().await;
            let membership = replica.get_nodes().await;
            let debug_state = replica.debug_state().await;
            tracing::info!(
                "Store: {} entr(ies), {} active lock(s); topology: {} primar(ies), {} replica(s), W={}",
                debug_state.store.len(),
                debug_state.locks.len(),
                membership.primaries.len(),
                membership.replicas.len(),
                membership.w
            );
        }
    });

    tracing::info!("Node {} ready; press Ctrl+C to shutdown", node.id.http_addr());
    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down");

    Ok(())
}
