//! Read-only command handlers

use anyhow::Result;
use colored::*;

use super::render_json;
use crate::config::Config;

pub async fn get_modules(config: &Config) -> Result<()> {
    let modules = config.distributor().fetch_modules(&config.relay).await?;
    println!("{}", render_json(&modules, true));
    Ok(())
}

pub async fn get_interfaces(config: &Config, expand: bool) -> Result<()> {
    let interfaces = config.distributor().fetch_interfaces(&config.relay).await?;
    println!("{}", render_json(&interfaces, expand));
    Ok(())
}

pub async fn get_interface(config: &Config, service_id: &str, expand: bool) -> Result<()> {
    let interface = config
        .distributor()
        .fetch_interface(&config.relay, service_id)
        .await?;
    println!("{}", render_json(&interface, expand));
    Ok(())
}

/// List the nodes of the selected environment, marking the relay
pub fn list_environment(config: &Config) -> Result<()> {
    if config.nodes.is_empty() {
        println!(
            "{}",
            format!("No nodes configured for {}.", config.environment).yellow()
        );
        return Ok(());
    }

    println!(
        "{}",
        format!("{} ({} node(s)):", config.environment, config.nodes.len()).bold()
    );
    for (index, node) in config.nodes.iter().enumerate() {
        let marker = if *node == config.relay {
            "relay".green()
        } else {
            "".normal()
        };
        println!("  {:>2} {} {}", index, node.peer_id.cyan(), marker);
        println!("     {}", node.multiaddr.dimmed());
    }
    Ok(())
}
