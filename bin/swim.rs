use std::net::{IpAddr, SocketAddr};

use clap::{Arg, ArgMatches, Command};
use tokio::time::Duration;

use system::config::Config;
use system::node::Node;

fn arguments() -> ArgMatches {
    Command::new("swim")
        .about("SWIM group membership and failure detection")
        .arg(
            Arg::new("address")
                .long("address")
                .takes_value(true)
                .default_value("0.0.0.0")
                .help("address to bind the membership socket to"),
        )
        .arg(
            Arg::new("port")
                .long("port")
                .takes_value(true)
                .default_value("25000")
                .help("membership UDP port"),
        )
        .arg(
            Arg::new("seed")
                .long("seed")
                .takes_value(true)
                .multiple_occurrences(true)
                .help("address:port of a member to join through"),
        )
        .arg(
            Arg::new("protocol-period")
                .long("protocol-period")
                .takes_value(true)
                .help("protocol period in milliseconds"),
        )
        .arg(
            Arg::new("ping-timeout")
                .long("ping-timeout")
                .takes_value(true)
                .help("direct ping timeout in milliseconds"),
        )
        .arg(
            Arg::new("indirect-probes")
                .long("indirect-probes")
                .takes_value(true)
                .help("number of members asked to probe on our behalf"),
        )
        .arg(
            Arg::new("lambda")
                .long("lambda")
                .takes_value(true)
                .help("dissemination multiplier"),
        )
        .arg(
            Arg::new("max-gossip")
                .long("max-gossip")
                .takes_value(true)
                .help("maximum updates piggybacked on one packet"),
        )
        .get_matches()
}

fn config(matches: &ArgMatches) -> Result<Config, Box<dyn std::error::Error>> {
    let mut config = Config::default();

    if matches.is_present("protocol-period") {
        config.protocol_period = Duration::from_millis(matches.value_of_t("protocol-period")?);
    }

    if matches.is_present("ping-timeout") {
        config.ping_timeout = Duration::from_millis(matches.value_of_t("ping-timeout")?);
    }

    if matches.is_present("indirect-probes") {
        config.indirect_probes = matches.value_of_t("indirect-probes")?;
    }

    if matches.is_present("lambda") {
        config.lambda = matches.value_of_t("lambda")?;
    }

    if matches.is_present("max-gossip") {
        config.max_gossip = matches.value_of_t("max-gossip")?;
    }

    config.validate()?;

    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let matches = arguments();
    let config = config(&matches)?;

    let address: IpAddr = matches.value_of_t("address")?;
    let port: u16 = matches.value_of_t("port")?;

    let mut seeds = Vec::with_capacity(5);

    if let Some(values) = matches.values_of("seed") {
        for seed in values {
            seeds.push(seed.parse::<SocketAddr>()?);
        }
    }

    let node = Node::init(address, port).await?;

    system::runtime::launch(config, node, seeds).await?;

    Ok(())
}
