use std::net::SocketAddr;

use tokio::signal::ctrl_c;

use crate::channel::membership::MembershipRequest;
use crate::channel::transition::Shutdown;
use crate::config::Config;
use crate::membership::Membership;
use crate::node::Node;
use crate::{error, info};

pub async fn launch(
    config: Config,
    node: Node,
    seeds: Vec<SocketAddr>,
) -> Result<(), Box<dyn std::error::Error>> {
    info!("node id -> {:?}", &node.id);
    info!("membership address -> {:?}", node.membership_address());
    info!("seeds -> {:?}", &seeds);

    // -------------------------------------------------------------------------------------------
    // |        init shutdown channel
    // -------------------------------------------------------------------------------------------

    let shutdown_signal = Shutdown::build().await;
    let shutdown_membership_task = shutdown_signal.to_owned();
    let shutdown_on_error = shutdown_signal.to_owned();
    let mut system_shutdown = shutdown_signal.subscribe();

    // -------------------------------------------------------------------------------------------
    // |        init membership channel
    // -------------------------------------------------------------------------------------------

    let (membership_sender, membership_receiver) = MembershipRequest::build().await;

    // -------------------------------------------------------------------------------------------
    // |        init membership
    // -------------------------------------------------------------------------------------------

    let mut membership =
        Membership::init(config, node, membership_receiver, shutdown_membership_task).await?;

    let membership_handle = tokio::spawn(async move {
        let failed = match membership.run(seeds).await {
            Ok(()) => false,
            Err(error) => {
                error!("membership -> {:?}", error);

                true
            }
        };

        if failed {
            if let Err(error) = Shutdown::send(&shutdown_on_error).await {
                error!("error sending shutdown signal! -> {:?}", error);
            }
        }
    });

    // -------------------------------------------------------------------------------------------
    // |        init shutdown signal
    // -------------------------------------------------------------------------------------------

    let shutdown_signal = tokio::spawn(async move {
        tokio::select! {
            ctrl_c = ctrl_c() => {
                info!("received shutdown signal {:?}", ctrl_c);
                info!("preparing to shut down...");

                if let Err(error) = MembershipRequest::shutdown(&membership_sender).await {
                    error!("error sending shutdown signal! -> {:?}", error);
                }
            }
            _ = system_shutdown.recv() => {
                info!("shutting down...");
            }
        }
    });

    // -------------------------------------------------------------------------------------------
    // |        launch!!!
    // -------------------------------------------------------------------------------------------

    tokio::try_join!(membership_handle, shutdown_signal)?;

    Ok(())
}
