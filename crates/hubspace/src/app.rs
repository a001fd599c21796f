//! Entry points shared by the two binaries.

use tokio::io::{AsyncWriteExt, stdout};
use tracing::{debug, info};

use hubspace_config::ConfigError;
use hubspace_core::{
    Adapter, AferoBridge, AferoConnector, Response, Scope, Shutdown, ThreadedLines, prepare,
};

use crate::cli::{ClassicArgs, SessionArgs};
use crate::error::CliError;

/// Write the `--sanity-check` line to stdout.
pub async fn print_ready() -> Result<(), CliError> {
    let mut line = serde_json::to_vec(&Response::Ready).map_err(std::io::Error::other)?;
    line.push(b'\n');
    let mut out = stdout();
    out.write_all(&line).await?;
    out.flush().await?;
    Ok(())
}

/// Log in from process arguments, load devices, then serve stdin.
pub async fn run_classic(args: ClassicArgs) -> Result<(), CliError> {
    let config = args.load_config()?;
    let credentials = config.credentials().map_err(|e| match e {
        ConfigError::MissingCredential { field } => CliError::Usage {
            message: format!("missing {field}"),
        },
        other => other.into(),
    })?;
    let bridge_config = config.bridge_config()?;

    info!(polling_interval = ?bridge_config.polling_interval, "starting classic adapter");
    let shutdown = Shutdown::new();
    shutdown.listen_for_signals();

    let bridge = AferoBridge::new(&bridge_config, credentials)?;
    tokio::select! {
        biased;
        () = shutdown.cancelled() => info!("shutdown requested during startup"),
        prepared = prepare(&bridge, bridge_config.settle_delay) => {
            prepared?;
            debug!(devices = bridge.store().len(Scope::Devices), "bridge ready");
        }
    }

    // A triggered shutdown skips the loop but still closes the bridge and
    // reports `closed`.
    let mut adapter = Adapter::<AferoConnector>::classic(bridge, shutdown);
    serve(&mut adapter).await
}

/// Serve stdin with no session until a `login` command arrives.
pub async fn run_session(args: SessionArgs) -> Result<(), CliError> {
    let config = args.common.load_config()?;
    let connector = AferoConnector::new(config.bridge_config()?);

    info!("starting session adapter");
    let shutdown = Shutdown::new();
    shutdown.listen_for_signals();
    let mut adapter = Adapter::session(connector, shutdown);
    serve(&mut adapter).await
}

async fn serve(adapter: &mut Adapter<AferoConnector>) -> Result<(), CliError> {
    let mut input = ThreadedLines::stdin()?;
    let mut output = stdout();
    adapter.run(&mut input, &mut output).await?;
    debug!("adapter finished");
    Ok(())
}
