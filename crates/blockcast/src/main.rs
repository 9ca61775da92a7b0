//! Place an image into a running world as a perspective field of blocks.
//!
//! Run: `cargo run -p blockcast -- --config blockcast.json --player Alex`
//!
//! Steps:
//! 1. Load the palette and resample the image
//! 2. Read the player's position and rotation over the remote console
//! 3. Project every pixel into a `setblock` command
//! 4. Send the commands over a pool of remote console connections

mod config;

use std::io::{self, BufWriter, Write};

use anyhow::Context;
use blockcast_dispatch::{Connection, Connector, rcon::RconConnector, send_commands};
use blockcast_project::{ObserverPose, Palette, build_commands, raster};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::config::{Args, Config, ServerConfig};

fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let config = Config::from_args(&args)?;
    config
        .validate(args.pose.is_none(), !args.dry_run)
        .context("validating configuration")?;

    // Step 1: inputs.
    let palette = Palette::load(&config.palette)
        .with_context(|| format!("loading palette {}", config.palette.display()))?;
    let source = raster::load_image(&config.image)
        .with_context(|| format!("loading image {}", config.image.display()))?;
    let image = raster::prepare(&source, &config.projection).context("resampling image")?;

    // Step 2: camera.
    let pose = match &args.pose {
        Some(text) => ObserverPose::from_csv(text).context("parsing --pose")?,
        None => query_pose(&config.server).context("querying observer pose")?,
    };
    tracing::info!(
        "Observer at ({:.2}, {:.2}, {:.2}), yaw={:.1} pitch={:.1}",
        pose.position.x,
        pose.position.y,
        pose.position.z,
        pose.yaw,
        pose.pitch
    );

    // Step 3: projection.
    let commands: Vec<String> = build_commands(&image, &palette, &pose, &config.projection)
        .context("projecting image")?
        .iter()
        .map(ToString::to_string)
        .collect();

    if args.dry_run {
        let mut out = BufWriter::new(io::stdout().lock());
        for command in &commands {
            writeln!(out, "{command}").context("writing commands")?;
        }
        out.flush().context("writing commands")?;
        return Ok(());
    }

    // Step 4: dispatch.
    let connector = RconConnector::new(
        config.server.host.clone(),
        config.server.port,
        config.server.password.clone(),
    );
    let report = send_commands(&connector, config.pool_size, &commands, config.failure_policy)
        .context("dispatching commands")?;

    if report.failed() > 0 {
        tracing::warn!(
            "Placed {} blocks; {} commands failed",
            report.sent(),
            report.failed()
        );
    } else {
        tracing::info!("Placed {} blocks", report.sent());
    }
    Ok(())
}

/// Read the player's position and rotation over one short-lived connection.
fn query_pose(server: &ServerConfig) -> anyhow::Result<ObserverPose> {
    let connector = RconConnector::new(server.host.clone(), server.port, server.password.clone());
    query_pose_with(&connector, &server.player)
        .with_context(|| format!("querying {}:{}", server.host, server.port))
}

fn query_pose_with<K: Connector>(connector: &K, player: &str) -> anyhow::Result<ObserverPose> {
    let mut connection = connector.connect().context("connecting")?;

    // Close on every path before looking at the replies.
    let replies = read_pose_replies(&mut connection, player);
    let closed = connection.close();
    let (position, rotation) = replies?;
    closed.context("closing pose query connection")?;
    tracing::debug!("Position reply: {position:?}; rotation reply: {rotation:?}");

    let pose = ObserverPose::from_responses(&position, &rotation)
        .with_context(|| format!("reading pose of player {player:?}"))?;
    Ok(pose)
}

fn read_pose_replies<C: Connection>(
    connection: &mut C,
    player: &str,
) -> anyhow::Result<(String, String)> {
    let position = connection
        .command(&format!("data get entity {player} Pos"))
        .context("reading position")?;
    let rotation = connection
        .command(&format!("data get entity {player} Rotation"))
        .context("reading rotation")?;
    Ok((position, rotation))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use blockcast_dispatch::{DispatchError, DispatchResult};

    use super::*;

    /// Hands out connections that answer the position query and optionally
    /// fail the rotation query.
    struct ScriptedConnector {
        fail_rotation: bool,
        closed: AtomicUsize,
    }

    impl ScriptedConnector {
        fn new(fail_rotation: bool) -> Self {
            Self {
                fail_rotation,
                closed: AtomicUsize::new(0),
            }
        }
    }

    struct ScriptedConnection<'a> {
        connector: &'a ScriptedConnector,
    }

    impl<'a> Connector for &'a ScriptedConnector {
        type Connection = ScriptedConnection<'a>;

        fn connect(&self) -> DispatchResult<ScriptedConnection<'a>> {
            Ok(ScriptedConnection { connector: *self })
        }
    }

    impl Connection for ScriptedConnection<'_> {
        fn command(&mut self, command: &str) -> DispatchResult<String> {
            if command.ends_with(" Pos") {
                Ok("Alex has the following entity data: [1.5d, 64.0d, -2.0d]".to_owned())
            } else if self.connector.fail_rotation {
                Err(DispatchError::protocol("no reply"))
            } else {
                Ok("Alex has the following entity data: [90.0f, -10.0f]".to_owned())
            }
        }

        fn close(self) -> DispatchResult<()> {
            self.connector.closed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn reads_pose_and_closes() {
        let connector = ScriptedConnector::new(false);
        let pose = query_pose_with(&&connector, "Alex").unwrap();
        assert!((pose.position.y - 64.0).abs() < f64::EPSILON);
        assert!((pose.yaw - 90.0).abs() < f64::EPSILON);
        assert!((pose.pitch + 10.0).abs() < f64::EPSILON);
        assert_eq!(connector.closed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failed_query_still_closes_connection() {
        let connector = ScriptedConnector::new(true);
        assert!(query_pose_with(&&connector, "Alex").is_err());
        assert_eq!(connector.closed.load(Ordering::SeqCst), 1);
    }
}
