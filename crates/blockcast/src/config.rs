//! Run configuration: JSON file plus command-line overrides.

use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use blockcast_dispatch::FailurePolicy;
use blockcast_project::ProjectionSettings;
use clap::Parser;
use serde::{Deserialize, Serialize};

/// Place an image into a running world as a perspective field of blocks.
#[derive(Debug, Default, Parser)]
#[command(version, about)]
pub struct Args {
    /// JSON configuration file. Missing fields take their defaults.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Image to place.
    #[arg(long)]
    pub image: Option<PathBuf>,

    /// Palette JSON mapping block identifiers to [r, g, b].
    #[arg(long)]
    pub palette: Option<PathBuf>,

    /// Player whose position and view are used as the camera.
    #[arg(long)]
    pub player: Option<String>,

    /// Remote console host.
    #[arg(long)]
    pub host: Option<String>,

    /// Remote console port.
    #[arg(long)]
    pub port: Option<u16>,

    /// Remote console password.
    #[arg(long, env = "BLOCKCAST_RCON_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Number of pooled connections and concurrent senders.
    #[arg(long)]
    pub pool_size: Option<usize>,

    /// Width in blocks the image is resampled to.
    #[arg(long)]
    pub width: Option<u32>,

    /// Camera pose as `x,y,z,yaw,pitch` instead of querying the player.
    #[arg(long, allow_hyphen_values = true)]
    pub pose: Option<String>,

    /// Log failed commands and keep going instead of aborting.
    #[arg(long)]
    pub skip_failures: bool,

    /// Print the commands to stdout instead of sending them.
    #[arg(long)]
    pub dry_run: bool,
}

/// Remote console endpoint and the player to follow.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(skip_serializing)]
    pub password: String,
    pub player: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_owned(),
            port: 25575,
            password: String::new(),
            player: String::new(),
        }
    }
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("password", &"<redacted>")
            .field("player", &self.player)
            .finish()
    }
}

/// Everything a run needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub image: PathBuf,
    pub palette: PathBuf,
    pub projection: ProjectionSettings,
    pub server: ServerConfig,
    pub pool_size: usize,
    pub failure_policy: FailurePolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            image: PathBuf::from("images/image.png"),
            palette: PathBuf::from("database/rgb_values.json"),
            projection: ProjectionSettings::default(),
            server: ServerConfig::default(),
            pool_size: 16,
            failure_policy: FailurePolicy::Abort,
        }
    }
}

impl Config {
    /// Read a configuration file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_str(&json).with_context(|| format!("parsing config {}", path.display()))
    }

    /// Load the file named by `args` (if any) and apply the overrides.
    pub fn from_args(args: &Args) -> anyhow::Result<Self> {
        let mut config = match &args.config {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        config.apply(args);
        Ok(config)
    }

    fn apply(&mut self, args: &Args) {
        if let Some(image) = &args.image {
            self.image.clone_from(image);
        }
        if let Some(palette) = &args.palette {
            self.palette.clone_from(palette);
        }
        if let Some(player) = &args.player {
            self.server.player.clone_from(player);
        }
        if let Some(host) = &args.host {
            self.server.host.clone_from(host);
        }
        if let Some(port) = args.port {
            self.server.port = port;
        }
        if let Some(password) = &args.password {
            self.server.password.clone_from(password);
        }
        if let Some(pool_size) = args.pool_size {
            self.pool_size = pool_size;
        }
        if let Some(width) = args.width {
            self.projection.output_width = width;
        }
        if args.skip_failures {
            self.failure_policy = FailurePolicy::Skip;
        }
    }

    /// Check the configuration before touching any files or sockets.
    ///
    /// Credentials are only required for the stages that use them: the player
    /// query when no pose is given, and dispatch unless this is a dry run.
    pub fn validate(&self, needs_pose_query: bool, needs_dispatch: bool) -> anyhow::Result<()> {
        self.projection.validate()?;
        if needs_dispatch && self.pool_size == 0 {
            bail!("configuration error: pool_size must be at least 1");
        }
        if (needs_pose_query || needs_dispatch) && self.server.password.is_empty() {
            bail!("configuration error: a remote console password is required");
        }
        if needs_pose_query && self.server.player.is_empty() {
            bail!("configuration error: a player name is required to read the camera pose");
        }
        Ok(())
    }
}
