use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};

use domain::deploy::DeployStatus;
use domain::{AttemptId, CardId, DeploySide, DeviceId, GroupId};
use infrastructure::config::NameplateConfig;

#[derive(Parser, Debug)]
#[command(author, version, about = "Smart nameplate control agent", long_about = None)]
pub struct Cli {
    /// Path to config directory
    #[arg(long, default_value = "config")]
    pub config_dir: String,

    /// Override the database URL
    #[arg(long)]
    pub database_url: Option<String>,

    /// Override the acting user id recorded in the audit trail
    #[arg(long)]
    pub actor_id: Option<String>,

    /// Override the acting user name
    #[arg(long)]
    pub actor_name: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Applies command line overrides on top of the loaded configuration
    pub fn apply_overrides(&self, config: &mut NameplateConfig) {
        if let Some(url) = &self.database_url {
            config.database.url = url.clone();
        }
        if let Some(id) = &self.actor_id {
            config.actor.id = id.clone();
        }
        if let Some(name) = &self.actor_name {
            config.actor.name = name.clone();
        }
    }
}

/// A single line typed into the interactive shell
#[derive(Parser, Debug)]
#[command(no_binary_name = true, disable_version_flag = true)]
pub struct ShellLine {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Discover nameplates in radio range
    Scan,
    /// Report adapter availability and live sessions
    Radio,
    /// Connect to a display and register it when unknown
    Connect {
        address: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        display_address: Option<String>,
    },
    Disconnect {
        address: String,
    },
    /// Probe a display and reconcile its stored status
    Status {
        address: String,
    },
    /// Deploy a card to one device
    Deploy {
        device_id: DeviceId,
        #[arg(value_parser = parse_card_id)]
        card_id: CardId,
        /// both | a | b, or the wire codes 0 | 1 | 2
        #[arg(long, default_value = "b", value_parser = parse_side)]
        side: DeploySide,
        /// Schedule instead of transmitting now (RFC 3339)
        #[arg(long = "at")]
        scheduled_at: Option<DateTime<Utc>>,
    },
    /// Run an existing attempt again
    Retry {
        attempt_id: AttemptId,
    },
    /// Deploy one card to several devices
    Batch {
        #[arg(long, value_parser = parse_card_id)]
        card: CardId,
        #[arg(long = "device", required = true, num_args = 1..)]
        devices: Vec<DeviceId>,
        #[arg(long, default_value = "b", value_parser = parse_side)]
        side: DeploySide,
        #[arg(long = "at")]
        scheduled_at: Option<DateTime<Utc>>,
    },
    Cancel {
        attempt_id: AttemptId,
    },
    Attempt {
        attempt_id: AttemptId,
    },
    /// Page through deploy history
    History {
        #[arg(long)]
        device: Option<DeviceId>,
        #[arg(long, value_parser = parse_card_id)]
        card: Option<CardId>,
        #[arg(long)]
        status: Option<DeployStatus>,
        #[arg(long)]
        from: Option<DateTime<Utc>>,
        #[arg(long)]
        to: Option<DateTime<Utc>>,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 20)]
        page_size: u32,
    },
    /// Deploy success statistics
    Stats {
        #[arg(long)]
        device: Option<DeviceId>,
    },
    /// List registered devices
    Devices,
    Device {
        device_id: DeviceId,
    },
    /// Change name, group or ordering of a device
    Update {
        device_id: DeviceId,
        #[arg(long)]
        name: Option<String>,
        #[arg(long, value_parser = parse_group_id)]
        group: Option<GroupId>,
        #[arg(long = "index")]
        custom_index: Option<i32>,
    },
    Delete {
        device_id: DeviceId,
    },
    /// Latest audit entries
    Audit {
        #[arg(long, default_value_t = 50)]
        limit: u64,
    },
    /// Read commands from stdin, keeping radio sessions open between them
    Shell,
}

fn parse_card_id(value: &str) -> Result<CardId, String> {
    CardId::new(value.trim()).map_err(|e| e.to_string())
}

fn parse_group_id(value: &str) -> Result<GroupId, String> {
    GroupId::new(value.trim()).map_err(|e| e.to_string())
}

fn parse_side(value: &str) -> Result<DeploySide, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "both" | "ab" => Ok(DeploySide::Both),
        "a" => Ok(DeploySide::A),
        "b" => Ok(DeploySide::B),
        code => code
            .parse::<i32>()
            .map_err(|_| format!("unknown side {value}, expected both, a or b"))
            .and_then(|code| DeploySide::from_code(code).map_err(|e| e.to_string())),
    }
}

/// Splits a shell line into words. Double quotes group words and are removed.
pub fn split_words(line: &str) -> Result<Vec<String>, String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quoted = false;

    for c in line.chars() {
        match c {
            '"' => {
                quoted = !quoted;
                in_word = true;
            }
            c if c.is_whitespace() && !quoted => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            c => {
                current.push(c);
                in_word = true;
            }
        }
    }

    if quoted {
        return Err("unterminated quote".to_string());
    }
    if in_word {
        words.push(current);
    }
    Ok(words)
}
