use anyhow::Result;
use clap::Parser;
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use application::{BatchDeployRequest, ConnectRequest, DeployRequest};
use domain::deploy::{DateRange, HistoryQuery};
use domain::DeviceUpdate;

use crate::bootstrap::Agent;
use crate::cli::{Command, ShellLine, split_words};

/// Rendered envelope of one command
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub success: bool,
    pub body: serde_json::Value,
}

impl Reply {
    fn new<R: Serialize>(response: &R, success: bool) -> Result<Self> {
        Ok(Self {
            success,
            body: serde_json::to_value(response)?,
        })
    }
}

/// Runs one command against the service and returns its envelope
pub async fn execute(agent: &Agent, command: &Command) -> Result<Reply> {
    let service = &agent.service;
    let actor = &agent.actor;
    debug!(?command, actor = %actor.id, "Executing command");

    match command {
        Command::Scan => {
            let r = service.scan(actor).await;
            Reply::new(&r, r.is_success())
        }
        Command::Radio => {
            let r = service.radio_status(actor).await;
            Reply::new(&r, r.is_success())
        }
        Command::Connect {
            address,
            name,
            display_address,
        } => {
            let mut request = ConnectRequest::new(address.clone());
            request.name = name.clone();
            request.display_address = display_address.clone();
            let r = service.connect(actor, &request).await;
            Reply::new(&r, r.is_success())
        }
        Command::Disconnect { address } => {
            let r = service.disconnect(actor, address).await;
            Reply::new(&r, r.is_success())
        }
        Command::Status { address } => {
            let r = service.check_status(actor, address).await;
            Reply::new(&r, r.is_success())
        }
        Command::Deploy {
            device_id,
            card_id,
            side,
            scheduled_at,
        } => {
            let mut request = DeployRequest::new(*device_id, card_id.clone(), *side);
            request.scheduled_at = *scheduled_at;
            let r = service.deploy(actor, &request).await;
            Reply::new(&r, r.is_success())
        }
        Command::Retry { attempt_id } => {
            let r = service.retry(actor, attempt_id).await;
            Reply::new(&r, r.is_success())
        }
        Command::Batch {
            card,
            devices,
            side,
            scheduled_at,
        } => {
            let request = BatchDeployRequest {
                device_ids: devices.clone(),
                card_id: card.clone(),
                side: *side,
                scheduled_at: *scheduled_at,
            };
            let r = service.deploy_batch(actor, &request).await;
            Reply::new(&r, r.is_success())
        }
        Command::Cancel { attempt_id } => {
            let r = service.cancel_attempt(actor, attempt_id).await;
            Reply::new(&r, r.is_success())
        }
        Command::Attempt { attempt_id } => {
            let r = service.get_attempt(actor, attempt_id).await;
            Reply::new(&r, r.is_success())
        }
        Command::History {
            device,
            card,
            status,
            from,
            to,
            page,
            page_size,
        } => {
            let query = HistoryQuery {
                device_id: *device,
                card_id: card.clone(),
                status: *status,
                date_range: (from.is_some() || to.is_some()).then_some(DateRange {
                    from: *from,
                    to: *to,
                }),
                page: *page,
                page_size: *page_size,
            };
            let r = service.get_history(actor, &query).await;
            Reply::new(&r, r.is_success())
        }
        Command::Stats { device } => {
            let r = service.history_statistics(actor, *device).await;
            Reply::new(&r, r.is_success())
        }
        Command::Devices => {
            let r = service.list_devices(actor).await;
            Reply::new(&r, r.is_success())
        }
        Command::Device { device_id } => {
            let r = service.get_device(actor, device_id).await;
            Reply::new(&r, r.is_success())
        }
        Command::Update {
            device_id,
            name,
            group,
            custom_index,
        } => {
            let update = DeviceUpdate {
                name: name.clone(),
                group: group.clone(),
                custom_index: *custom_index,
            };
            let r = service.update_device(actor, device_id, &update).await;
            Reply::new(&r, r.is_success())
        }
        Command::Delete { device_id } => {
            let r = service.delete_device(actor, device_id).await;
            Reply::new(&r, r.is_success())
        }
        Command::Audit { limit } => {
            let r = service.recent_audit(actor, *limit).await;
            Reply::new(&r, r.is_success())
        }
        Command::Shell => Ok(Reply {
            success: false,
            body: serde_json::json!({
                "status": "error",
                "message": "Shell is already running",
                "data": null,
            }),
        }),
    }
}

/// Parses and runs one shell line. Blank lines yield `None`.
pub async fn execute_line(agent: &Agent, line: &str) -> Result<Option<Reply>> {
    let words = match split_words(line) {
        Ok(words) if words.is_empty() => return Ok(None),
        Ok(words) => words,
        Err(e) => return Ok(Some(usage_error(e))),
    };

    match ShellLine::try_parse_from(words) {
        Ok(parsed) => execute(agent, &parsed.command).await.map(Some),
        Err(e) => Ok(Some(usage_error(e.to_string()))),
    }
}

fn usage_error(message: impl Into<String>) -> Reply {
    Reply {
        success: false,
        body: serde_json::json!({
            "status": "error",
            "message": message.into().trim_end(),
            "data": null,
        }),
    }
}

/// Reads commands from stdin until EOF or shutdown, then closes every open session
pub async fn run_shell(agent: &Agent, shutdown: CancellationToken) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    info!("🐚 Shell ready, one command per line");

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                info!("🛑 Shutting down...");
                break;
            }
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if let Some(reply) = execute_line(agent, &line).await? {
                    println!("{}", serde_json::to_string(&reply.body)?);
                }
            }
        }
    }

    for address in agent.service.connections().connected_addresses().await {
        let response = agent.service.disconnect(&agent.actor, &address).await;
        if !response.is_success() {
            warn!(address = %address, reason = response.message(), "Failed to close session");
        }
    }
    info!("👋 Good bye!");
    Ok(())
}
