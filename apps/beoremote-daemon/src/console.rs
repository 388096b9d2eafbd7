//! Line-based console commands read from stdin.

use beoremote_core::{Connection, CoordinatorHandle, Device, DeviceIdentity, RemoteResult};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;

const HELP: &str = concat!(
    "commands: list | connect <name> | disconnect | next | prev | skip <n> | ",
    "default [<name>] | help"
);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    List,
    Connect(String),
    Disconnect,
    Skip(i64),
    SetDefault(String),
    ConnectDefault,
    Help,
}

/// Parses one input line. Blank lines yield `Ok(None)`.
pub fn parse(line: &str) -> Result<Option<ConsoleCommand>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };

    let command = match (verb, rest) {
        ("list" | "ls", "") => ConsoleCommand::List,
        ("disconnect", "") => ConsoleCommand::Disconnect,
        ("default", "") => ConsoleCommand::ConnectDefault,
        ("next", "") => ConsoleCommand::Skip(1),
        ("prev", "") => ConsoleCommand::Skip(-1),
        ("help" | "?", _) => ConsoleCommand::Help,
        ("connect", name) if !name.is_empty() => ConsoleCommand::Connect(name.to_string()),
        ("default", name) if !name.is_empty() => ConsoleCommand::SetDefault(name.to_string()),
        ("skip", n) => ConsoleCommand::Skip(
            n.parse()
                .map_err(|_| format!("skip expects an integer, got {:?}", n))?,
        ),
        _ => return Err(format!("unrecognized command {:?}; {}", line, HELP)),
    };
    Ok(Some(command))
}

/// Reads commands from stdin until EOF or shutdown.
pub async fn run(handle: CoordinatorHandle, mut shutdown: broadcast::Receiver<()>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = tokio::select! {
            _ = shutdown.recv() => break,
            line = lines.next_line() => line,
        };

        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => {
                log::debug!("[Console] stdin closed");
                break;
            }
            Err(e) => {
                log::warn!("[Console] Failed to read stdin: {}", e);
                break;
            }
        };

        match parse(&line) {
            Ok(Some(command)) => {
                if let Err(e) = execute(&handle, command).await {
                    eprintln!("error: {}", e);
                }
            }
            Ok(None) => {}
            Err(message) => eprintln!("{}", message),
        }
    }
}

async fn execute(handle: &CoordinatorHandle, command: ConsoleCommand) -> RemoteResult<()> {
    match command {
        ConsoleCommand::List => {
            let devices = handle.devices().await?;
            if devices.is_empty() {
                println!("no devices discovered yet");
            }
            for device in &devices {
                println!("{}", describe(device));
            }
        }
        ConsoleCommand::Connect(name) => handle.connect(DeviceIdentity::new(name)).await?,
        ConsoleCommand::Disconnect => handle.disconnect()?,
        ConsoleCommand::Skip(n) => handle.skip(n)?,
        ConsoleCommand::SetDefault(name) => handle.set_default_device(name)?,
        ConsoleCommand::ConnectDefault => handle.connect_default()?,
        ConsoleCommand::Help => println!("{}", HELP),
    }
    Ok(())
}

fn describe(device: &Device) -> String {
    let marker = match device.connection {
        Connection::Connected => "*",
        Connection::Connecting => "~",
        Connection::Idle => " ",
    };
    match &device.endpoint {
        Some(endpoint) => format!("{} {} ({})", marker, device.display_name, endpoint),
        None => format!("{} {} (resolving)", marker, device.display_name),
    }
}
