//! Command-line interface and REPL
//!
//! Parses shell commands and drives a layer session through the actor handle.

use anyhow::Result;
use canvas_layers::layers::{
    layers_by_type, FieldRecord, Layer, LayerActorHandle, LayerId, LayerKind, LayerPatch,
    LayerSequence, UnknownLayerKind,
};
use colored::*;
use rustyline::DefaultEditor;
use tracing::{debug, warn};

const HELP: &str = "\
Commands:
  list                         show the stack, frontmost first
  json                         dump the stack as JSON (backmost first)
  add <text|image> <id> [text] append a layer at the front
  remove <id>                  remove a layer
  rename <id> <name...>        change a layer's display name
  update <id> <json-object>    merge attributes into a layer
  up <id> / down <id>          move one step toward the front / back
  move <id> <index>            reinsert at an absolute position (0 = back)
  z <id>                       show the effective z-index
  types                        list text and image layers separately
  clear                        remove every layer
  help                         show this help
  exit | quit                  leave the shell";

/// One parsed shell command
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    List,
    Json,
    Add {
        kind: LayerKind,
        id: LayerId,
        text: Option<String>,
    },
    Remove(LayerId),
    Rename {
        id: LayerId,
        name: String,
    },
    Update {
        id: LayerId,
        patch: LayerPatch,
    },
    Up(LayerId),
    Down(LayerId),
    Move {
        id: LayerId,
        target: usize,
    },
    ZIndex(LayerId),
    Types,
    Clear,
    Help,
    Exit,
}

/// Errors produced while parsing shell input
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("empty command")]
    Empty,
    #[error("unknown command '{0}' (try 'help')")]
    Unknown(String),
    #[error("'{command}' needs a {argument}")]
    MissingArgument {
        command: &'static str,
        argument: &'static str,
    },
    #[error(transparent)]
    Kind(#[from] UnknownLayerKind),
    #[error("invalid position '{0}'")]
    Position(String),
    #[error("invalid update: {0}")]
    Patch(#[from] serde_json::Error),
}

/// Parse one line of shell input
pub fn parse_command(line: &str) -> Result<Command, CommandError> {
    let line = line.trim();
    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };

    let id_arg = |command: &'static str| -> Result<LayerId, CommandError> {
        rest.split_whitespace()
            .next()
            .map(LayerId::from)
            .ok_or(CommandError::MissingArgument {
                command,
                argument: "layer id",
            })
    };
    // Everything after the id, untrimmed inside
    let tail = || {
        rest.split_once(char::is_whitespace)
            .map(|(_, tail)| tail.trim())
            .unwrap_or("")
    };

    match verb.to_ascii_lowercase().as_str() {
        "" => Err(CommandError::Empty),
        "list" | "ls" => Ok(Command::List),
        "json" => Ok(Command::Json),
        "add" => {
            let mut parts = rest.splitn(3, char::is_whitespace);
            let kind = parts
                .next()
                .filter(|s| !s.is_empty())
                .ok_or(CommandError::MissingArgument {
                    command: "add",
                    argument: "layer type",
                })?
                .parse::<LayerKind>()?;
            let id = parts
                .next()
                .filter(|s| !s.is_empty())
                .map(LayerId::from)
                .ok_or(CommandError::MissingArgument {
                    command: "add",
                    argument: "layer id",
                })?;
            let text = parts
                .next()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string);
            Ok(Command::Add { kind, id, text })
        }
        "remove" | "rm" => Ok(Command::Remove(id_arg("remove")?)),
        "rename" => {
            let id = id_arg("rename")?;
            let name = tail();
            if name.is_empty() {
                return Err(CommandError::MissingArgument {
                    command: "rename",
                    argument: "name",
                });
            }
            Ok(Command::Rename {
                id,
                name: name.to_string(),
            })
        }
        "update" => {
            let id = id_arg("update")?;
            let json = tail();
            if json.is_empty() {
                return Err(CommandError::MissingArgument {
                    command: "update",
                    argument: "JSON object",
                });
            }
            let patch: LayerPatch = serde_json::from_str(json)?;
            Ok(Command::Update { id, patch })
        }
        "up" => Ok(Command::Up(id_arg("up")?)),
        "down" => Ok(Command::Down(id_arg("down")?)),
        "move" | "mv" => {
            let id = id_arg("move")?;
            let raw = tail();
            if raw.is_empty() {
                return Err(CommandError::MissingArgument {
                    command: "move",
                    argument: "position",
                });
            }
            let target = raw
                .parse::<usize>()
                .map_err(|_| CommandError::Position(raw.to_string()))?;
            Ok(Command::Move { id, target })
        }
        "z" => Ok(Command::ZIndex(id_arg("z")?)),
        "types" => Ok(Command::Types),
        "clear" => Ok(Command::Clear),
        "help" | "?" => Ok(Command::Help),
        "exit" | "quit" => Ok(Command::Exit),
        other => Err(CommandError::Unknown(other.to_string())),
    }
}

/// Render the stack frontmost first, with effective z-index
pub fn render_stack(layers: &LayerSequence) -> String {
    if layers.is_empty() {
        return format!("{}", "(no layers)".dimmed());
    }

    let mut out = String::new();
    for layer in layers.iter().rev() {
        let z = layers.z_index_of(&layer.id);
        let kind = match layer.kind {
            LayerKind::Text => "text ".cyan(),
            LayerKind::Image => "image".magenta(),
        };
        out.push_str(&format!(
            "  {:>3}  {}  {}  {}\n",
            z.to_string().yellow(),
            kind,
            layer.id.to_string().bold(),
            layer.name
        ));
    }
    out.trim_end().to_string()
}

/// Run the interactive shell until `exit` or end of input
pub async fn run_repl(handle: &LayerActorHandle) -> Result<()> {
    let mut rl = DefaultEditor::new()?;
    println!("{}", "Type 'help' for commands.".dimmed());

    loop {
        if !handle.is_running() {
            warn!("Layer actor stopped, leaving the shell");
            break;
        }
        let line = match rl.readline("layers> ") {
            Ok(line) => line,
            Err(_) => break,
        };
        if line.trim().is_empty() {
            continue;
        }
        let _ = rl.add_history_entry(line.as_str());

        let command = match parse_command(&line) {
            Ok(command) => command,
            Err(e) => {
                println!("{}", e.to_string().red());
                continue;
            }
        };

        if command == Command::Exit {
            break;
        }
        debug!(?command, "Executing command");
        execute(handle, command).await?;
    }

    Ok(())
}

async fn execute(handle: &LayerActorHandle, command: Command) -> Result<()> {
    match command {
        Command::List => println!("{}", render_stack(&handle.snapshot().await?)),
        Command::Json => {
            let snapshot = handle.snapshot().await?;
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        }
        Command::Add { kind, id, text } => {
            let field = FieldRecord {
                text,
                ..FieldRecord::new(id)
            };
            handle.add_layer(kind, field);
        }
        Command::Remove(id) => handle.remove_layer(id),
        Command::Rename { id, name } => handle.update_layer(id, LayerPatch::rename(name)),
        Command::Update { id, patch } => handle.update_layer(id, patch),
        Command::Up(id) => handle.move_layer_up(id),
        Command::Down(id) => handle.move_layer_down(id),
        Command::Move { id, target } => handle.move_layer_to_position(id, target),
        Command::ZIndex(id) => {
            let snapshot = handle.snapshot().await?;
            match snapshot.index_of(&id) {
                Some(_) => println!("{} -> z-index {}", id, snapshot.z_index_of(&id)),
                None => println!(
                    "{}",
                    format!("{} not found (default z-index {})", id, snapshot.z_index_of(&id))
                        .yellow()
                ),
            }
        }
        Command::Types => {
            let snapshot = handle.snapshot().await?;
            let grouped = layers_by_type(&snapshot);
            let join = |layers: &[&Layer]| {
                layers
                    .iter()
                    .map(|layer| layer.id.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            };
            println!("{} {}", "text: ".cyan(), join(grouped.text_fields.as_slice()));
            println!("{} {}", "image:".magenta(), join(grouped.image_fields.as_slice()));
        }
        Command::Clear => handle.clear_layers(),
        Command::Help => println!("{}", HELP),
        Command::Exit => {}
    }

    // Wait until the actor has applied the command so change output lands before the prompt
    handle.snapshot().await?;
    Ok(())
}
