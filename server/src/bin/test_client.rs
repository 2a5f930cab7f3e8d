//! Headless client for exercising a running server from the terminal.
//!
//! Connects, reads its initial snapshot, then steers its snake clockwise
//! along the walls and asks for a restart whenever a round ends.

use clap::Parser;
use log::{debug, info, warn};
use shared::codec::{decode_server, encode_client};
use shared::{read_frame, write_frame, Board, Direction, Intent, PlayerId, ServerMessage, SnakeView, WireFormat};
use tokio::net::TcpStream;

#[derive(Parser, Debug)]
#[clap(author, version, about = "Headless snake duel test client")]
struct Args {
    #[clap(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    #[clap(short, long, default_value = "5555")]
    port: u16,

    /// Must match the server's payload encoding
    #[clap(short, long, default_value = "json")]
    wire_format: WireFormat,

    /// Stop after this many snapshots (0 runs until the server hangs up)
    #[clap(short, long, default_value = "0")]
    snapshots: u64,
}

/// Picks the heading for the next tick: keep going unless the wall is one
/// cell ahead, then turn clockwise.
fn steer(view: &SnakeView, board: &Board) -> Option<Direction> {
    let head = view.head()?;
    let current = Direction::try_from(view.dir).ok()?;
    let mut candidate = current;
    for _ in 0..4 {
        if board.contains(head.offset(candidate, board.cell_size)) && !candidate.is_opposite(current) {
            return (candidate != current).then_some(candidate);
        }
        candidate = match candidate {
            Direction::Up => Direction::Right,
            Direction::Right => Direction::Down,
            Direction::Down => Direction::Left,
            Direction::Left => Direction::Up,
        };
    }
    None
}

async fn send(stream: &mut TcpStream, format: WireFormat, intent: Intent) -> Result<(), Box<dyn std::error::Error>> {
    let payload = encode_client(format, intent)?;
    write_frame(stream, &payload).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let address = format!("{}:{}", args.host, args.port);
    let mut stream = TcpStream::connect(&address).await?;
    stream.set_nodelay(true)?;
    info!("Connected to {}", address);

    let board = Board::default();
    let mut player_id: Option<PlayerId> = None;
    let mut received: u64 = 0;
    let mut restart_sent = false;

    while let Some(payload) = read_frame(&mut stream).await? {
        let msg = match decode_server(args.wire_format, &payload) {
            Ok(msg) => msg,
            Err(e) => {
                warn!("Skipping undecodable frame: {}", e);
                continue;
            }
        };

        match msg {
            ServerMessage::InitialSnapshot(initial) => {
                info!(
                    "Joined as player {} (food at {:?}, shrink {:?}, fog {:?})",
                    initial.player_id, initial.food, initial.powerup, initial.fog
                );
                player_id = Some(initial.player_id);
            }
            ServerMessage::Rejected { reason } => {
                warn!("Server rejected us: {}", reason);
                break;
            }
            ServerMessage::TickSnapshot(snapshot) => {
                received += 1;
                let Some(id) = player_id else { continue };

                if snapshot.game_over {
                    if !restart_sent {
                        let scores: Vec<_> = snapshot.state.iter().map(|(id, s)| (*id, s.score)).collect();
                        info!("Game over, scores {:?}; requesting restart", scores);
                        send(&mut stream, args.wire_format, Intent::restart()).await?;
                        restart_sent = true;
                    }
                } else {
                    restart_sent = false;
                    if let Some(direction) = snapshot.state.get(&id).and_then(|view| steer(view, &board)) {
                        debug!("Turning {:?}", direction);
                        send(&mut stream, args.wire_format, Intent::move_towards(direction)).await?;
                    }
                }

                if received % 50 == 0 {
                    if let Some(view) = snapshot.state.get(&id) {
                        info!(
                            "Snapshot {}: length {} score {} fog {}",
                            received,
                            view.pos.len(),
                            view.score,
                            view.fog_active
                        );
                    }
                }

                if args.snapshots > 0 && received >= args.snapshots {
                    break;
                }
            }
        }
    }

    info!("Disconnecting after {} snapshots", received);
    Ok(())
}
